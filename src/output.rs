use crate::charts::Chart;
use crate::error::Result;
use crate::reports::Workbook;
use crate::table::Table;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::Tabled;

pub fn write_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a [`Table`]: header row, then one record per row. Undefined cells
/// are written empty.
pub fn write_table<P: AsRef<Path>>(path: P, table: &Table) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|c| c.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// Write a workbook as `<dir>/<workbook name>/<sheet>.csv` and return the
/// files written.
pub fn write_workbook<P: AsRef<Path>>(dir: P, workbook: &Workbook) -> Result<Vec<PathBuf>> {
    let root = dir.as_ref().join(&workbook.name);
    fs::create_dir_all(&root)?;
    let mut written = Vec::with_capacity(workbook.sheets.len());
    for sheet in &workbook.sheets {
        let path = root.join(format!("{}.csv", sheet.name));
        write_table(&path, &sheet.table)?;
        written.push(path);
    }
    Ok(written)
}

/// Write a chart under `root/<chart dir>`: one CSV per panel plus the
/// `<name>.json` descriptor.
pub fn write_chart<P: AsRef<Path>>(root: P, chart: &Chart) -> Result<Vec<PathBuf>> {
    let dir = root.as_ref().join(&chart.dir);
    fs::create_dir_all(&dir)?;
    let mut written = Vec::with_capacity(chart.panels.len() + 1);
    for panel in &chart.panels {
        let path = dir.join(&panel.file);
        write_table(&path, &panel.table)?;
        written.push(path);
    }
    let descriptor = dir.join(format!("{}.json", chart.name));
    write_json(&descriptor, chart)?;
    written.push(descriptor);
    Ok(written)
}

fn print_markdown(rendered: Option<String>) {
    match rendered {
        Some(s) => println!("{}\n", s),
        None => println!("(no rows)\n"),
    }
}

/// Markdown preview of the first `max_rows` rows of a table.
pub fn preview_table(title: &str, table: &Table, max_rows: usize) {
    println!("\n{}\n", title);
    if table.is_empty() {
        print_markdown(None);
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(table.columns.iter().cloned());
    for row in table.rows.iter().take(max_rows) {
        builder.push_record(row.iter().map(|c| c.to_string()));
    }
    print_markdown(Some(builder.build().with(Style::markdown()).to_string()));
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        print_markdown(None);
        return;
    }
    print_markdown(Some(tabled::Table::new(slice).with(Style::markdown()).to_string()));
}
