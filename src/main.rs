// Entry point: pick jobs from the command line, load the fact table once,
// run the jobs in name order and write `run_summary.json` to the results directory.
use clap::Parser;
use mineral_report::config::Settings;
use mineral_report::jobs::{resolve_jobs, run_jobs, JobContext};
use mineral_report::loader::load_fact_table;
use mineral_report::output::{preview_table, preview_table_rows, write_json};
use mineral_report::reports::{build_global_workbook, GLOBAL_WORKBOOK};
use mineral_report::share::compute_revenue_share;
use mineral_report::types::RunSummary;
use mineral_report::util::format_int;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mineral_report", version, about = "Pivot tables and chart data for mineral processing scenarios")]
struct Cli {
    /// Settings file with the `paths` section
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Fact table to read instead of `{results}/all_data.csv`
    #[arg(long)]
    input: Option<PathBuf>,
    /// Specific jobs to run
    #[arg(long, num_args = 0..)]
    plots: Vec<String>,
    /// Job groups to run (all_countries, single_countries, core, tables)
    #[arg(long, num_args = 0..)]
    group: Vec<String>,
    /// Print the first rows of the summary sheet and the revenue shares
    #[arg(long)]
    preview: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let jobs = resolve_jobs(&cli.plots, &cli.group)?;
    let settings = Settings::load(&cli.config)?;
    let input = cli.input.clone().unwrap_or_else(|| settings.fact_table());

    let table = load_fact_table(&input)?;
    println!(
        "Processing dataset... ({} rows loaded, {} skipped)",
        format_int(table.report.loaded_rows),
        format_int(table.report.parse_errors)
    );
    if table.report.unknown_minerals > 0 {
        println!(
            "Info: {} rows carry a mineral without label or colour.",
            format_int(table.report.unknown_minerals)
        );
    }
    if !table.schema.missing_keys().is_empty() {
        println!("Warning: identifying columns absent: {}", table.schema.missing_keys().join(", "));
    }
    let missing = table.schema.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|m| m.column()).collect();
        println!("Note: columns absent from the input: {}", names.join(", "));
    }
    println!();

    let ctx = JobContext::new(&table.rows, &table.schema, &settings);
    let outcomes = run_jobs(&ctx, &jobs);

    if cli.preview {
        let wb = build_global_workbook(&table.rows, &table.schema);
        if let Some(summary) = wb.sheet("summary_table") {
            preview_table(&format!("{} / summary_table", GLOBAL_WORKBOOK), summary, 8);
        }
        println!("Revenue share of GDP (revenue_by_country.csv)\n");
        preview_table_rows(&compute_revenue_share(&table.rows), 5);
    }

    for o in &outcomes {
        match &o.error {
            None => println!("{}: {} files written", o.job, format_int(o.files_written)),
            Some(e) => println!("{}: failed ({})", o.job, e),
        }
    }

    let summary = RunSummary {
        generated_at: chrono::Utc::now(),
        input: input.display().to_string(),
        rows_loaded: table.report.loaded_rows,
        rows_skipped: table.report.parse_errors,
        jobs: outcomes,
    };
    let summary_path = settings.run_summary();
    if let Some(dir) = summary_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    write_json(&summary_path, &summary)?;
    println!("\nRun summary saved to {}", summary_path.display());
    Ok(())
}
