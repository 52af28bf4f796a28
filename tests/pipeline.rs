use mineral_report::config::Settings;
use mineral_report::jobs::{resolve_jobs, run_jobs, JobContext};
use mineral_report::loader::load_fact_table_from_reader;
use mineral_report::output::write_workbook;
use mineral_report::reports::build_global_workbook;
use std::fs;
use std::path::Path;

const FACT_TABLE: &str = "\
scenario,constraint,iso3,reference_mineral,processing_stage,processing_type,year,production_tonnes,price_usd_per_tonne,production_cost_usd_per_tonne,revenue_usd,all_cost_usd,gdp_usd,energy_tonsCO2eq,water_usage_m3
2030_mid_min_threshold_metal_tons,country_constrained,ZMB,copper,0,Metal content,2030,100000000,0,10,0,0,1000000000,0,0
2030_mid_min_threshold_metal_tons,country_constrained,ZMB,nickel,0,Metal content,2030,10000000,0,10,0,0,1000000000,0,0
2030_mid_max_threshold_metal_tons,region_constrained,region,copper,0,Metal content,2030,150000000,0,10,0,0,1000000000,0,0
2040_mid_max_threshold_metal_tons,region_constrained,region,copper,0,Metal content,2040,300000000,0,10,0,0,1000000000,0,0
2030_mid_min_threshold_metal_tons,country_constrained,ZMB,copper,3,Early refining,2030,50,9000,4000,450000,200000,1000000000,2000,3000000
";

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    rdr.records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

#[test]
fn metal_content_sheet_carries_same_year_and_offset_comparisons() {
    let table = load_fact_table_from_reader(FACT_TABLE.as_bytes()).unwrap();
    assert_eq!(table.report.loaded_rows, 5);

    let wb = build_global_workbook(&table.rows, &table.schema);
    let dir = tempfile::tempdir().unwrap();
    write_workbook(dir.path(), &wb).unwrap();

    let path = dir.path().join("all_data_pivots_global").join("metal_content_global_Mt.csv");
    let rows = read_rows(&path);
    // three pivot rows, then the 2030 and 2030->2040 comparisons
    assert_eq!(rows.len(), 5);

    // every pivot row carries every mineral, zero-filled
    for row in &rows[..3] {
        assert!(row[2..].iter().all(|cell| !cell.is_empty()), "{:?}", row);
    }
    assert_eq!(rows[0][0], "2030_mid_max_threshold_metal_tons");
    assert_eq!(rows[0][3], "0");

    assert_eq!(
        rows[3][0],
        "2030_mid_min_threshold_metal_tons_vs_2030_mid_max_threshold_metal_tons"
    );
    assert_eq!(rows[3][1], "pct_change_country");
    assert_eq!(rows[3][2].parse::<f64>().unwrap(), 50.0);

    assert_eq!(
        rows[4][0],
        "2030_mid_min_threshold_metal_tons_vs_2040_mid_max_threshold_metal_tons"
    );
    assert_eq!(rows[4][2].parse::<f64>().unwrap(), 200.0);
}

#[test]
fn missing_columns_skip_sheets_not_the_workbook() {
    let table = load_fact_table_from_reader(FACT_TABLE.as_bytes()).unwrap();
    let wb = build_global_workbook(&table.rows, &table.schema);
    assert!(wb.sheet("revenue_million_usd").is_some());
    assert!(wb.sheet("transport_volume_million_ton_km").is_none());
    assert!(wb
        .skipped
        .iter()
        .any(|s| s.starts_with("unit_costs_usd_per_tonne") && s.contains("missing required column")));
}

fn settings_in(root: &Path) -> Settings {
    let config = serde_json::json!({
        "paths": {
            "data": root.join("data"),
            "results": root.join("results"),
            "figures": root.join("figures"),
            "pivot_tables": root.join("pivots"),
        }
    });
    Settings::from_json(&config.to_string()).unwrap()
}

#[test]
fn every_job_runs_against_a_temp_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let settings = settings_in(root);
    let table = load_fact_table_from_reader(FACT_TABLE.as_bytes()).unwrap();

    let ctx = JobContext::new(&table.rows, &table.schema, &settings);
    let jobs = resolve_jobs(&[], &[]).unwrap();
    let outcomes = run_jobs(&ctx, &jobs);

    assert_eq!(outcomes.len(), 9);
    for o in &outcomes {
        assert!(o.ok, "{} failed: {:?}", o.job, o.error);
    }

    assert!(root.join("pivots/all_data_pivots_global/summary_table.csv").exists());
    assert!(root.join("pivots/countries/all_data_pivots_ZMB/metal_content_kt.csv").exists());
    assert!(root.join("pivots/countries/all_data_pivots_region/metal_content_kt.csv").exists());

    let figures = root.join("figures/automated_plots");
    let revenue = read_rows(&figures.join("revenue_by_country.csv"));
    assert_eq!(revenue.len(), 1);
    assert_eq!(revenue[0][0], "ZMB");
    assert_eq!(revenue[0][3], "revenue");

    assert!(figures
        .join("all_countries/production_mid_min_country_constrained_by_year_subplots.json")
        .exists());
    assert!(figures.join("country_figures/ZMB/single/production_tonnes_ZMB.csv").exists());
}

#[test]
fn header_without_constraint_fails_every_job() {
    let csv = "\
scenario,iso3,reference_mineral,processing_stage,processing_type,year,production_tonnes,revenue_usd,gdp_usd
2030_mid_min_threshold_metal_tons,ZMB,copper,3,Early refining,2030,50,450000,1000000000
";
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let table = load_fact_table_from_reader(csv.as_bytes()).unwrap();
    assert_eq!(table.report.loaded_rows, 0);

    let ctx = JobContext::new(&table.rows, &table.schema, &settings);
    let outcomes = run_jobs(&ctx, &resolve_jobs(&[], &[]).unwrap());
    assert_eq!(outcomes.len(), 9);
    for o in &outcomes {
        assert!(!o.ok, "{} should fail", o.job);
        assert_eq!(o.files_written, 0);
        let err = o.error.as_deref().unwrap();
        assert!(err.contains("fact_table") && err.contains("constraint"), "{}", err);
    }
    assert!(!dir.path().join("pivots").exists());
}

#[test]
fn one_unwritable_country_does_not_stop_the_others() {
    let csv = "\
scenario,constraint,iso3,reference_mineral,processing_stage,processing_type,year,production_tonnes,price_usd_per_tonne,production_cost_usd_per_tonne
2030_mid_min_threshold_metal_tons,country_constrained,COD,copper,0,Metal content,2030,100,0,10
2030_mid_min_threshold_metal_tons,country_constrained,COD,copper,3,Early refining,2030,50,9000,4000
2030_mid_min_threshold_metal_tons,country_constrained,ZMB,copper,0,Metal content,2030,100,0,10
2030_mid_min_threshold_metal_tons,country_constrained,ZMB,copper,3,Early refining,2030,50,9000,4000
";
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let settings = settings_in(root);
    let table = load_fact_table_from_reader(csv.as_bytes()).unwrap();

    // plain files where ZMB's output directories would go
    fs::create_dir_all(root.join("pivots/countries")).unwrap();
    fs::write(root.join("pivots/countries/all_data_pivots_ZMB"), "").unwrap();
    let country_figures = root.join("figures/automated_plots/country_figures");
    fs::create_dir_all(&country_figures).unwrap();
    fs::write(country_figures.join("ZMB"), "").unwrap();

    let ctx = JobContext::new(&table.rows, &table.schema, &settings);
    let outcomes = run_jobs(&ctx, &["pivot_tables", "single_country_all"]);

    let pivots = &outcomes[0];
    assert!(pivots.ok, "{:?}", pivots.error);
    assert!(pivots.skipped.iter().any(|s| s.starts_with("all_data_pivots_ZMB:")), "{:?}", pivots.skipped);
    assert!(root.join("pivots/countries/all_data_pivots_COD/metal_content_kt.csv").exists());
    assert!(root.join("pivots/all_data_pivots_global/metal_content_global_Mt.csv").exists());

    let single = &outcomes[1];
    assert!(single.ok, "{:?}", single.error);
    assert!(single.skipped.iter().any(|s| s.starts_with("ZMB:")), "{:?}", single.skipped);
    assert!(country_figures.join("COD/single/production_tonnes_COD.csv").exists());
}
