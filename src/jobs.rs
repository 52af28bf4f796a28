//! Named jobs, job groups and the batch runner.
use crate::charts::{
    all_country_comparison_charts, country_difference_charts, footprint_charts, gdp_share_charts, production_charts,
    single_country_charts, Chart, Footprint, Palette, ShareMetric,
};
use crate::config::Settings;
use crate::error::{ReportError, Result};
use crate::output::{write_chart, write_csv, write_workbook};
use crate::reports::{build_country_workbook, build_global_workbook, countries};
use crate::schema::Schema;
use crate::share::{
    compute_emissions_by_country, compute_revenue_share, compute_value_addition_share, compute_water_by_country,
};
use crate::types::{CountryMetricRow, JobOutcome, Measure, Observation, REGION_ISO3};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything a job reads. Jobs never modify the rows.
pub struct JobContext<'a> {
    pub rows: &'a [Observation],
    pub schema: &'a Schema,
    pub settings: &'a Settings,
    pub palette: Palette,
}

impl<'a> JobContext<'a> {
    pub fn new(rows: &'a [Observation], schema: &'a Schema, settings: &'a Settings) -> JobContext<'a> {
        let palette = Palette::for_countries(rows.iter().map(|o| o.iso3.as_str()));
        JobContext { rows, schema, settings, palette }
    }

    /// Countries proper, without the region aggregate.
    fn countries(&self) -> Vec<String> {
        countries(self.rows).into_iter().filter(|c| c != REGION_ISO3).collect()
    }
}

#[derive(Debug, Default)]
pub struct JobOutput {
    pub files: Vec<PathBuf>,
    /// Parts of the job that were left out, with the reason.
    pub skipped: Vec<String>,
}

impl JobOutput {
    fn charts(&mut self, root: &std::path::Path, charts: &[Chart]) -> Result<()> {
        for chart in charts {
            self.files.extend(write_chart(root, chart)?);
        }
        Ok(())
    }
}

type JobFn = fn(&JobContext) -> Result<JobOutput>;

/// Every job, by name.
pub const JOBS: [(&str, JobFn); 9] = [
    ("pivot_tables", run_pivot_tables),
    ("revenue_gdp_share", run_revenue_gdp_share),
    ("value_addition_gdp_share", run_value_addition_gdp_share),
    ("production_all_countries", run_production),
    ("emissions_all_countries", run_emissions),
    ("water_all_countries", run_water),
    ("single_country_all", run_single_country_all),
    ("country_differences", run_country_differences),
    ("all_country_comparisons", run_all_country_comparisons),
];

pub const GROUPS: [(&str, &[&str]); 4] = [
    (
        "all_countries",
        &[
            "production_all_countries",
            "emissions_all_countries",
            "water_all_countries",
            "revenue_gdp_share",
            "value_addition_gdp_share",
            "all_country_comparisons",
        ],
    ),
    ("single_countries", &["single_country_all", "country_differences"]),
    ("core", &["production_all_countries", "emissions_all_countries"]),
    ("tables", &["pivot_tables"]),
];

fn job(name: &str) -> Option<JobFn> {
    JOBS.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
}

/// Union of the named jobs and the members of the named groups, sorted.
/// Nothing selected means every job.
pub fn resolve_jobs(plots: &[String], groups: &[String]) -> Result<Vec<&'static str>> {
    let mut selected: BTreeSet<&'static str> = BTreeSet::new();
    for g in groups {
        let (_, members) = GROUPS
            .iter()
            .find(|(name, _)| *name == g.as_str())
            .ok_or_else(|| ReportError::UnknownGroup(g.clone()))?;
        selected.extend(members.iter().copied());
    }
    for p in plots {
        let (name, _) = JOBS
            .iter()
            .find(|(name, _)| *name == p.as_str())
            .ok_or_else(|| ReportError::UnknownJob(p.clone()))?;
        selected.insert(*name);
    }
    if selected.is_empty() {
        selected.extend(JOBS.iter().map(|(name, _)| *name));
    }
    Ok(selected.into_iter().collect())
}

/// Run each job in order. A failing job is recorded and the next one runs.
/// Jobs fail up front when the fact table lacks an identifying column.
pub fn run_jobs(ctx: &JobContext, names: &[&str]) -> Vec<JobOutcome> {
    let mut outcomes = Vec::with_capacity(names.len());
    for name in names {
        info!(job = %name, "running");
        let result = match job(name) {
            Some(f) => ctx.schema.require_keys().and_then(|()| f(ctx)),
            None => Err(ReportError::UnknownJob(name.to_string())),
        };
        let outcome = match result {
            Ok(out) => {
                info!(job = %name, files = out.files.len(), skipped = out.skipped.len(), "done");
                JobOutcome {
                    job: name.to_string(),
                    ok: true,
                    files_written: out.files.len(),
                    skipped: out.skipped,
                    error: None,
                }
            }
            Err(e) => {
                warn!(job = %name, error = %e, "job failed");
                JobOutcome {
                    job: name.to_string(),
                    ok: false,
                    files_written: 0,
                    skipped: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

fn run_pivot_tables(ctx: &JobContext) -> Result<JobOutput> {
    let root = &ctx.settings.paths.pivot_tables;
    let mut out = JobOutput::default();

    let global = build_global_workbook(ctx.rows, ctx.schema);
    out.files.extend(write_workbook(root, &global)?);
    out.skipped.extend(global.skipped.iter().map(|s| format!("{}/{}", global.name, s)));

    let country_root = root.join("countries");
    for iso3 in countries(ctx.rows) {
        let wb = build_country_workbook(ctx.rows, ctx.schema, &iso3);
        match write_workbook(&country_root, &wb) {
            Ok(files) => {
                out.files.extend(files);
                out.skipped.extend(wb.skipped.iter().map(|s| format!("{}/{}", wb.name, s)));
            }
            Err(e) => {
                warn!(country = %iso3, error = %e, "country workbook not written");
                out.skipped.push(format!("{}: {}", wb.name, e));
            }
        }
    }
    Ok(out)
}

fn metric_export(ctx: &JobContext, file: &str, rows: &[CountryMetricRow]) -> Result<PathBuf> {
    let dir = ctx.settings.figures_dir();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(file);
    write_csv(&path, rows)?;
    info!(path = %path.display(), rows = rows.len(), "saved");
    Ok(path)
}

fn run_gdp_share(ctx: &JobContext, metric: ShareMetric) -> Result<JobOutput> {
    ctx.schema.require("gdp_share", metric.required())?;
    let (file, rows) = match metric {
        ShareMetric::Revenue => ("revenue_by_country.csv", compute_revenue_share(ctx.rows)),
        ShareMetric::ValueAddition => ("value_addition_by_country.csv", compute_value_addition_share(ctx.rows)),
    };
    let mut out = JobOutput::default();
    out.files.push(metric_export(ctx, file, &rows)?);
    out.charts(&ctx.settings.figures_dir(), &gdp_share_charts(ctx.rows, metric, &ctx.palette))?;
    Ok(out)
}

fn run_revenue_gdp_share(ctx: &JobContext) -> Result<JobOutput> {
    run_gdp_share(ctx, ShareMetric::Revenue)
}

fn run_value_addition_gdp_share(ctx: &JobContext) -> Result<JobOutput> {
    run_gdp_share(ctx, ShareMetric::ValueAddition)
}

fn run_footprint(ctx: &JobContext, footprint: Footprint) -> Result<JobOutput> {
    let measure = footprint.measure();
    ctx.schema.require(measure.column(), &[measure])?;
    let (file, rows) = match footprint {
        Footprint::Emissions => ("emissions_by_country.csv", compute_emissions_by_country(ctx.rows)),
        Footprint::Water => ("water_by_country.csv", compute_water_by_country(ctx.rows)),
    };
    let mut out = JobOutput::default();
    out.files.push(metric_export(ctx, file, &rows)?);
    out.charts(&ctx.settings.figures_dir(), &footprint_charts(ctx.rows, footprint, &ctx.palette))?;
    Ok(out)
}

fn run_emissions(ctx: &JobContext) -> Result<JobOutput> {
    run_footprint(ctx, Footprint::Emissions)
}

fn run_water(ctx: &JobContext) -> Result<JobOutput> {
    run_footprint(ctx, Footprint::Water)
}

fn run_production(ctx: &JobContext) -> Result<JobOutput> {
    ctx.schema.require("production_all_countries", &[Measure::ProductionTonnes])?;
    let mut out = JobOutput::default();
    out.charts(&ctx.settings.figures_dir(), &production_charts(ctx.rows, &ctx.palette))?;
    Ok(out)
}

/// Per-country chart jobs: a country whose charts fail to write is logged
/// and skipped.
fn per_country<F>(ctx: &JobContext, build: F) -> Result<JobOutput>
where
    F: Fn(&str) -> Vec<Chart>,
{
    let root = ctx.settings.figures_dir();
    let mut out = JobOutput::default();
    for iso3 in ctx.countries() {
        let charts = build(&iso3);
        if charts.is_empty() {
            info!(country = %iso3, "no data, skipping");
            continue;
        }
        let mut written = JobOutput::default();
        match written.charts(&root, &charts) {
            Ok(()) => out.files.extend(written.files),
            Err(e) => {
                warn!(country = %iso3, error = %e, "country charts not written");
                out.skipped.push(format!("{}: {}", iso3, e));
            }
        }
    }
    Ok(out)
}

fn run_single_country_all(ctx: &JobContext) -> Result<JobOutput> {
    per_country(ctx, |iso3| single_country_charts(ctx.rows, ctx.schema, iso3, &ctx.palette))
}

fn run_country_differences(ctx: &JobContext) -> Result<JobOutput> {
    ctx.schema.require("country_differences", &[Measure::ProductionTonnes])?;
    per_country(ctx, |iso3| country_difference_charts(ctx.rows, iso3, &ctx.palette))
}

fn run_all_country_comparisons(ctx: &JobContext) -> Result<JobOutput> {
    let mut metrics = Vec::new();
    let mut out = JobOutput::default();
    let sources: [(&str, Vec<Measure>, fn(&[Observation]) -> Vec<CountryMetricRow>); 4] = [
        (
            "value_addition",
            ShareMetric::ValueAddition.required().to_vec(),
            compute_value_addition_share,
        ),
        ("revenue", ShareMetric::Revenue.required().to_vec(), compute_revenue_share),
        ("co2", vec![Measure::EnergyTonsCo2eq], compute_emissions_by_country),
        ("water", vec![Measure::WaterUsageM3], compute_water_by_country),
    ];
    for (variable, needed, compute) in sources {
        match ctx.schema.require(variable, &needed) {
            Ok(()) => metrics.extend(compute(ctx.rows)),
            Err(e) => {
                warn!(variable, error = %e, "comparison variable skipped");
                out.skipped.push(e.to_string());
            }
        }
    }
    out.charts(&ctx.settings.figures_dir(), &all_country_comparison_charts(&metrics, &ctx.palette))?;
    Ok(out)
}
