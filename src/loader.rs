// Fact table loading: read the wide CSV once, record which columns the header
// carried, and turn each raw record into an `Observation`. Rows missing an
// identifying field are counted and dropped; absent measures load as zero.
// A header without an identifying column is not an error here: the schema
// records it and the job runner refuses to run against it.
use crate::error::Result;
use crate::scenario::ScenarioId;
use crate::schema::Schema;
use crate::types::{Constraint, Observation, RawRow, Stage};
use crate::util::{parse_f64_safe, parse_i32_safe};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub unknown_minerals: usize,
}

/// Fact table after loading: rows, which measure columns existed, and counters.
#[derive(Debug, Clone)]
pub struct FactTable {
    pub rows: Vec<Observation>,
    pub schema: Schema,
    pub report: LoadReport,
}

pub fn load_fact_table<P: AsRef<Path>>(path: P) -> Result<FactTable> {
    let rdr = ReaderBuilder::new().flexible(true).from_path(path.as_ref())?;
    read_fact_table(rdr)
}

pub fn load_fact_table_from_reader<R: Read>(reader: R) -> Result<FactTable> {
    let rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    read_fact_table(rdr)
}

fn read_fact_table<R: Read>(mut rdr: csv::Reader<R>) -> Result<FactTable> {
    let schema = Schema::from_headers(rdr.headers()?.iter());
    if !schema.missing_keys().is_empty() {
        warn!(missing = ?schema.missing_keys(), "identifying columns absent from input, no row can load");
    }
    let missing = schema.missing();
    if !missing.is_empty() {
        debug!(?missing, "measure columns absent from input, loaded as zero");
    }

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut unknown_minerals = 0usize;
    let mut rows: Vec<Observation> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(line = total_rows, error = %e, "unreadable row");
                parse_errors += 1;
                continue;
            }
        };
        match clean_row(row) {
            Some(obs) => {
                if obs.mineral().is_none() {
                    unknown_minerals += 1;
                }
                rows.push(obs);
            }
            None => parse_errors += 1,
        }
    }

    if parse_errors > 0 {
        warn!(parse_errors, total_rows, "rows skipped due to parse/validation errors");
    }

    let report = LoadReport { total_rows, loaded_rows: rows.len(), parse_errors, unknown_minerals };
    Ok(FactTable { rows, schema, report })
}

/// Validate the identifying columns and convert measures; `None` rejects the row.
fn clean_row(row: RawRow) -> Option<Observation> {
    let scenario = ScenarioId::parse(row.scenario.as_deref().filter(|s| !s.trim().is_empty())?);
    let constraint = Constraint::parse(row.constraint.as_deref()?)?;
    let iso3 = non_empty(row.iso3)?;
    let reference_mineral = non_empty(row.reference_mineral)?.to_lowercase();
    let processing_stage = Stage(parse_f64_safe(row.processing_stage.as_deref())?);
    let year = parse_i32_safe(row.year.as_deref()).or(scenario.year())?;
    let processing_type = non_empty(row.processing_type).unwrap_or_else(|| "Unspecified".to_string());

    let num = |v: &Option<String>| parse_f64_safe(v.as_deref()).unwrap_or(0.0);

    Some(Observation {
        production_tonnes: num(&row.production_tonnes),
        price_usd_per_tonne: num(&row.price_usd_per_tonne),
        production_cost_usd_per_tonne: num(&row.production_cost_usd_per_tonne),
        revenue_usd: num(&row.revenue_usd),
        all_cost_usd: num(&row.all_cost_usd),
        gdp_usd: num(&row.gdp_usd),
        energy_tons_co2eq: num(&row.energy_tons_co2eq),
        water_usage_m3: num(&row.water_usage_m3),
        transport_total_tons_co2eq: num(&row.transport_total_tons_co2eq),
        transport_total_tonkm: num(&row.transport_total_tonkm),
        energy_req_capacity_kw: num(&row.energy_req_capacity_kw),
        unit_cost_usd_per_tonne: num(&row.production_transport_energy_unit_cost_usd_per_tonne),
        scenario,
        constraint,
        iso3,
        reference_mineral,
        processing_stage,
        processing_type,
        year,
    })
}

fn non_empty(v: Option<String>) -> Option<String> {
    let s = v?.trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
