//! GDP-relative and production-relative shares.
use crate::pivot::{pivot, Aggregation, PivotSpec, PivotTable, TotalMode};
use crate::table::{Cell, Table};
use crate::types::{CountryMetricRow, Dimension, Dimensioned, KeyPart, Observation};
use crate::value_added::processed_value_added;
use std::collections::BTreeMap;
use tracing::warn;

/// GDP multiplier for a scenario: 2030 figures ×1.22, 2040 figures ×1.56.
pub fn inflation_factor(scenario: &str) -> f64 {
    if scenario.contains("2030") {
        1.22
    } else if scenario.contains("2040") {
        1.56
    } else {
        1.0
    }
}

/// Copy of `rows` with `gdp_usd` inflation-adjusted.
///
/// Applying this to rows that were already adjusted multiplies GDP again;
/// every caller starts from the loaded fact table.
pub fn adjust_gdp_for_inflation(rows: &[Observation]) -> Vec<Observation> {
    rows.iter()
        .map(|o| {
            let mut o = o.clone();
            o.gdp_usd *= inflation_factor(o.scenario.raw());
            o
        })
        .collect()
}

/// `metric / gdp * 100`, undefined for a zero GDP.
pub fn gdp_share(metric: f64, gdp_usd: f64) -> Option<f64> {
    if gdp_usd == 0.0 {
        None
    } else {
        Some(metric / gdp_usd * 100.0)
    }
}

fn report_undefined(variable: &str, rows: &[CountryMetricRow]) {
    let undefined = rows.iter().filter(|r| r.value.is_none()).count();
    if undefined > 0 {
        warn!(variable, undefined, "zero GDP, share left undefined");
    }
}

fn metric_row(obs: &Observation, variable: &str, value: Option<f64>) -> CountryMetricRow {
    CountryMetricRow {
        country: obs.iso3.clone(),
        year: obs.year,
        reference_mineral: obs.reference_mineral.clone(),
        variable: variable.to_string(),
        value,
    }
}

/// Revenue as a percentage of inflation-adjusted GDP for processed rows.
pub fn compute_revenue_share(rows: &[Observation]) -> Vec<CountryMetricRow> {
    let adjusted = adjust_gdp_for_inflation(rows);
    let out: Vec<CountryMetricRow> = adjusted
        .iter()
        .filter(|o| o.processing_stage.is_processed())
        .map(|o| metric_row(o, "revenue", gdp_share(o.revenue_usd, o.gdp_usd)))
        .collect();
    report_undefined("revenue", &out);
    out
}

/// Value added as a percentage of inflation-adjusted GDP for processed rows.
pub fn compute_value_addition_share(rows: &[Observation]) -> Vec<CountryMetricRow> {
    let adjusted = adjust_gdp_for_inflation(rows);
    let out: Vec<CountryMetricRow> = processed_value_added(&adjusted)
        .into_iter()
        .map(|v| metric_row(v.obs, "value_addition", gdp_share(v.value_added, v.obs.gdp_usd)))
        .collect();
    report_undefined("value_addition", &out);
    out
}

/// Energy emissions (t CO2e) of processed rows.
pub fn compute_emissions_by_country(rows: &[Observation]) -> Vec<CountryMetricRow> {
    rows.iter()
        .filter(|o| o.processing_stage.is_processed())
        .map(|o| metric_row(o, "co2", Some(o.energy_tons_co2eq)))
        .collect()
}

/// Water use (m3) of processed rows.
pub fn compute_water_by_country(rows: &[Observation]) -> Vec<CountryMetricRow> {
    rows.iter()
        .filter(|o| o.processing_stage.is_processed())
        .map(|o| metric_row(o, "water", Some(o.water_usage_m3)))
        .collect()
}

/// Revenue and production summed per `(scenario, constraint, stage, type, mineral)`.
struct NormGroup {
    keys: Vec<KeyPart>,
    revenue: f64,
    production: f64,
}

const NORM_GROUP: [Dimension; 5] = [
    Dimension::Scenario,
    Dimension::Constraint,
    Dimension::ProcessingStage,
    Dimension::ProcessingType,
    Dimension::ReferenceMineral,
];

impl Dimensioned for NormGroup {
    fn key(&self, dim: Dimension) -> KeyPart {
        NORM_GROUP
            .iter()
            .position(|d| *d == dim)
            .map(|i| self.keys[i].clone())
            .unwrap_or_else(|| KeyPart::Text(String::new()))
    }
}

/// Revenue per tonne by processing type, one column per mineral.
///
/// Rows with stage > 0 and positive production are summed per group, the
/// ratio is averaged across stages sharing a processing type, and `Total`
/// averages the defined mineral cells.
pub fn normalized_revenue_by_type(rows: &[Observation]) -> PivotTable {
    let mut groups: BTreeMap<Vec<KeyPart>, (f64, f64)> = BTreeMap::new();
    for o in rows.iter().filter(|o| o.processing_stage.is_processed() && o.production_tonnes > 0.0) {
        let key: Vec<KeyPart> = NORM_GROUP.iter().map(|d| o.key(*d)).collect();
        let e = groups.entry(key).or_insert((0.0, 0.0));
        e.0 += o.revenue_usd;
        e.1 += o.production_tonnes;
    }
    let grouped: Vec<NormGroup> = groups
        .into_iter()
        .map(|(keys, (revenue, production))| NormGroup { keys, revenue, production })
        .collect();

    let spec = PivotSpec {
        index: vec![Dimension::ProcessingType, Dimension::Scenario, Dimension::Constraint],
        columns: Dimension::ReferenceMineral,
        aggregation: Aggregation::Mean,
        fill: None,
        total: TotalMode::Mean,
    };
    pivot(&grouped, &spec, |g| g.revenue / g.production)
}

/// [`normalized_revenue_by_type`] summed over processing types per
/// `(scenario, constraint)`, with the scenario year up front.
pub fn normalized_revenue_summary(rows: &[Observation]) -> Table {
    let by_type = normalized_revenue_by_type(rows);
    let scenario_pos = by_type.index_position(Dimension::Scenario.name());
    let constraint_pos = by_type.index_position(Dimension::Constraint.name());

    let mut sums: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    if let (Some(sp), Some(cp)) = (scenario_pos, constraint_pos) {
        for row in &by_type.rows {
            let key = (row.keys[sp].to_string(), row.keys[cp].to_string());
            let acc = sums.entry(key).or_insert_with(|| vec![0.0; by_type.value_columns.len()]);
            for (a, v) in acc.iter_mut().zip(&row.values) {
                *a += v.unwrap_or(0.0);
            }
        }
    }

    let mut table = Table::new(
        ["year", "scenario", "constraint"]
            .into_iter()
            .map(String::from)
            .chain(by_type.value_columns.iter().cloned()),
    );
    for ((scenario, constraint), values) in sums {
        let year = crate::scenario::ScenarioId::parse(&scenario)
            .year()
            .map(Cell::from)
            .unwrap_or(Cell::Empty);
        let mut cells = vec![year, Cell::Text(scenario), Cell::Text(constraint)];
        cells.extend(values.into_iter().map(Cell::from));
        table.push_row(cells);
    }
    table
}
