// Sheet builders and workbook assembly.
//
// Each sheet is a pivot of the fact table, optionally followed by its
// percentage-change rows. A sheet that cannot be built (absent columns, empty
// selection) is left out and named in `Workbook::skipped`; the rest of the
// workbook is still produced. Global and per-country workbooks share one
// builder and differ only in their row filter and unit scale.
use crate::error::{ReportError, Result};
use crate::pct_change::{pct_change, safe_pct_change, with_policy_comparisons};
use crate::pivot::{group_sum, pivot, unit_divisor, PivotSpec, Scale, VALUE_ADDED_DIVISOR};
use crate::scenario::{DemandLevel, PolicyTag, ScenarioId};
use crate::schema::{Capability, Schema};
use crate::share::{normalized_revenue_by_type, normalized_revenue_summary};
use crate::table::{Cell, Table};
use crate::types::{Constraint, Dimension, KeyPart, Measure, Observation};
use crate::util::round2;
use crate::value_added::{processed_value_added, StagedValue};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

const VALUE_ADDED_INPUTS: [Measure; 3] = [
    Measure::ProductionTonnes,
    Measure::PriceUsdPerTonne,
    Measure::ProductionCostUsdPerTonne,
];

fn non_empty<'a>(table: &str, rows: Vec<&'a Observation>) -> Result<Vec<&'a Observation>> {
    if rows.is_empty() {
        Err(ReportError::EmptySelection { table: table.to_string() })
    } else {
        Ok(rows)
    }
}

/// Stage-0 production (metal content) by mineral with policy comparisons.
pub fn metal_content_table(rows: &[Observation], schema: &Schema, scale: Scale) -> Result<Table> {
    schema.require("metal_content", &[Measure::ProductionTonnes])?;
    let raw = non_empty("metal_content", rows.iter().filter(|o| o.processing_stage.is_raw()).collect())?;
    let div = unit_divisor(Measure::ProductionTonnes, scale);
    let p = pivot(&raw, &PivotSpec::by_mineral(), |o| o.production_tonnes / div);
    Ok(with_policy_comparisons(&p))
}

/// Mean unit cost by mineral, per processing type and across all types.
pub fn unit_cost_table(rows: &[Observation], schema: &Schema) -> Result<Table> {
    schema.require("unit_costs", &[Measure::UnitCostUsdPerTonne])?;
    let processed = non_empty("unit_costs", rows.iter().filter(|o| !o.processing_stage.is_raw()).collect())?;
    let mut base = pivot(
        &processed,
        &PivotSpec::mean(
            vec![Dimension::Scenario, Dimension::Constraint, Dimension::ProcessingType],
            Dimension::ReferenceMineral,
        ),
        |o| o.unit_cost_usd_per_tonne,
    );
    let mut all_types = pivot(
        &processed,
        &PivotSpec::mean(vec![Dimension::Scenario, Dimension::Constraint], Dimension::ReferenceMineral),
        |o| o.unit_cost_usd_per_tonne,
    );
    all_types.insert_index(2, Dimension::ProcessingType.name(), KeyPart::Text("all".to_string()));
    base.extend(all_types);
    Ok(with_policy_comparisons(&base))
}

/// Sum of `measure` by mineral, unit-converted, with policy comparisons.
pub fn by_mineral_table(rows: &[Observation], schema: &Schema, measure: Measure, scale: Scale) -> Result<Table> {
    schema.require(measure.column(), &[measure])?;
    if rows.is_empty() {
        return Err(ReportError::EmptySelection { table: measure.column().to_string() });
    }
    let div = unit_divisor(measure, scale);
    let p = pivot(rows, &PivotSpec::by_mineral(), |o| o.measure(measure) / div);
    Ok(with_policy_comparisons(&p))
}

/// Value added (million USD) by mineral with policy comparisons.
pub fn value_added_by_mineral(rows: &[Observation], schema: &Schema) -> Result<Table> {
    schema.require("value_added", &VALUE_ADDED_INPUTS)?;
    let va = processed_value_added(rows);
    if va.is_empty() {
        return Err(ReportError::EmptySelection { table: "value_added".to_string() });
    }
    let p = pivot(&va, &PivotSpec::by_mineral(), |v| v.value_added / VALUE_ADDED_DIVISOR);
    Ok(with_policy_comparisons(&p))
}

/// Processed production by `(scenario, constraint, stage, year)` and mineral.
pub fn production_table(rows: &[Observation], schema: &Schema, scale: Scale) -> Result<Table> {
    production_pivot(
        "production",
        rows,
        schema,
        scale,
        vec![Dimension::Scenario, Dimension::Constraint, Dimension::ProcessingStage, Dimension::Year],
    )
}

/// Processed production by `(scenario, processing_type, year)` and mineral.
pub fn production_by_type_table(rows: &[Observation], schema: &Schema, scale: Scale) -> Result<Table> {
    production_pivot(
        "production_by_type",
        rows,
        schema,
        scale,
        vec![Dimension::Scenario, Dimension::ProcessingType, Dimension::Year],
    )
}

fn production_pivot(
    table: &str,
    rows: &[Observation],
    schema: &Schema,
    scale: Scale,
    index: Vec<Dimension>,
) -> Result<Table> {
    schema.require(table, &[Measure::ProductionTonnes])?;
    let processed = non_empty(table, rows.iter().filter(|o| !o.processing_stage.is_raw()).collect())?;
    let div = unit_divisor(Measure::ProductionTonnes, scale);
    let p = pivot(&processed, &PivotSpec::sum(index, Dimension::ReferenceMineral), |o| {
        o.production_tonnes / div
    });
    Ok(p.to_table())
}

/// One row per scenario, one column per constraint, plus region-vs-country
/// changes for the constrained and unconstrained regimes.
fn constraint_summary(totals: &BTreeMap<Vec<KeyPart>, f64>) -> Table {
    let constraints: BTreeSet<String> = totals.keys().map(|k| k[1].to_string()).collect();
    let mut by_scenario: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for (key, v) in totals {
        by_scenario
            .entry(key[0].to_string())
            .or_default()
            .insert(key[1].to_string(), *v);
    }

    let mut table = Table::new(
        std::iter::once("scenario".to_string())
            .chain(constraints.iter().cloned())
            .chain(["pct_change_constrained".to_string(), "pct_change_unconstrained".to_string()]),
    );
    for (scenario, values) in by_scenario {
        let get = |c: Constraint| values.get(c.as_str()).copied().unwrap_or(0.0);
        let mut cells = vec![Cell::Text(scenario.clone())];
        cells.extend(constraints.iter().map(|c| Cell::from(values.get(c).copied().unwrap_or(0.0))));
        cells.push(Cell::from(safe_pct_change(
            get(Constraint::REGION_CONSTRAINED),
            get(Constraint::COUNTRY_CONSTRAINED),
        )));
        cells.push(Cell::from(safe_pct_change(
            get(Constraint::REGION_UNCONSTRAINED),
            get(Constraint::COUNTRY_UNCONSTRAINED),
        )));
        table.push_row(cells);
    }
    table
}

fn by_type_table(totals: BTreeMap<Vec<KeyPart>, f64>, value_column: &str) -> Table {
    let mut table = Table::new(["scenario", "processing_type", value_column]);
    for (key, v) in totals {
        table.push_row(vec![Cell::from(key[0].clone()), Cell::from(key[1].clone()), Cell::from(v)]);
    }
    table
}

/// Revenue summary per scenario and revenue by processing type.
pub fn revenue_tables(rows: &[Observation], schema: &Schema, scale: Scale) -> Result<(Table, Table)> {
    schema.require("revenue_summary", &[Measure::RevenueUsd])?;
    if rows.is_empty() {
        return Err(ReportError::EmptySelection { table: "revenue_summary".to_string() });
    }
    let div = unit_divisor(Measure::RevenueUsd, scale);
    let totals = group_sum(rows, &[Dimension::Scenario, Dimension::Constraint], |o| o.revenue_usd / div);
    let by_type = group_sum(rows, &[Dimension::Scenario, Dimension::ProcessingType], |o| {
        o.revenue_usd / div
    });
    Ok((constraint_summary(&totals), by_type_table(by_type, "revenue_musd")))
}

/// Value-added summary per scenario and value added by processing type.
pub fn value_added_tables(rows: &[Observation], schema: &Schema) -> Result<(Table, Table)> {
    schema.require("value_added_summary", &VALUE_ADDED_INPUTS)?;
    let va = processed_value_added(rows);
    if va.is_empty() {
        return Err(ReportError::EmptySelection { table: "value_added_summary".to_string() });
    }
    let musd = |v: &StagedValue| v.value_added / VALUE_ADDED_DIVISOR;
    let totals = group_sum(&va, &[Dimension::Scenario, Dimension::Constraint], musd);
    let by_type = group_sum(&va, &[Dimension::Scenario, Dimension::ProcessingType], musd);
    Ok((constraint_summary(&totals), by_type_table(by_type, "value_added_musd")))
}

#[derive(Debug, Default, Clone, Copy)]
struct YearTotals {
    production: f64,
    cost: f64,
    revenue: f64,
    has_production: bool,
    has_flows: bool,
}

fn is_mid_unconstrained_pair(o: &Observation) -> Option<bool> {
    // Some(true) for the nationalist side, Some(false) for the regionalist side
    match (o.constraint, o.scenario.tag()) {
        (Constraint::COUNTRY_UNCONSTRAINED, Some(PolicyTag::MID_MIN)) => Some(true),
        (Constraint::REGION_UNCONSTRAINED, Some(PolicyTag::MID_MAX)) => Some(false),
        _ => None,
    }
}

/// Long-format comparison of nationalist (`mid_min`, country unconstrained)
/// and regionalist (`mid_max`, region unconstrained) mid-demand outcomes.
///
/// Columns: `Year, Variable, Country, Region, Percentage Change`.
pub fn summary_mid_demand_unconstrained(rows: &[Observation], schema: &Schema) -> Result<Table> {
    schema.require(
        "summary_table",
        &[Measure::ProductionTonnes, Measure::AllCostUsd, Measure::RevenueUsd],
    )?;

    // (year, is_country) -> totals
    let mut totals: BTreeMap<(i32, bool), YearTotals> = BTreeMap::new();
    for o in rows {
        let Some(is_country) = is_mid_unconstrained_pair(o) else {
            continue;
        };
        let t = totals.entry((o.year, is_country)).or_default();
        if o.processing_stage.is_raw() {
            t.production += o.production_tonnes / 1e6;
            t.has_production = true;
        }
        t.cost += o.all_cost_usd / 1e6;
        t.revenue += o.revenue_usd / 1e6;
        t.has_flows = true;
    }

    let va_by_year = if matches!(schema.check(&VALUE_ADDED_INPUTS), Capability::Available(_)) {
        mid_value_added_by_year(rows)
    } else {
        warn!("summary_table: value addition inputs missing, row omitted");
        BTreeMap::new()
    };

    let mut table = Table::new(["Year", "Variable", "Country", "Region", "Percentage Change"]);
    let years: BTreeSet<i32> = totals.keys().map(|(y, _)| *y).collect();
    for year in years {
        let (Some(c), Some(r)) = (totals.get(&(year, true)), totals.get(&(year, false))) else {
            continue;
        };
        // both sides need stage-0 production and flows to be comparable
        if !(c.has_production && r.has_production && c.has_flows && r.has_flows) {
            continue;
        }
        let lines = [
            ("Production (Mt of metal content)", c.production, r.production),
            ("Total Cost (MUSD)", c.cost, r.cost),
            ("Export Revenue (MUSD)", c.revenue, r.revenue),
        ];
        for (variable, country, region) in lines {
            table.push_row(summary_row(year, variable, country, region));
        }
        if let Some((country, region)) = va_by_year.get(&year) {
            table.push_row(summary_row(year, "Value Addition (MUSD)", *country, *region));
        }
    }

    if table.is_empty() {
        info!("summary_table: no year has both mid-demand unconstrained regimes");
    }
    Ok(table)
}

fn summary_row(year: i32, variable: &str, country: f64, region: f64) -> Vec<Cell> {
    vec![
        Cell::from(year),
        Cell::from(variable),
        Cell::from(round2(country)),
        Cell::from(round2(region)),
        Cell::from(pct_change(Some(country), Some(region)).map(round2)),
    ]
}

/// Same-year value added (MUSD): `country_unconstrained` under the
/// `mid_min` scenario against `region_unconstrained` under `mid_max`.
fn mid_value_added_by_year(rows: &[Observation]) -> BTreeMap<i32, (f64, f64)> {
    let va = processed_value_added(rows);
    let mut totals: BTreeMap<(String, Constraint), f64> = BTreeMap::new();
    let mut scenarios: BTreeMap<String, ScenarioId> = BTreeMap::new();
    for v in &va {
        if v.obs.scenario.demand() != Some(DemandLevel::Mid) {
            continue;
        }
        scenarios.entry(v.obs.scenario.raw().to_string()).or_insert_with(|| v.obs.scenario.clone());
        *totals.entry((v.obs.scenario.raw().to_string(), v.obs.constraint)).or_insert(0.0) +=
            v.value_added / VALUE_ADDED_DIVISOR;
    }

    let mut out = BTreeMap::new();
    let years: BTreeSet<i32> = scenarios.values().filter_map(|s| s.year()).collect();
    for year in years {
        let first_with = |tag: PolicyTag| {
            scenarios
                .values()
                .find(|s| s.year() == Some(year) && s.tag() == Some(tag))
        };
        let (Some(min), Some(max)) = (first_with(PolicyTag::MID_MIN), first_with(PolicyTag::MID_MAX)) else {
            continue;
        };
        let country = totals
            .get(&(min.raw().to_string(), Constraint::COUNTRY_UNCONSTRAINED))
            .copied()
            .unwrap_or(0.0);
        let region = totals
            .get(&(max.raw().to_string(), Constraint::REGION_UNCONSTRAINED))
            .copied()
            .unwrap_or(0.0);
        out.insert(year, (country, region));
    }
    out
}

/// Every sheet a pivot workbook can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    MetalContent,
    UnitCosts,
    TotalCosts,
    Revenue,
    TransportEmissions,
    EnergyEmissions,
    TransportVolume,
    EnergyCapacity,
    WaterUse,
    ValueAdded,
    Production,
    ProductionByType,
    RevenueSummary,
    RevenueByType,
    ValueAddedSummary,
    ValueAddedByType,
    NormalizedRevenueByType,
    NormalizedRevenueSummary,
    Summary,
}

impl SheetKind {
    pub fn sheet_name(self, scale: Scale) -> &'static str {
        let global = scale == Scale::Global;
        match self {
            SheetKind::MetalContent if global => "metal_content_global_Mt",
            SheetKind::MetalContent => "metal_content_kt",
            SheetKind::UnitCosts => "unit_costs_usd_per_tonne",
            SheetKind::TotalCosts if global => "total_costs_million_usd",
            SheetKind::TotalCosts => "total_costs_musd",
            SheetKind::Revenue if global => "revenue_million_usd",
            SheetKind::Revenue => "revenue_musd",
            SheetKind::TransportEmissions if global => "transport_emissions_MtCO2e",
            SheetKind::TransportEmissions => "transport_emissions_ktCO2e",
            SheetKind::EnergyEmissions if global => "energy_emissions_MtCO2e",
            SheetKind::EnergyEmissions => "energy_emissions_ktCO2e",
            SheetKind::TransportVolume if global => "transport_volume_million_ton_km",
            SheetKind::TransportVolume => "transport_volume_mtkm",
            SheetKind::EnergyCapacity => "energy_capacity_GW",
            SheetKind::WaterUse if global => "water_use_million_m3",
            SheetKind::WaterUse => "water_use_mcm",
            SheetKind::ValueAdded if global => "value_added_million_usd",
            SheetKind::ValueAdded => "value_added_musd",
            SheetKind::Production if global => "production_Mt",
            SheetKind::Production => "production_kt",
            SheetKind::ProductionByType if global => "production_by_type_Mt",
            SheetKind::ProductionByType => "production_by_type_kt",
            SheetKind::RevenueSummary if global => "revenue_summary_million_usd",
            SheetKind::RevenueSummary => "revenue_summary_musd",
            SheetKind::RevenueByType if global => "revenue_by_type_million_usd",
            SheetKind::RevenueByType => "revenue_by_type_musd",
            SheetKind::ValueAddedSummary if global => "value_added_summary_million_usd",
            SheetKind::ValueAddedSummary => "value_added_summary_musd",
            SheetKind::ValueAddedByType if global => "value_added_by_type_million_usd",
            SheetKind::ValueAddedByType => "value_added_by_type_musd",
            SheetKind::NormalizedRevenueByType => "normalized_revenue_by_type_usdpt",
            SheetKind::NormalizedRevenueSummary => "normalized_revenue_summary_usdpt",
            SheetKind::Summary => "summary_table",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub name: String,
    pub sheets: Vec<Sheet>,
    /// `sheet: reason` for every sheet that could not be built.
    pub skipped: Vec<String>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|s| s.name == name).map(|s| &s.table)
    }

    fn add(&mut self, name: &str, result: Result<Table>) {
        match result {
            Ok(table) => self.sheets.push(Sheet { name: name.to_string(), table }),
            Err(e) => self.skip(name, e),
        }
    }

    fn add_pair(&mut self, names: (&str, &str), result: Result<(Table, Table)>) {
        match result {
            Ok((a, b)) => {
                self.sheets.push(Sheet { name: names.0.to_string(), table: a });
                self.sheets.push(Sheet { name: names.1.to_string(), table: b });
            }
            Err(e) => {
                let reason = e.to_string();
                self.skip(names.0, e);
                self.skipped.push(format!("{}: {}", names.1, reason));
            }
        }
    }

    fn skip(&mut self, name: &str, e: ReportError) {
        match &e {
            ReportError::EmptySelection { .. } => info!(workbook = %self.name, sheet = name, "skipped: {}", e),
            _ => warn!(workbook = %self.name, sheet = name, "skipped: {}", e),
        }
        self.skipped.push(format!("{}: {}", name, e));
    }
}

/// Assemble every sheet for `rows` at `scale`. A sheet that fails is logged
/// and listed in `skipped`; the others are still built.
pub fn build_workbook(name: &str, rows: &[Observation], schema: &Schema, scale: Scale) -> Workbook {
    let mut wb = Workbook { name: name.to_string(), ..Workbook::default() };
    let n = |k: SheetKind| k.sheet_name(scale);

    wb.add(n(SheetKind::MetalContent), metal_content_table(rows, schema, scale));
    wb.add(n(SheetKind::UnitCosts), unit_cost_table(rows, schema));
    let by_mineral = [
        (SheetKind::TotalCosts, Measure::AllCostUsd),
        (SheetKind::Revenue, Measure::RevenueUsd),
        (SheetKind::TransportEmissions, Measure::TransportTotalTonsCo2eq),
        (SheetKind::EnergyEmissions, Measure::EnergyTonsCo2eq),
        (SheetKind::TransportVolume, Measure::TransportTotalTonkm),
        (SheetKind::EnergyCapacity, Measure::EnergyReqCapacityKw),
        (SheetKind::WaterUse, Measure::WaterUsageM3),
    ];
    for (kind, measure) in by_mineral {
        wb.add(n(kind), by_mineral_table(rows, schema, measure, scale));
    }
    wb.add(n(SheetKind::ValueAdded), value_added_by_mineral(rows, schema));
    wb.add(n(SheetKind::Production), production_table(rows, schema, scale));
    wb.add(n(SheetKind::ProductionByType), production_by_type_table(rows, schema, scale));
    wb.add_pair(
        (n(SheetKind::RevenueSummary), n(SheetKind::RevenueByType)),
        revenue_tables(rows, schema, scale),
    );
    wb.add_pair(
        (n(SheetKind::ValueAddedSummary), n(SheetKind::ValueAddedByType)),
        value_added_tables(rows, schema),
    );

    let norm_inputs = [Measure::RevenueUsd, Measure::ProductionTonnes];
    match schema.require("normalized_revenue", &norm_inputs) {
        Ok(()) => {
            wb.add(n(SheetKind::NormalizedRevenueByType), Ok(normalized_revenue_by_type(rows).to_table()));
            wb.add(n(SheetKind::NormalizedRevenueSummary), Ok(normalized_revenue_summary(rows)));
        }
        Err(e) => {
            let reason = e.to_string();
            wb.skip(n(SheetKind::NormalizedRevenueByType), e);
            wb.skipped.push(format!("{}: {}", n(SheetKind::NormalizedRevenueSummary), reason));
        }
    }
    wb.add(n(SheetKind::Summary), summary_mid_demand_unconstrained(rows, schema));
    wb
}

pub const GLOBAL_WORKBOOK: &str = "all_data_pivots_global";

pub fn country_workbook_name(iso3: &str) -> String {
    format!("all_data_pivots_{}", iso3)
}

pub fn build_global_workbook(rows: &[Observation], schema: &Schema) -> Workbook {
    build_workbook(GLOBAL_WORKBOOK, rows, schema, Scale::Global)
}

/// Workbook for the rows of one `iso3` (the `region` aggregate included).
pub fn build_country_workbook(rows: &[Observation], schema: &Schema, iso3: &str) -> Workbook {
    let country: Vec<Observation> = rows.iter().filter(|o| o.iso3 == iso3).cloned().collect();
    build_workbook(&country_workbook_name(iso3), &country, schema, Scale::Country)
}

/// Distinct `iso3` values, sorted.
pub fn countries(rows: &[Observation]) -> Vec<String> {
    let set: BTreeSet<&str> = rows.iter().map(|o| o.iso3.as_str()).collect();
    set.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::obs;

    fn sample() -> Vec<Observation> {
        let mut rows = Vec::new();
        for (scenario, constraint, prod0, prod1, rev) in [
            ("2030_mid_min_threshold_metal_tons", "country_unconstrained", 2_000_000.0, 1_000_000.0, 100e6),
            ("2030_mid_max_threshold_metal_tons", "region_unconstrained", 3_000_000.0, 1_500_000.0, 150e6),
            ("2030_mid_min_threshold_metal_tons", "country_constrained", 1_000_000.0, 500_000.0, 80e6),
            ("2030_mid_max_threshold_metal_tons", "region_constrained", 1_000_000.0, 500_000.0, 120e6),
        ] {
            let mut raw = obs(scenario, constraint, "ZMB", "copper", 0.0);
            raw.production_tonnes = prod0;
            raw.production_cost_usd_per_tonne = 10.0;
            raw.all_cost_usd = 20e6;
            let mut refined = obs(scenario, constraint, "ZMB", "copper", 3.0);
            refined.production_tonnes = prod1;
            refined.price_usd_per_tonne = 100.0;
            refined.production_cost_usd_per_tonne = 40.0;
            refined.revenue_usd = rev;
            refined.all_cost_usd = 30e6;
            refined.unit_cost_usd_per_tonne = 40.0;
            let mut later = obs(scenario, constraint, "ZMB", "copper", 5.0);
            later.production_tonnes = prod1 / 2.0;
            later.price_usd_per_tonne = 200.0;
            rows.extend([raw, refined, later]);
        }
        rows
    }

    #[test]
    fn metal_content_has_pivot_and_comparison_rows() {
        let t = metal_content_table(&sample(), &Schema::complete(), Scale::Global).unwrap();
        assert_eq!(t.columns, vec!["scenario", "constraint", "copper", "Total"]);
        // four regime rows, one constrained and one unconstrained comparison
        assert_eq!(t.len(), 6);
        let last = t.len() - 1;
        assert_eq!(t.text(last, "constraint"), Some("pct_change_country"));
        assert_eq!(t.number(last, "copper"), Some(50.0));
    }

    #[test]
    fn missing_column_fails_only_that_sheet() {
        let schema = Schema::from_headers(["production_tonnes", "revenue_usd", "all_cost_usd"]);
        let wb = build_global_workbook(&sample(), &schema);
        assert!(wb.sheet("metal_content_global_Mt").is_some());
        assert!(wb.sheet("revenue_million_usd").is_some());
        assert!(wb.sheet("unit_costs_usd_per_tonne").is_none());
        assert!(wb.sheet("water_use_million_m3").is_none());
        assert!(wb.skipped.iter().any(|s| s.starts_with("water_use_million_m3")));
    }

    #[test]
    fn revenue_summary_compares_region_against_country() {
        let (summary, by_type) = revenue_tables(&sample(), &Schema::complete(), Scale::Global).unwrap();
        assert_eq!(
            summary.columns,
            vec![
                "scenario",
                "country_constrained",
                "country_unconstrained",
                "region_constrained",
                "region_unconstrained",
                "pct_change_constrained",
                "pct_change_unconstrained",
            ]
        );
        // the mid_max row only has region values, so its country side is zero
        assert_eq!(summary.text(0, "scenario"), Some("2030_mid_max_threshold_metal_tons"));
        assert_eq!(summary.number(0, "pct_change_constrained"), None);
        // and the mid_min row has no region values
        assert_eq!(summary.number(1, "pct_change_constrained"), Some(-100.0));
        assert_eq!(by_type.columns, vec!["scenario", "processing_type", "revenue_musd"]);
    }

    #[test]
    fn summary_table_long_format() {
        let t = summary_mid_demand_unconstrained(&sample(), &Schema::complete()).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.text(0, "Variable"), Some("Production (Mt of metal content)"));
        assert_eq!(t.number(0, "Country"), Some(2.0));
        assert_eq!(t.number(0, "Region"), Some(3.0));
        assert_eq!(t.number(0, "Percentage Change"), Some(50.0));
        assert_eq!(t.number(2, "Percentage Change"), Some(50.0));
        assert_eq!(t.text(3, "Variable"), Some("Value Addition (MUSD)"));
        // stage 3 is the first processed stage, so only stage 5 adds value:
        // 200 * 500_000 - 40 * 1_000_000 = 60 MUSD for the country side
        assert_eq!(t.number(3, "Country"), Some(60.0));
    }

    #[test]
    fn unit_costs_include_all_types_block() {
        let t = unit_cost_table(&sample(), &Schema::complete()).unwrap();
        let all_rows = (0..t.len()).filter(|i| t.text(*i, "processing_type") == Some("all")).count();
        assert_eq!(all_rows, 4);
    }
}
