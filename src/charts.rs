//! Data behind each figure: one table per panel, plus a descriptor with the
//! titles, axis labels and series colours. Drawing is left to the consumer.
use crate::pivot::{pivot, PivotSpec, TOTAL};
use crate::scenario::canonical_filter;
use crate::schema::Schema;
use crate::share::{adjust_gdp_for_inflation, gdp_share};
use crate::table::{Cell, Table};
use crate::types::{
    Constraint, CountryMetricRow, Dimension, Dimensioned, KeyPart, Measure, Mineral, Observation, REGION_ISO3,
};
use crate::value_added::{processed_value_added, StagedValue};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

const FALLBACK_COLOR: &str = "#999999";

/// matplotlib's `tab20`, cycled over the sorted country list.
const TAB20: [&str; 20] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896", "#9467bd", "#c5b0d5",
    "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f", "#c7c7c7", "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

/// Colour lookups shared by every chart of a run. Built once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    countries: BTreeMap<String, &'static str>,
}

impl Palette {
    pub fn for_countries<'a, I>(iso3: I) -> Palette
    where
        I: IntoIterator<Item = &'a str>,
    {
        let sorted: BTreeSet<&str> = iso3.into_iter().collect();
        let countries = sorted
            .into_iter()
            .zip(TAB20.iter().cycle())
            .map(|(c, color)| (c.to_string(), *color))
            .collect();
        Palette { countries }
    }

    pub fn country(&self, iso3: &str) -> &'static str {
        self.countries.get(iso3).copied().unwrap_or(FALLBACK_COLOR)
    }

    /// Accepts the full mineral name or its chemical symbol.
    pub fn mineral(&self, label: &str) -> &'static str {
        Mineral::from_name(label)
            .or_else(|| Mineral::from_short(label))
            .map(Mineral::color)
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn processing_type(&self, processing_type: &str) -> &'static str {
        match processing_type {
            "Beneficiation" => "#1b9e77",
            "Early refining" => "#d95f02",
            "Precursor related product" => "#7570b3",
            _ => FALLBACK_COLOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Horizontal bars, one segment per series.
    StackedBarH,
    GroupedBar,
    StackedBar,
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Panel {
    pub title: String,
    /// CSV holding the panel data, relative to the chart directory.
    pub file: String,
    pub series: Vec<Series>,
    #[serde(skip)]
    pub table: Table,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    /// Output directory relative to the figures root.
    #[serde(skip)]
    pub dir: PathBuf,
    pub name: String,
    pub title: String,
    pub kind: ChartKind,
    pub category_label: String,
    pub value_label: String,
    pub legend_title: String,
    pub panels: Vec<Panel>,
}

/// A value with the grouping keys it was read under.
struct Point {
    keys: Vec<(Dimension, KeyPart)>,
    value: f64,
}

impl Dimensioned for Point {
    fn key(&self, dim: Dimension) -> KeyPart {
        self.keys
            .iter()
            .find(|(d, _)| *d == dim)
            .map(|(_, k)| k.clone())
            .unwrap_or_else(|| KeyPart::Text(String::new()))
    }
}

const REGIME_DIMS: [Dimension; 5] = [
    Dimension::Constraint,
    Dimension::Year,
    Dimension::Iso3,
    Dimension::ReferenceMineral,
    Dimension::ReferenceMineralShort,
];

/// Point keyed for the by-regime charts; `Scenario` carries the identifier
/// without its year so that 2030 and 2040 land in one chart.
fn regime_point(o: &Observation, value: f64) -> Point {
    let mut keys: Vec<(Dimension, KeyPart)> = REGIME_DIMS.iter().map(|d| (*d, o.key(*d))).collect();
    keys.push((Dimension::Scenario, KeyPart::Text(o.scenario.general().to_string())));
    Point { keys, value }
}

fn point(o: &Observation, dims: &[Dimension], value: f64) -> Point {
    Point { keys: dims.iter().map(|d| (*d, o.key(*d))).collect(), value }
}

/// Sum-pivot `points` into a panel table; optionally rows are ordered by
/// their total, smallest first. Returns the table and its series names.
fn panel_table(points: &[&Point], row: Dimension, col: Dimension, sort_by_total: bool) -> Option<(Table, Vec<String>)> {
    if points.is_empty() {
        return None;
    }
    let p = pivot(points, &PivotSpec::sum(vec![row], col), |pt| pt.value);
    let total = p.value_position(TOTAL)?;
    let mut rows: Vec<_> = p.rows.iter().collect();
    if sort_by_total {
        rows.sort_by(|a, b| {
            let ta = a.values[total].unwrap_or(0.0);
            let tb = b.values[total].unwrap_or(0.0);
            ta.total_cmp(&tb)
        });
    }
    let series: Vec<String> = p.value_columns[..total].to_vec();
    let mut table = Table::new(std::iter::once(row.name().to_string()).chain(series.iter().cloned()));
    for r in rows {
        let mut cells = vec![Cell::from(r.keys[0].clone())];
        cells.extend(r.values[..total].iter().map(|v| Cell::from(*v)));
        table.push_row(cells);
    }
    Some((table, series))
}

fn series<F: Fn(&str) -> &'static str>(names: &[String], color: F) -> Vec<Series> {
    names
        .iter()
        .map(|n| Series { name: n.clone(), color: color(n).to_string() })
        .collect()
}

/// Layout shared by the charts drawn per `(constraint, scenario)` with one
/// panel per year.
struct RegimeLayout<'a> {
    name_prefix: &'a str,
    title_prefix: Option<&'a str>,
    category_label: &'a str,
    value_label: &'a str,
    legend_title: &'a str,
    row: Dimension,
    col: Dimension,
}

fn regime_charts<C, T>(points: Vec<Point>, layout: &RegimeLayout, color: C, panel_title: T) -> Vec<Chart>
where
    C: Fn(&str) -> &'static str,
    T: Fn(i32) -> String,
{
    let mut groups: BTreeMap<(String, String), Vec<Point>> = BTreeMap::new();
    for p in points {
        let key = (p.key(Dimension::Constraint).to_string(), p.key(Dimension::Scenario).to_string());
        groups.entry(key).or_default().push(p);
    }

    let mut charts = Vec::new();
    for ((constraint, general), group) in groups {
        let scenario_clean = general.replace("_threshold_metal_tons", "");
        let regime = Constraint::parse(&constraint).map(Constraint::describe).unwrap_or_else(|| constraint.clone());
        let title = match layout.title_prefix {
            Some(prefix) => format!("{} - {} ({})", prefix, regime, scenario_clean),
            None => format!("{} ({})", regime, scenario_clean),
        };
        let name = format!("{}_{}_{}_by_year_subplots", layout.name_prefix, scenario_clean, constraint).replace(' ', "_");

        let years: BTreeSet<i64> = group
            .iter()
            .filter_map(|p| match p.key(Dimension::Year) {
                KeyPart::Int(y) => Some(y),
                _ => None,
            })
            .collect();
        let mut panels = Vec::new();
        for year in years {
            let in_year: Vec<&Point> = group.iter().filter(|p| p.key(Dimension::Year) == KeyPart::Int(year)).collect();
            let Some((table, names)) = panel_table(&in_year, layout.row, layout.col, true) else {
                continue;
            };
            panels.push(Panel {
                title: panel_title(year as i32),
                file: format!("{}_{}.csv", name, year),
                series: series(&names, &color),
                table,
            });
        }
        if panels.is_empty() {
            debug!(chart = %name, "no panels, skipped");
            continue;
        }
        charts.push(Chart {
            dir: PathBuf::from("all_countries"),
            name,
            title,
            kind: ChartKind::StackedBarH,
            category_label: layout.category_label.to_string(),
            value_label: layout.value_label.to_string(),
            legend_title: layout.legend_title.to_string(),
            panels,
        });
    }
    charts
}

/// Which GDP share a chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMetric {
    Revenue,
    ValueAddition,
}

impl ShareMetric {
    fn title_prefix(self) -> &'static str {
        match self {
            ShareMetric::Revenue => "Revenue share of GDP",
            ShareMetric::ValueAddition => "Value addition share of GDP",
        }
    }

    pub fn required(self) -> &'static [Measure] {
        match self {
            ShareMetric::Revenue => &[Measure::RevenueUsd, Measure::GdpUsd],
            ShareMetric::ValueAddition => &[
                Measure::ProductionTonnes,
                Measure::PriceUsdPerTonne,
                Measure::ProductionCostUsdPerTonne,
                Measure::GdpUsd,
            ],
        }
    }
}

/// GDP share by country and mineral, canonical regimes only, positive
/// shares only.
pub fn gdp_share_charts(rows: &[Observation], metric: ShareMetric, palette: &Palette) -> Vec<Chart> {
    let adjusted = adjust_gdp_for_inflation(rows);
    let points: Vec<Point> = match metric {
        ShareMetric::Revenue => adjusted
            .iter()
            .filter(|o| canonical_filter(o))
            .filter_map(|o| {
                gdp_share(o.revenue_usd, o.gdp_usd)
                    .filter(|v| *v > 0.0)
                    .map(|v| regime_point(o, v))
            })
            .collect(),
        ShareMetric::ValueAddition => processed_value_added(&adjusted)
            .into_iter()
            .filter(|v| canonical_filter(v.obs))
            .filter_map(|v| {
                gdp_share(v.value_added, v.obs.gdp_usd)
                    .filter(|s| *s > 0.0)
                    .map(|s| regime_point(v.obs, s))
            })
            .collect(),
    };
    let prefix = metric.title_prefix();
    let name_prefix = prefix.to_lowercase().replace(' ', "_");
    let value_label = format!("{} (%)", prefix);
    let layout = RegimeLayout {
        name_prefix: &name_prefix,
        title_prefix: Some(prefix),
        category_label: "Country",
        value_label: &value_label,
        legend_title: "Mineral",
        row: Dimension::Iso3,
        col: Dimension::ReferenceMineralShort,
    };
    regime_charts(points, &layout, |m| palette.mineral(m), |y| y.to_string())
}

/// Environmental footprint charted by mineral and country.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footprint {
    Emissions,
    Water,
}

impl Footprint {
    pub fn measure(self) -> Measure {
        match self {
            Footprint::Emissions => Measure::EnergyTonsCo2eq,
            Footprint::Water => Measure::WaterUsageM3,
        }
    }

    fn divisor(self) -> f64 {
        match self {
            Footprint::Emissions => 1e3,
            Footprint::Water => 1e6,
        }
    }

    fn title_prefix(self) -> &'static str {
        match self {
            Footprint::Emissions => "Emissions",
            Footprint::Water => "Water Use",
        }
    }

    fn value_label(self) -> &'static str {
        match self {
            Footprint::Emissions => "CO2e emissions (kt)",
            Footprint::Water => "Water use (million m3)",
        }
    }
}

pub fn footprint_charts(rows: &[Observation], footprint: Footprint, palette: &Palette) -> Vec<Chart> {
    let measure = footprint.measure();
    let points: Vec<Point> = rows
        .iter()
        .filter(|o| canonical_filter(o) && o.measure(measure) > 0.0)
        .map(|o| regime_point(o, o.measure(measure) / footprint.divisor()))
        .collect();
    let prefix = footprint.title_prefix();
    let name_prefix = prefix.to_lowercase().replace(' ', "_");
    let layout = RegimeLayout {
        name_prefix: &name_prefix,
        title_prefix: Some(prefix),
        category_label: "Mineral",
        value_label: footprint.value_label(),
        legend_title: "Country",
        row: Dimension::ReferenceMineral,
        col: Dimension::Iso3,
    };
    regime_charts(points, &layout, |c| palette.country(c), |y| y.to_string())
}

/// Stages, processing types and years a mineral is charted for.
#[derive(Debug, Clone, Copy)]
pub struct AllowedProcessing {
    pub stages: &'static [f64],
    pub types: &'static [&'static str],
    pub years: &'static [i32],
}

const PROCESSING_TYPES: [&str; 3] = ["Beneficiation", "Early refining", "Precursor related product"];
const PROCESSING_YEARS: [i32; 3] = [2022, 2030, 2040];

pub fn allowed_processing(mineral: Mineral) -> AllowedProcessing {
    let stages: &'static [f64] = match mineral {
        Mineral::Nickel => &[1.0, 2.0, 5.0],
        Mineral::Copper => &[1.0, 3.0, 5.0],
        Mineral::Cobalt => &[1.0, 4.1, 5.0],
        Mineral::Graphite => &[1.0, 3.0, 4.0],
        Mineral::Manganese => &[1.0, 3.1, 4.1],
        Mineral::Lithium => &[1.0, 3.0, 4.2],
    };
    AllowedProcessing { stages, types: &PROCESSING_TYPES, years: &PROCESSING_YEARS }
}

impl AllowedProcessing {
    pub fn permits(&self, o: &Observation) -> bool {
        self.stages.contains(&o.processing_stage.0)
            && self.types.contains(&o.processing_type.as_str())
            && self.years.contains(&o.year)
    }
}

/// Processing type shown for each projection year.
pub fn processing_goal(year: i32) -> Option<&'static str> {
    match year {
        2030 => Some("Early refining"),
        2040 => Some("Precursor related product"),
        _ => None,
    }
}

/// Production (Mt) by country and mineral at each year's processing goal.
pub fn production_charts(rows: &[Observation], palette: &Palette) -> Vec<Chart> {
    let points: Vec<Point> = rows
        .iter()
        .filter(|o| canonical_filter(o))
        .filter(|o| o.mineral().map(|m| allowed_processing(m).permits(o)).unwrap_or(false))
        .filter(|o| processing_goal(o.year) == Some(o.processing_type.as_str()))
        .map(|o| regime_point(o, o.production_tonnes / 1e6))
        .collect();
    let layout = RegimeLayout {
        name_prefix: "production",
        title_prefix: None,
        category_label: "Country",
        value_label: "Production (million tonnes)",
        legend_title: "Mineral",
        row: Dimension::Iso3,
        col: Dimension::ReferenceMineral,
    };
    regime_charts(
        points,
        &layout,
        |m| palette.mineral(m),
        |y| format!("{} - {}", y, processing_goal(y).unwrap_or_default()),
    )
}

type MetricFn = fn(&StagedValue) -> Option<f64>;

/// Column name, axis label and reader for each single-country metric.
const SINGLE_COUNTRY_METRICS: [(&str, &str, MetricFn); 7] = [
    ("production_tonnes", "Production (t)", |v| Some(v.obs.production_tonnes)),
    ("energy_tonsCO2eq", "CO2 Emissions (t)", |v| Some(v.obs.energy_tons_co2eq)),
    ("water_usage_m3", "Water Usage (m3)", |v| Some(v.obs.water_usage_m3)),
    ("revenue_usd", "Revenue (USD)", |v| Some(v.obs.revenue_usd)),
    ("value_added", "Value Added (USD)", |v| Some(v.value_added)),
    ("revenue_share_gdp", "Revenue Share of GDP (%)", |v| gdp_share(v.obs.revenue_usd, v.obs.gdp_usd)),
    ("value_added_share_gdp", "Value Added Share of GDP (%)", |v| gdp_share(v.value_added, v.obs.gdp_usd)),
];

fn metric_inputs(metric: &str) -> Vec<Measure> {
    let va = [Measure::ProductionTonnes, Measure::PriceUsdPerTonne, Measure::ProductionCostUsdPerTonne];
    match metric {
        "value_added" => va.to_vec(),
        "revenue_share_gdp" => vec![Measure::RevenueUsd, Measure::GdpUsd],
        "value_added_share_gdp" => va.into_iter().chain([Measure::GdpUsd]).collect(),
        other => Measure::from_column(other).into_iter().collect(),
    }
}

/// Per-metric yearly totals by processing type for one country.
pub fn single_country_charts(rows: &[Observation], schema: &Schema, iso3: &str, palette: &Palette) -> Vec<Chart> {
    let country: Vec<Observation> = rows
        .iter()
        .filter(|o| o.iso3 == iso3 && o.processing_stage.is_processed())
        .cloned()
        .collect();
    let adjusted = adjust_gdp_for_inflation(&country);
    let staged = processed_value_added(&adjusted);

    let mut charts = Vec::new();
    for (column, label, read) in SINGLE_COUNTRY_METRICS {
        if let Err(e) = schema.require(column, &metric_inputs(column)) {
            debug!(country = iso3, "{}", e);
            continue;
        }
        let points: Vec<Point> = staged
            .iter()
            .filter_map(|v| {
                read(v)
                    .filter(|x| *x > 0.0)
                    .map(|x| point(v.obs, &[Dimension::Year, Dimension::ProcessingType], x))
            })
            .collect();
        let refs: Vec<&Point> = points.iter().collect();
        let Some((table, names)) = panel_table(&refs, Dimension::Year, Dimension::ProcessingType, false) else {
            continue;
        };
        let name = format!("{}_{}", column, iso3);
        charts.push(Chart {
            dir: PathBuf::from("country_figures").join(iso3).join("single"),
            title: format!("{}: {}", iso3, label),
            kind: ChartKind::GroupedBar,
            category_label: "Year".to_string(),
            value_label: label.to_string(),
            legend_title: "Processing type".to_string(),
            panels: vec![Panel {
                title: label.to_string(),
                file: format!("{}.csv", name),
                series: series(&names, |t| palette.processing_type(t)),
                table,
            }],
            name,
        });
    }
    charts
}

const DIFFERENCE_DIMS: [Dimension; 5] = [
    Dimension::Iso3,
    Dimension::Constraint,
    Dimension::Year,
    Dimension::ProcessingType,
    Dimension::ReferenceMineral,
];

/// `minuend - subtrahend` per `(processing_type, reference_mineral)`, where
/// the two sides are categories of `side`. `None` unless both sides occur.
fn difference_table(points: &[&Point], side: Dimension, minuend: &str, subtrahend: &str) -> Option<Table> {
    let p = pivot(
        points,
        &PivotSpec::sum(vec![Dimension::ProcessingType, Dimension::ReferenceMineral], side),
        |pt| pt.value,
    );
    let a = p.value_position(minuend)?;
    let b = p.value_position(subtrahend)?;
    let mut table = Table::new([
        Dimension::ProcessingType.name(),
        Dimension::ReferenceMineral.name(),
        minuend,
        subtrahend,
        "diff",
    ]);
    for r in &p.rows {
        let x = r.values[a].unwrap_or(0.0);
        let y = r.values[b].unwrap_or(0.0);
        table.push_row(vec![
            Cell::from(r.keys[0].clone()),
            Cell::from(r.keys[1].clone()),
            Cell::from(x),
            Cell::from(y),
            Cell::from(x - y),
        ]);
    }
    Some(table)
}

fn difference_chart<I>(iso3: &str, name: String, title: String, years: I, palette: &Palette) -> Option<Chart>
where
    I: IntoIterator<Item = (i32, Table)>,
{
    let panels: Vec<Panel> = years
        .into_iter()
        .map(|(year, table)| {
            let types: BTreeSet<String> = (0..table.len())
                .filter_map(|i| table.text(i, Dimension::ProcessingType.name()).map(String::from))
                .collect();
            let names: Vec<String> = types.into_iter().collect();
            Panel {
                title: year.to_string(),
                file: format!("{}_{}.csv", name, year),
                series: series(&names, |t| palette.processing_type(t)),
                table,
            }
        })
        .collect();
    if panels.is_empty() {
        return None;
    }
    Some(Chart {
        dir: PathBuf::from("country_figures").join(iso3).join("differences"),
        name,
        title,
        kind: ChartKind::StackedBar,
        category_label: "Processing type".to_string(),
        value_label: "Production difference (t)".to_string(),
        legend_title: "Processing type".to_string(),
        panels,
    })
}

fn years_of(points: &[&Point]) -> BTreeSet<i32> {
    points
        .iter()
        .filter_map(|p| match p.key(Dimension::Year) {
            KeyPart::Int(y) => Some(y as i32),
            _ => None,
        })
        .collect()
}

fn yearly_differences(points: &[&Point], side: Dimension, minuend: &str, subtrahend: &str) -> Vec<(i32, Table)> {
    years_of(points)
        .into_iter()
        .filter_map(|year| {
            let in_year: Vec<&Point> = points
                .iter()
                .copied()
                .filter(|p| p.key(Dimension::Year) == KeyPart::Int(year as i64))
                .collect();
            difference_table(&in_year, side, minuend, subtrahend).map(|t| (year, t))
        })
        .collect()
}

/// Processed production differences for one country: constrained minus
/// unconstrained under national allocation, and region aggregate minus
/// the country under each regional allocation.
pub fn country_difference_charts(rows: &[Observation], iso3: &str, palette: &Palette) -> Vec<Chart> {
    let points: Vec<Point> = rows
        .iter()
        .filter(|o| o.processing_stage.is_processed() && (o.iso3 == iso3 || o.is_region_aggregate()))
        .map(|o| point(o, &DIFFERENCE_DIMS, o.production_tonnes))
        .collect();

    let mut charts = Vec::new();

    let national: Vec<&Point> = points
        .iter()
        .filter(|p| {
            p.key(Dimension::Iso3) == KeyPart::Text(iso3.to_string())
                && matches!(
                    Constraint::parse(&p.key(Dimension::Constraint).to_string()),
                    Some(c) if c == Constraint::COUNTRY_CONSTRAINED || c == Constraint::COUNTRY_UNCONSTRAINED
                )
        })
        .collect();
    let years = yearly_differences(
        &national,
        Dimension::Constraint,
        Constraint::COUNTRY_CONSTRAINED.as_str(),
        Constraint::COUNTRY_UNCONSTRAINED.as_str(),
    );
    charts.extend(difference_chart(
        iso3,
        "constrained_minus_unconstrained".to_string(),
        format!("{}: Constrained - Unconstrained Differences", iso3),
        years,
        palette,
    ));

    for constraint in [Constraint::REGION_CONSTRAINED, Constraint::REGION_UNCONSTRAINED] {
        let regional: Vec<&Point> = points
            .iter()
            .filter(|p| p.key(Dimension::Constraint) == KeyPart::Text(constraint.as_str().to_string()))
            .collect();
        let years = yearly_differences(&regional, Dimension::Iso3, REGION_ISO3, iso3);
        charts.extend(difference_chart(
            iso3,
            format!("region_minus_country_{}", constraint),
            format!("{}: Region - Country ({}) Differences", iso3, constraint),
            years,
            palette,
        ));
    }
    charts
}

/// Variables of the all-country comparison, in drawing order.
pub const COMPARISON_VARIABLES: [&str; 4] = ["value_addition", "revenue", "co2", "water"];

/// One chart per variable and year: value by country, stacked by mineral.
/// Undefined values are left out.
pub fn all_country_comparison_charts(metrics: &[CountryMetricRow], palette: &Palette) -> Vec<Chart> {
    let mut charts = Vec::new();
    for variable in COMPARISON_VARIABLES {
        let points: Vec<Point> = metrics
            .iter()
            .filter(|m| m.variable == variable)
            .filter_map(|m| {
                m.value.map(|value| Point {
                    keys: vec![
                        (Dimension::Iso3, KeyPart::Text(m.country.clone())),
                        (Dimension::ReferenceMineral, KeyPart::Text(m.reference_mineral.clone())),
                        (Dimension::Year, KeyPart::Int(m.year as i64)),
                    ],
                    value,
                })
            })
            .collect();
        let refs: Vec<&Point> = points.iter().collect();
        for year in years_of(&refs) {
            let in_year: Vec<&Point> = refs
                .iter()
                .copied()
                .filter(|p| p.key(Dimension::Year) == KeyPart::Int(year as i64))
                .collect();
            let Some((table, names)) = panel_table(&in_year, Dimension::Iso3, Dimension::ReferenceMineral, false)
            else {
                continue;
            };
            let name = format!("{}_{}_by_country", variable, year);
            let title = format!("{} by Country ({})", variable.to_uppercase(), year);
            charts.push(Chart {
                dir: PathBuf::from("all_country_figures"),
                title: title.clone(),
                kind: ChartKind::StackedBar,
                category_label: "Country".to_string(),
                value_label: "value".to_string(),
                legend_title: "Mineral".to_string(),
                panels: vec![Panel {
                    title,
                    file: format!("{}.csv", name),
                    series: series(&names, |m| palette.mineral(m)),
                    table,
                }],
                name,
            });
        }
    }
    charts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::obs;

    fn palette() -> Palette {
        Palette::for_countries(["ZMB", "COD", "region"])
    }

    #[test]
    fn country_colors_cycle_in_sorted_order() {
        let p = palette();
        assert_eq!(p.country("COD"), TAB20[0]);
        assert_eq!(p.country("ZMB"), TAB20[1]);
        assert_eq!(p.country("region"), TAB20[2]);
        assert_eq!(p.country("XXX"), FALLBACK_COLOR);
        assert_eq!(p.mineral("Cu"), p.mineral("copper"));
    }

    #[test]
    fn revenue_share_chart_per_regime_with_panels_by_year() {
        let mut a = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "ZMB", "copper", 3.0);
        a.revenue_usd = 122.0;
        a.gdp_usd = 1000.0;
        let mut b = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "COD", "copper", 3.0);
        b.revenue_usd = 244.0;
        b.gdp_usd = 1000.0;
        let mut c = obs("2040_mid_min_threshold_metal_tons", "country_constrained", "ZMB", "nickel", 5.0);
        c.revenue_usd = 156.0;
        c.gdp_usd = 1000.0;
        // outside the canonical regimes
        let mut d = obs("2030_mid_max_threshold_metal_tons", "country_constrained", "ZMB", "copper", 3.0);
        d.revenue_usd = 1.0;
        d.gdp_usd = 1.0;

        let charts = gdp_share_charts(&[a, b, c, d], ShareMetric::Revenue, &palette());
        assert_eq!(charts.len(), 1);
        let chart = &charts[0];
        assert_eq!(chart.name, "revenue_share_of_gdp_mid_min_country_constrained_by_year_subplots");
        assert_eq!(chart.title, "Revenue share of GDP - Nationalist Constrained (mid_min)");
        assert_eq!(chart.panels.len(), 2);

        let p2030 = &chart.panels[0].table;
        assert_eq!(p2030.columns, vec!["iso3", "Cu"]);
        // ascending by total: ZMB (10%) before COD (20%)
        assert_eq!(p2030.text(0, "iso3"), Some("ZMB"));
        assert!((p2030.number(0, "Cu").unwrap() - 10.0).abs() < 1e-9);
        assert!((p2030.number(1, "Cu").unwrap() - 20.0).abs() < 1e-9);
        assert!((chart.panels[1].table.number(0, "Ni").unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn production_keeps_the_processing_goal_only() {
        let mut refined = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "ZMB", "copper", 3.0);
        refined.production_tonnes = 2e6;
        let mut precursor = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "ZMB", "copper", 5.0);
        precursor.processing_type = "Precursor related product".to_string();
        precursor.production_tonnes = 9e6;
        let mut off_stage = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "ZMB", "copper", 2.0);
        off_stage.production_tonnes = 9e6;

        let charts = production_charts(&[refined, precursor, off_stage], &palette());
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].title, "Nationalist Constrained (mid_min)");
        assert_eq!(charts[0].panels[0].title, "2030 - Early refining");
        assert_eq!(charts[0].panels[0].table.number(0, "copper"), Some(2.0));
    }

    #[test]
    fn emissions_in_kilotonnes_by_mineral() {
        let mut a = obs("2030_mid_max_threshold_metal_tons", "region_unconstrained", "ZMB", "copper", 3.0);
        a.energy_tons_co2eq = 5000.0;
        let charts = footprint_charts(&[a], Footprint::Emissions, &palette());
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].name, "emissions_mid_max_region_unconstrained_by_year_subplots");
        let t = &charts[0].panels[0].table;
        assert_eq!(t.columns, vec!["reference_mineral", "ZMB"]);
        assert_eq!(t.number(0, "ZMB"), Some(5.0));
        assert_eq!(charts[0].panels[0].series[0].color, TAB20[1]);
    }

    #[test]
    fn constrained_minus_unconstrained_and_region_minus_country() {
        let mut rows = Vec::new();
        for (constraint, iso3, tonnes) in [
            ("country_constrained", "ZMB", 10.0),
            ("country_unconstrained", "ZMB", 4.0),
            ("region_constrained", "ZMB", 3.0),
            ("region_constrained", "region", 12.0),
        ] {
            let mut o = obs("2030_mid_min_threshold_metal_tons", constraint, iso3, "copper", 3.0);
            o.production_tonnes = tonnes;
            rows.push(o);
        }
        let charts = country_difference_charts(&rows, "ZMB", &palette());
        assert_eq!(charts.len(), 2);

        let national = &charts[0];
        assert_eq!(national.name, "constrained_minus_unconstrained");
        assert_eq!(national.panels[0].table.number(0, "diff"), Some(6.0));

        let regional = &charts[1];
        assert_eq!(regional.name, "region_minus_country_region_constrained");
        assert_eq!(regional.panels[0].table.number(0, "diff"), Some(9.0));
        assert_eq!(regional.dir, PathBuf::from("country_figures/ZMB/differences"));
    }

    #[test]
    fn single_country_skips_metrics_without_inputs() {
        let mut a = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "ZMB", "copper", 3.0);
        a.production_tonnes = 100.0;
        let schema = Schema::from_headers(["production_tonnes"]);
        let charts = single_country_charts(&[a], &schema, "ZMB", &palette());
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].name, "production_tonnes_ZMB");
        assert_eq!(charts[0].panels[0].table.number(0, "Early refining"), Some(100.0));
    }

    #[test]
    fn comparison_leaves_out_undefined_values() {
        let row = |country: &str, value: Option<f64>| CountryMetricRow {
            country: country.to_string(),
            year: 2030,
            reference_mineral: "copper".to_string(),
            variable: "revenue".to_string(),
            value,
        };
        let charts = all_country_comparison_charts(&[row("ZMB", Some(2.0)), row("COD", None)], &palette());
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].name, "revenue_2030_by_country");
        assert_eq!(charts[0].title, "REVENUE by Country (2030)");
        assert_eq!(charts[0].panels[0].table.len(), 1);
    }
}
