//! Wide pivot tables: one row per index combination, one column per category.
use crate::table::{Cell, Table};
use crate::types::{Constraint, Dimension, Dimensioned, KeyPart, Measure};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

/// How the appended `Total` column is derived from the category cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalMode {
    Sum,
    Mean,
}

#[derive(Debug, Clone)]
pub struct PivotSpec {
    pub index: Vec<Dimension>,
    pub columns: Dimension,
    pub aggregation: Aggregation,
    /// Value for index/category combinations absent from the input;
    /// `None` leaves them undefined.
    pub fill: Option<f64>,
    pub total: TotalMode,
}

impl PivotSpec {
    /// Sum by mineral on `(scenario, constraint)`, zero-filled.
    pub fn by_mineral() -> PivotSpec {
        PivotSpec::sum(vec![Dimension::Scenario, Dimension::Constraint], Dimension::ReferenceMineral)
    }

    pub fn sum(index: Vec<Dimension>, columns: Dimension) -> PivotSpec {
        PivotSpec { index, columns, aggregation: Aggregation::Sum, fill: Some(0.0), total: TotalMode::Sum }
    }

    pub fn mean(index: Vec<Dimension>, columns: Dimension) -> PivotSpec {
        PivotSpec { index, columns, aggregation: Aggregation::Mean, fill: Some(0.0), total: TotalMode::Mean }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub keys: Vec<KeyPart>,
    /// One value per entry of [`PivotTable::value_columns`].
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    pub index: Vec<String>,
    /// Category columns followed by `Total`.
    pub value_columns: Vec<String>,
    pub rows: Vec<PivotRow>,
}

pub const TOTAL: &str = "Total";

#[derive(Default)]
struct Acc {
    sum: f64,
    count: usize,
}

impl Acc {
    fn finish(&self, agg: Aggregation) -> f64 {
        match agg {
            Aggregation::Sum => self.sum,
            Aggregation::Mean => self.sum / self.count as f64,
        }
    }
}

impl TotalMode {
    fn apply(self, values: &[Option<f64>]) -> Option<f64> {
        let defined: Vec<f64> = values.iter().flatten().copied().collect();
        match self {
            TotalMode::Sum => Some(defined.iter().sum()),
            TotalMode::Mean if defined.is_empty() => None,
            TotalMode::Mean => Some(defined.iter().sum::<f64>() / defined.len() as f64),
        }
    }
}

/// Pivot `rows` by `spec`, reading each row's value with `value`.
///
/// Rows and category columns are the combinations observed in the input,
/// both sorted. Every row carries every category: cells with no input get
/// `spec.fill`.
pub fn pivot<T, F>(rows: &[T], spec: &PivotSpec, value: F) -> PivotTable
where
    T: Dimensioned,
    F: Fn(&T) -> f64,
{
    let mut cells: BTreeMap<Vec<KeyPart>, HashMap<KeyPart, Acc>> = BTreeMap::new();
    let mut categories: BTreeSet<KeyPart> = BTreeSet::new();
    for r in rows {
        let key: Vec<KeyPart> = spec.index.iter().map(|d| r.key(*d)).collect();
        let cat = r.key(spec.columns);
        categories.insert(cat.clone());
        let acc = cells.entry(key).or_default().entry(cat).or_default();
        acc.sum += value(r);
        acc.count += 1;
    }
    let categories: Vec<KeyPart> = categories.into_iter().collect();

    let rows = cells
        .into_iter()
        .map(|(keys, by_cat)| {
            let mut values: Vec<Option<f64>> = categories
                .iter()
                .map(|c| by_cat.get(c).map(|a| a.finish(spec.aggregation)).or(spec.fill))
                .collect();
            values.push(spec.total.apply(&values));
            PivotRow { keys, values }
        })
        .collect();

    let mut value_columns: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
    value_columns.push(TOTAL.to_string());

    PivotTable {
        index: spec.index.iter().map(|d| d.name().to_string()).collect(),
        value_columns,
        rows,
    }
}

/// Group-by sum without pivoting: one value per index combination.
pub fn group_sum<T, F>(rows: &[T], index: &[Dimension], value: F) -> BTreeMap<Vec<KeyPart>, f64>
where
    T: Dimensioned,
    F: Fn(&T) -> f64,
{
    let mut out: BTreeMap<Vec<KeyPart>, f64> = BTreeMap::new();
    for r in rows {
        let key: Vec<KeyPart> = index.iter().map(|d| r.key(*d)).collect();
        *out.entry(key).or_insert(0.0) += value(r);
    }
    out
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index_position(&self, name: &str) -> Option<usize> {
        self.index.iter().position(|c| c == name)
    }

    pub fn value_position(&self, name: &str) -> Option<usize> {
        self.value_columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.value_position(column)?;
        self.rows.get(row)?.values.get(idx).copied().flatten()
    }

    /// Rows whose `constraint` key equals `c`.
    pub fn rows_for_constraint(&self, c: Constraint) -> Vec<&PivotRow> {
        let Some(pos) = self.index_position(Dimension::Constraint.name()) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter(|r| matches!(&r.keys[pos], KeyPart::Text(s) if s == c.as_str()))
            .collect()
    }

    /// Append the rows of `other`, matching index and value columns by name.
    /// Index values or categories `other` lacks become empty keys / `None`.
    pub fn extend(&mut self, other: PivotTable) {
        for c in &other.value_columns {
            if self.value_position(c).is_none() {
                // keep Total last
                let at = self.value_position(TOTAL).unwrap_or(self.value_columns.len());
                self.value_columns.insert(at, c.clone());
                for row in &mut self.rows {
                    row.values.insert(at, None);
                }
            }
        }
        let key_map: Vec<Option<usize>> = self.index.iter().map(|n| other.index_position(n)).collect();
        let value_map: Vec<Option<usize>> =
            self.value_columns.iter().map(|n| other.value_position(n)).collect();
        for row in other.rows {
            let keys = key_map
                .iter()
                .map(|p| match p {
                    Some(p) => row.keys[*p].clone(),
                    None => KeyPart::Text(String::new()),
                })
                .collect();
            let values = value_map.iter().map(|p| p.and_then(|p| row.values[p])).collect();
            self.rows.push(PivotRow { keys, values });
        }
    }

    /// Add a constant index column at `position`.
    pub fn insert_index(&mut self, position: usize, name: &str, value: KeyPart) {
        self.index.insert(position, name.to_string());
        for row in &mut self.rows {
            row.keys.insert(position, value.clone());
        }
    }

    pub fn to_table(&self) -> Table {
        let mut t = Table::new(self.index.iter().chain(self.value_columns.iter()).cloned());
        for row in &self.rows {
            let cells: Vec<Cell> = row
                .keys
                .iter()
                .cloned()
                .map(Cell::from)
                .chain(row.values.iter().map(|v| Cell::from(*v)))
                .collect();
            t.push_row(cells);
        }
        t
    }
}

/// Unit scale of a report: global tables in millions, per-country tables in
/// thousands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Global,
    Country,
}

/// Divisor applied to a measure before aggregation, by scale.
static UNIT_DIVISORS: Lazy<HashMap<Measure, (f64, f64)>> = Lazy::new(|| {
    HashMap::from([
        (Measure::ProductionTonnes, (1e6, 1e3)),
        (Measure::AllCostUsd, (1e6, 1e3)),
        (Measure::RevenueUsd, (1e6, 1e3)),
        (Measure::TransportTotalTonsCo2eq, (1e6, 1e3)),
        (Measure::EnergyTonsCo2eq, (1e6, 1e3)),
        (Measure::TransportTotalTonkm, (1e6, 1e3)),
        (Measure::EnergyReqCapacityKw, (1e6, 1e3)),
        (Measure::WaterUsageM3, (1e6, 1e3)),
    ])
});

/// Value added is reported in million USD at either scale.
pub const VALUE_ADDED_DIVISOR: f64 = 1e6;

pub fn unit_divisor(measure: Measure, scale: Scale) -> f64 {
    match (UNIT_DIVISORS.get(&measure), scale) {
        (Some((global, _)), Scale::Global) => *global,
        (Some((_, country)), Scale::Country) => *country,
        (None, _) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::obs;
    use crate::types::Observation;

    fn rows() -> Vec<Observation> {
        let mut a = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "ZMB", "copper", 1.0);
        a.revenue_usd = 10.0;
        let mut b = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "COD", "copper", 1.0);
        b.revenue_usd = 5.0;
        let mut c = obs("2030_mid_max_threshold_metal_tons", "region_constrained", "ZMB", "nickel", 1.0);
        c.revenue_usd = 7.0;
        vec![a, b, c]
    }

    #[test]
    fn fills_missing_combinations_with_zero() {
        let p = pivot(&rows(), &PivotSpec::by_mineral(), |o| o.revenue_usd);
        assert_eq!(p.value_columns, vec!["copper", "nickel", "Total"]);
        assert_eq!(p.rows.len(), 2);
        for row in &p.rows {
            assert_eq!(row.values.len(), 3);
            assert!(row.values.iter().all(|v| v.is_some()));
        }
        // mid_max sorts before mid_min
        assert_eq!(p.value(0, "copper"), Some(0.0));
        assert_eq!(p.value(0, "nickel"), Some(7.0));
        assert_eq!(p.value(0, TOTAL), Some(7.0));
        assert_eq!(p.value(1, "copper"), Some(15.0));
        assert_eq!(p.value(1, "nickel"), Some(0.0));
        assert_eq!(p.value(1, TOTAL), Some(15.0));
    }

    #[test]
    fn mean_without_fill_leaves_gaps() {
        let spec = PivotSpec {
            fill: None,
            total: TotalMode::Sum,
            ..PivotSpec::mean(vec![Dimension::Scenario], Dimension::ReferenceMineral)
        };
        let p = pivot(&rows(), &spec, |o| o.revenue_usd);
        assert_eq!(p.value(0, "copper"), None);
        assert_eq!(p.value(0, "nickel"), Some(7.0));
        assert_eq!(p.value(1, "copper"), Some(7.5));
        assert_eq!(p.value(1, "nickel"), None);
        assert_eq!(p.value(1, TOTAL), Some(7.5));
    }

    #[test]
    fn extend_aligns_columns() {
        let mut p = pivot(&rows()[..2], &PivotSpec::by_mineral(), |o| o.revenue_usd);
        let q = pivot(&rows()[2..], &PivotSpec::by_mineral(), |o| o.revenue_usd);
        p.extend(q);
        assert_eq!(p.value_columns, vec!["copper", "nickel", "Total"]);
        assert_eq!(p.value(0, "nickel"), None);
        assert_eq!(p.value(1, "nickel"), Some(7.0));
        assert_eq!(p.rows_for_constraint(Constraint::REGION_CONSTRAINED).len(), 1);
    }

    #[test]
    fn divisors_by_scale() {
        assert_eq!(unit_divisor(Measure::RevenueUsd, Scale::Global), 1e6);
        assert_eq!(unit_divisor(Measure::RevenueUsd, Scale::Country), 1e3);
        assert_eq!(unit_divisor(Measure::PriceUsdPerTonne, Scale::Global), 1.0);
    }
}
