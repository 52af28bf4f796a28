//! Percentage change between nationalist and regionalist scenarios.
//!
//! Rows of a pivot filtered to a `country_*` regime are joined with rows
//! filtered to the matching `region_*` regime. A pair matches when the
//! country row carries a policy key (`mid_min`, ...) and the region row the
//! paired value (`mid_max`, ...), either in the same year or ten years later.
use crate::pivot::PivotTable;
use crate::scenario::{ScenarioId, POLICY_MATCHES};
use crate::table::{Cell, Table};
use crate::types::{Constraint, Dimension, KeyPart};
use crate::util::round2;
use std::collections::BTreeSet;

/// Years between the base year and the later year of the offset comparison.
pub const OFFSET_YEARS: i32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct PctChangeRow {
    pub scenario: String,
    pub constraint: String,
    pub values: Vec<Option<f64>>,
}

/// A scenario-labelled row of values, aligned to a caller-chosen column list.
#[derive(Debug, Clone)]
pub struct ScenarioValues {
    pub scenario: ScenarioId,
    pub values: Vec<Option<f64>>,
}

/// `comp / base * 100 - 100`; undefined when `base` is missing or zero.
pub fn pct_change(base: Option<f64>, comp: Option<f64>) -> Option<f64> {
    match (base, comp) {
        (Some(a), Some(b)) if a != 0.0 => Some(b / a * 100.0 - 100.0),
        _ => None,
    }
}

/// Region-versus-country change within a single row.
///
/// Both zero is a genuine 0%; a zero country value alone is undefined.
pub fn safe_pct_change(region: f64, country: f64) -> Option<f64> {
    if country == 0.0 && region == 0.0 {
        Some(0.0)
    } else if country == 0.0 {
        None
    } else {
        Some(round2(region / country * 100.0 - 100.0))
    }
}

fn constraint_label(constraint_1: Constraint) -> String {
    let first = constraint_1.as_str().split('_').next().unwrap_or_default();
    format!("pct_change_{}", first)
}

/// Join `country` rows against `region` rows for every policy pair.
///
/// For each pair in declaration order: same-year matches over the sorted
/// years both sides share, then `region.year == country.year + 10` matches.
/// Multiple rows on either side for one key produce every combination.
pub fn pct_change_rows(
    country: &[ScenarioValues],
    region: &[ScenarioValues],
    constraint_1: Constraint,
) -> Vec<PctChangeRow> {
    let label = constraint_label(constraint_1);
    let years_a: BTreeSet<i32> = country.iter().filter_map(|r| r.scenario.year()).collect();
    let years_b: BTreeSet<i32> = region.iter().filter_map(|r| r.scenario.year()).collect();

    let mut out = Vec::new();
    for (base, comp) in POLICY_MATCHES {
        let mut join = |y1: i32, y2: i32| {
            let left = country
                .iter()
                .filter(|r| r.scenario.year() == Some(y1) && r.scenario.tag() == Some(base));
            for r1 in left {
                let right = region
                    .iter()
                    .filter(|r| r.scenario.year() == Some(y2) && r.scenario.tag() == Some(comp));
                for r2 in right {
                    let values = r1
                        .values
                        .iter()
                        .zip(r2.values.iter())
                        .map(|(a, b)| pct_change(*a, *b))
                        .collect();
                    out.push(PctChangeRow {
                        scenario: format!("{}_vs_{}", r1.scenario, r2.scenario),
                        constraint: label.clone(),
                        values,
                    });
                }
            }
        };
        for year in years_a.intersection(&years_b) {
            join(*year, *year);
        }
        for year in &years_a {
            join(*year, *year + OFFSET_YEARS);
        }
    }
    out
}

/// Rows of `pivot` for one constraint, projected onto `value_cols`.
fn scenario_values(pivot: &PivotTable, constraint: Constraint, value_cols: &[String]) -> Vec<ScenarioValues> {
    let Some(scenario_pos) = pivot.index_position(Dimension::Scenario.name()) else {
        return Vec::new();
    };
    let positions: Vec<Option<usize>> = value_cols.iter().map(|c| pivot.value_position(c)).collect();
    pivot
        .rows_for_constraint(constraint)
        .into_iter()
        .map(|row| {
            let scenario = match &row.keys[scenario_pos] {
                KeyPart::Text(s) => ScenarioId::parse(s),
                other => ScenarioId::parse(&other.to_string()),
            };
            let values = positions.iter().map(|p| p.and_then(|p| row.values[p])).collect();
            ScenarioValues { scenario, values }
        })
        .collect()
}

/// Percentage change from `constraint_1` rows to `constraint_2` rows of a pivot.
pub fn pct_change_between_both(
    pivot: &PivotTable,
    constraint_1: Constraint,
    constraint_2: Constraint,
    value_cols: &[String],
) -> Vec<PctChangeRow> {
    let a = scenario_values(pivot, constraint_1, value_cols);
    let b = scenario_values(pivot, constraint_2, value_cols);
    pct_change_rows(&a, &b, constraint_1)
}

/// The pivot followed by its constrained and unconstrained comparison rows.
pub fn with_policy_comparisons(pivot: &PivotTable) -> Table {
    let cols = pivot.value_columns.clone();
    let constrained = pct_change_between_both(pivot, Constraint::COUNTRY_CONSTRAINED, Constraint::REGION_CONSTRAINED, &cols);
    let unconstrained =
        pct_change_between_both(pivot, Constraint::COUNTRY_UNCONSTRAINED, Constraint::REGION_UNCONSTRAINED, &cols);
    append_pct_rows(pivot.to_table(), &cols, constrained.into_iter().chain(unconstrained))
}

/// Append comparison rows to `table`; index columns other than scenario and
/// constraint stay empty.
pub fn append_pct_rows<I>(mut table: Table, value_cols: &[String], rows: I) -> Table
where
    I: IntoIterator<Item = PctChangeRow>,
{
    let scenario_idx = table.column_index(Dimension::Scenario.name());
    let constraint_idx = table.column_index(Dimension::Constraint.name());
    let value_idx: Vec<Option<usize>> = value_cols.iter().map(|c| table.column_index(c)).collect();
    let width = table.columns.len();
    for r in rows {
        let mut cells = vec![Cell::Empty; width];
        if let Some(i) = scenario_idx {
            cells[i] = Cell::Text(r.scenario);
        }
        if let Some(i) = constraint_idx {
            cells[i] = Cell::Text(r.constraint);
        }
        for (idx, v) in value_idx.iter().zip(r.values) {
            if let Some(i) = idx {
                cells[*i] = Cell::from(v);
            }
        }
        table.push_row(cells);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(scenario: &str, v: f64) -> ScenarioValues {
        ScenarioValues { scenario: ScenarioId::parse(scenario), values: vec![Some(v)] }
    }

    #[test]
    fn identity_and_undefined_cases() {
        assert_eq!(pct_change(Some(42.0), Some(42.0)), Some(0.0));
        assert_eq!(pct_change(Some(0.0), Some(5.0)), None);
        assert_eq!(pct_change(None, Some(5.0)), None);
        assert_eq!(safe_pct_change(0.0, 0.0), Some(0.0));
        assert_eq!(safe_pct_change(5.0, 0.0), None);
        assert_ne!(safe_pct_change(5.0, 0.0), safe_pct_change(0.0, 0.0));
        assert_eq!(safe_pct_change(150.0, 100.0), Some(50.0));
        assert_eq!(safe_pct_change(1.0, 3.0), Some(-66.67));
    }

    #[test]
    fn same_year_pair() {
        let a = vec![sv("2030_mid_min_threshold_metal_tons", 100.0)];
        let b = vec![sv("2030_mid_max_threshold_metal_tons", 150.0)];
        let rows = pct_change_rows(&a, &b, Constraint::COUNTRY_CONSTRAINED);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values, vec![Some(50.0)]);
        assert_eq!(
            rows[0].scenario,
            "2030_mid_min_threshold_metal_tons_vs_2030_mid_max_threshold_metal_tons"
        );
        assert_eq!(rows[0].constraint, "pct_change_country");
    }

    #[test]
    fn offset_year_pair_joins_ten_years_later() {
        let a = vec![sv("2030_mid_min_threshold_metal_tons", 100.0)];
        let b = vec![
            sv("2030_mid_max_threshold_metal_tons", 150.0),
            sv("2040_mid_max_threshold_metal_tons", 300.0),
        ];
        let rows = pct_change_rows(&a, &b, Constraint::COUNTRY_UNCONSTRAINED);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values, vec![Some(50.0)]);
        assert_eq!(
            rows[1].scenario,
            "2030_mid_min_threshold_metal_tons_vs_2040_mid_max_threshold_metal_tons"
        );
        assert_eq!(rows[1].values, vec![Some(200.0)]);
    }

    #[test]
    fn mismatched_tags_never_join() {
        let a = vec![sv("2030_mid_min_x", 100.0), sv("2030_low_max_x", 1.0)];
        let b = vec![sv("2030_low_max_x", 150.0), sv("2030_mid_min_x", 1.0)];
        assert!(pct_change_rows(&a, &b, Constraint::COUNTRY_CONSTRAINED).is_empty());
    }

    #[test]
    fn duplicates_produce_every_combination() {
        let a = vec![sv("2030_high_min_a", 10.0), sv("2030_high_min_b", 20.0)];
        let b = vec![sv("2030_high_max_a", 30.0), sv("2030_high_max_b", 40.0)];
        let rows = pct_change_rows(&a, &b, Constraint::COUNTRY_CONSTRAINED);
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn zero_base_is_undefined_not_zero() {
        let a = vec![sv("2030_mid_min_x", 0.0)];
        let b = vec![sv("2030_mid_max_x", 10.0)];
        let rows = pct_change_rows(&a, &b, Constraint::COUNTRY_CONSTRAINED);
        assert_eq!(rows[0].values, vec![None]);
    }
}
