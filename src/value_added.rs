//! Sequential value added across ordered processing stages.
//!
//! Within a group of rows sharing scenario, constraint, country and mineral,
//! the value added at a stage is its revenue minus the cost of the
//! feedstock taken from the stage immediately before it.
use crate::types::{Dimension, Dimensioned, KeyPart, Observation};
use std::collections::BTreeMap;

/// An observation paired with the value added at its stage.
#[derive(Debug, Clone, Copy)]
pub struct StagedValue<'a> {
    pub obs: &'a Observation,
    pub value_added: f64,
}

impl Dimensioned for StagedValue<'_> {
    fn key(&self, dim: Dimension) -> KeyPart {
        self.obs.key(dim)
    }
}

/// Value added for one group, in ascending stage order.
///
/// The first row has nothing to subtract and gets 0, as does any row whose
/// predecessor produced nothing. The input is only read.
pub fn value_added_for_group<'a>(group: &[&'a Observation]) -> Vec<StagedValue<'a>> {
    let mut sorted: Vec<&'a Observation> = group.to_vec();
    // stable, so equal stages keep input order
    sorted.sort_by(|a, b| a.processing_stage.cmp(&b.processing_stage));

    let mut out = Vec::with_capacity(sorted.len());
    let mut prev: Option<&Observation> = None;
    for curr in sorted {
        let value_added = match prev {
            Some(p) if p.production_tonnes > 0.0 => {
                curr.price_usd_per_tonne * curr.production_tonnes
                    - p.production_cost_usd_per_tonne * p.production_tonnes
            }
            _ => 0.0,
        };
        out.push(StagedValue { obs: curr, value_added });
        prev = Some(curr);
    }
    out
}

/// Grouping used by every value-added computation.
pub const VALUE_ADDED_GROUP: [Dimension; 4] = [
    Dimension::Scenario,
    Dimension::Constraint,
    Dimension::Iso3,
    Dimension::ReferenceMineral,
];

/// Apply [`value_added_for_group`] to every `(scenario, constraint, iso3,
/// mineral)` group of `rows`. Output is ordered by group key, then stage.
pub fn compute_value_added<'a>(rows: &[&'a Observation]) -> Vec<StagedValue<'a>> {
    let mut groups: BTreeMap<Vec<KeyPart>, Vec<&'a Observation>> = BTreeMap::new();
    for obs in rows {
        let key: Vec<KeyPart> = VALUE_ADDED_GROUP.iter().map(|d| obs.key(*d)).collect();
        groups.entry(key).or_default().push(*obs);
    }
    groups
        .values()
        .flat_map(|g| value_added_for_group(g))
        .collect()
}

/// Processed rows (stage > 0) with their value added.
pub fn processed_value_added(rows: &[Observation]) -> Vec<StagedValue<'_>> {
    let processed: Vec<&Observation> = rows.iter().filter(|o| o.processing_stage.is_processed()).collect();
    compute_value_added(&processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::obs;
    use crate::types::Stage;

    fn stage(s: f64, prod: f64, price: f64, cost: f64) -> Observation {
        let mut o = obs("2030_mid_min_threshold_metal_tons", "country_constrained", "ZMB", "copper", s);
        o.production_tonnes = prod;
        o.price_usd_per_tonne = price;
        o.production_cost_usd_per_tonne = cost;
        o
    }

    #[test]
    fn first_row_is_zero_and_rest_subtract_feedstock() {
        // deliberately unsorted
        let rows = vec![stage(3.1, 50.0, 20.0, 5.0), stage(1.0, 100.0, 10.0, 4.0), stage(5.0, 10.0, 300.0, 0.0)];
        let refs: Vec<&Observation> = rows.iter().collect();
        let va = value_added_for_group(&refs);
        let stages: Vec<Stage> = va.iter().map(|v| v.obs.processing_stage).collect();
        assert_eq!(stages, vec![Stage(1.0), Stage(3.1), Stage(5.0)]);
        assert_eq!(va[0].value_added, 0.0);
        assert_eq!(va[1].value_added, 20.0 * 50.0 - 4.0 * 100.0);
        assert_eq!(va[2].value_added, 300.0 * 10.0 - 5.0 * 50.0);
    }

    #[test]
    fn zero_feedstock_guard() {
        let rows = vec![stage(1.0, 0.0, 10.0, 4.0), stage(2.0, 50.0, 999.0, 5.0)];
        let refs: Vec<&Observation> = rows.iter().collect();
        let va = value_added_for_group(&refs);
        assert_eq!(va[1].value_added, 0.0);
    }

    #[test]
    fn single_row_group_is_all_zero() {
        let rows = vec![stage(2.0, 50.0, 999.0, 5.0)];
        let refs: Vec<&Observation> = rows.iter().collect();
        let va = value_added_for_group(&refs);
        assert_eq!(va.len(), 1);
        assert_eq!(va[0].value_added, 0.0);
    }

    #[test]
    fn groups_do_not_leak_into_each_other() {
        let mut other = stage(2.0, 50.0, 20.0, 5.0);
        other.iso3 = "COD".to_string();
        let rows = vec![stage(1.0, 100.0, 10.0, 4.0), other, stage(0.0, 1.0, 1.0, 1.0)];
        let va = processed_value_added(&rows);
        assert_eq!(va.len(), 2);
        assert!(va.iter().all(|v| v.value_added == 0.0));
        // input untouched
        assert_eq!(rows[0].production_tonnes, 100.0);
    }
}
