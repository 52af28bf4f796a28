//! Scenario identifiers such as `2030_mid_min_threshold_metal_tons`.
//!
//! The identifier encodes a year and a policy tag (demand level plus
//! allocation). It is parsed once when the fact table is loaded; everything
//! downstream works with [`ScenarioId`] fields instead of substring tests.
use crate::types::{Constraint, Observation, Scope};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DemandLevel {
    Low,
    Mid,
    High,
}

/// `Min` is the nationalist allocation, `Max` the regionalist one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Allocation {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolicyTag {
    pub demand: DemandLevel,
    pub allocation: Allocation,
}

impl PolicyTag {
    pub const MID_MIN: PolicyTag = PolicyTag::new(DemandLevel::Mid, Allocation::Min);
    pub const MID_MAX: PolicyTag = PolicyTag::new(DemandLevel::Mid, Allocation::Max);
    pub const LOW_MIN: PolicyTag = PolicyTag::new(DemandLevel::Low, Allocation::Min);
    pub const LOW_MAX: PolicyTag = PolicyTag::new(DemandLevel::Low, Allocation::Max);
    pub const HIGH_MIN: PolicyTag = PolicyTag::new(DemandLevel::High, Allocation::Min);
    pub const HIGH_MAX: PolicyTag = PolicyTag::new(DemandLevel::High, Allocation::Max);

    pub const fn new(demand: DemandLevel, allocation: Allocation) -> Self {
        PolicyTag { demand, allocation }
    }

    pub fn as_str(self) -> &'static str {
        match (self.demand, self.allocation) {
            (DemandLevel::Low, Allocation::Min) => "low_min",
            (DemandLevel::Low, Allocation::Max) => "low_max",
            (DemandLevel::Mid, Allocation::Min) => "mid_min",
            (DemandLevel::Mid, Allocation::Max) => "mid_max",
            (DemandLevel::High, Allocation::Min) => "high_min",
            (DemandLevel::High, Allocation::Max) => "high_max",
        }
    }

    /// First policy tag occurring in `s`, scanning the pair keys and then
    /// the pair values in declaration order.
    ///
    /// A string holding two tags reports only the first-declared one.
    pub fn find_in(s: &str) -> Option<PolicyTag> {
        POLICY_MATCHES
            .iter()
            .map(|(base, _)| *base)
            .chain(POLICY_MATCHES.iter().map(|(_, comp)| *comp))
            .find(|tag| s.contains(tag.as_str()))
    }
}

impl fmt::Display for PolicyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nationalist tag → regionalist tag it is compared against.
pub const POLICY_MATCHES: [(PolicyTag, PolicyTag); 3] = [
    (PolicyTag::MID_MIN, PolicyTag::MID_MAX),
    (PolicyTag::LOW_MIN, PolicyTag::LOW_MAX),
    (PolicyTag::HIGH_MIN, PolicyTag::HIGH_MAX),
];

/// Parsed scenario identifier. Keeps the raw string for labels and output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenarioId {
    raw: String,
    year: Option<i32>,
    tag: Option<PolicyTag>,
}

impl ScenarioId {
    pub fn parse(raw: &str) -> ScenarioId {
        let raw = raw.trim().to_string();
        let year = leading_year(&raw);
        let tag = PolicyTag::find_in(&raw);
        ScenarioId { raw, year, tag }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn tag(&self) -> Option<PolicyTag> {
        self.tag
    }

    pub fn demand(&self) -> Option<DemandLevel> {
        self.tag.map(|t| t.demand)
    }

    pub fn allocation(&self) -> Option<Allocation> {
        self.tag.map(|t| t.allocation)
    }

    /// The identifier without its leading `YYYY_` year token.
    pub fn general(&self) -> &str {
        match (self.year, self.raw.split_once('_')) {
            (Some(_), Some((_, rest))) => rest,
            _ => &self.raw,
        }
    }

    /// [`general`](Self::general) without the `_threshold_metal_tons` suffix, for titles.
    pub fn clean(&self) -> String {
        self.general().replace("_threshold_metal_tons", "")
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Leading `_`-separated token when it is exactly four ASCII digits.
fn leading_year(s: &str) -> Option<i32> {
    let first = s.split('_').next()?;
    if first.len() == 4 && first.bytes().all(|b| b.is_ascii_digit()) {
        first.parse().ok()
    } else {
        None
    }
}

/// `(year, tag)` pair for a raw scenario string.
pub fn parse_tag_year(scenario: &str) -> (Option<i32>, Option<PolicyTag>) {
    let id = ScenarioId::parse(scenario);
    (id.year, id.tag)
}

/// The two demand-policy regimes used by the all-country comparisons:
/// nationalist mid demand (`country_*` with `mid_min`) and regionalist mid
/// demand (`region_*` with `mid_max`).
pub fn in_canonical_regime(constraint: Constraint, scenario: &ScenarioId) -> bool {
    let allocation = match constraint.scope {
        Scope::Country => Allocation::Min,
        Scope::Region => Allocation::Max,
    };
    scenario.demand() == Some(DemandLevel::Mid) && scenario.allocation() == Some(allocation)
}

/// Processed rows (stage > 0) that fall in one of the canonical regimes.
pub fn canonical_filter(obs: &Observation) -> bool {
    obs.processing_stage.is_processed() && in_canonical_regime(obs.constraint, &obs.scenario)
}
