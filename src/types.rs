use crate::scenario::ScenarioId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tabled::Tabled;

/// One line of the fact table as it appears in the CSV export.
///
/// Every field is optional so a missing column deserializes to `None`
/// instead of rejecting the whole row; the loader decides what is required.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    pub scenario: Option<String>,
    pub constraint: Option<String>,
    pub iso3: Option<String>,
    pub reference_mineral: Option<String>,
    pub processing_stage: Option<String>,
    pub processing_type: Option<String>,
    pub year: Option<String>,
    pub production_tonnes: Option<String>,
    pub price_usd_per_tonne: Option<String>,
    pub production_cost_usd_per_tonne: Option<String>,
    pub revenue_usd: Option<String>,
    pub all_cost_usd: Option<String>,
    pub gdp_usd: Option<String>,
    #[serde(rename = "energy_tonsCO2eq")]
    pub energy_tons_co2eq: Option<String>,
    pub water_usage_m3: Option<String>,
    #[serde(rename = "transport_total_tonsCO2eq")]
    pub transport_total_tons_co2eq: Option<String>,
    pub transport_total_tonkm: Option<String>,
    #[serde(rename = "energy_req_capacity_kW")]
    pub energy_req_capacity_kw: Option<String>,
    pub production_transport_energy_unit_cost_usd_per_tonne: Option<String>,
}

/// Numeric columns of the fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Measure {
    ProductionTonnes,
    PriceUsdPerTonne,
    ProductionCostUsdPerTonne,
    RevenueUsd,
    AllCostUsd,
    GdpUsd,
    EnergyTonsCo2eq,
    WaterUsageM3,
    TransportTotalTonsCo2eq,
    TransportTotalTonkm,
    EnergyReqCapacityKw,
    UnitCostUsdPerTonne,
}

impl Measure {
    pub const ALL: [Measure; 12] = [
        Measure::ProductionTonnes,
        Measure::PriceUsdPerTonne,
        Measure::ProductionCostUsdPerTonne,
        Measure::RevenueUsd,
        Measure::AllCostUsd,
        Measure::GdpUsd,
        Measure::EnergyTonsCo2eq,
        Measure::WaterUsageM3,
        Measure::TransportTotalTonsCo2eq,
        Measure::TransportTotalTonkm,
        Measure::EnergyReqCapacityKw,
        Measure::UnitCostUsdPerTonne,
    ];

    /// Column name in the source file.
    pub fn column(self) -> &'static str {
        match self {
            Measure::ProductionTonnes => "production_tonnes",
            Measure::PriceUsdPerTonne => "price_usd_per_tonne",
            Measure::ProductionCostUsdPerTonne => "production_cost_usd_per_tonne",
            Measure::RevenueUsd => "revenue_usd",
            Measure::AllCostUsd => "all_cost_usd",
            Measure::GdpUsd => "gdp_usd",
            Measure::EnergyTonsCo2eq => "energy_tonsCO2eq",
            Measure::WaterUsageM3 => "water_usage_m3",
            Measure::TransportTotalTonsCo2eq => "transport_total_tonsCO2eq",
            Measure::TransportTotalTonkm => "transport_total_tonkm",
            Measure::EnergyReqCapacityKw => "energy_req_capacity_kW",
            Measure::UnitCostUsdPerTonne => "production_transport_energy_unit_cost_usd_per_tonne",
        }
    }

    pub fn from_column(name: &str) -> Option<Measure> {
        Measure::ALL.into_iter().find(|m| m.column() == name)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Processing stage with a total order; fractional values are sub-stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stage(pub f64);

impl Stage {
    pub fn is_raw(self) -> bool {
        self.0 == 0.0
    }

    pub fn is_processed(self) -> bool {
        self.0 > 0.0
    }
}

impl PartialEq for Stage {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Stage {}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1.0 prints as "1", 4.2 as "4.2"
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Country,
    Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintState {
    Constrained,
    Unconstrained,
}

/// One of the four allocation regimes, e.g. `country_constrained`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constraint {
    pub scope: Scope,
    pub state: ConstraintState,
}

impl Constraint {
    pub const COUNTRY_CONSTRAINED: Constraint = Constraint::new(Scope::Country, ConstraintState::Constrained);
    pub const COUNTRY_UNCONSTRAINED: Constraint = Constraint::new(Scope::Country, ConstraintState::Unconstrained);
    pub const REGION_CONSTRAINED: Constraint = Constraint::new(Scope::Region, ConstraintState::Constrained);
    pub const REGION_UNCONSTRAINED: Constraint = Constraint::new(Scope::Region, ConstraintState::Unconstrained);

    pub const ALL: [Constraint; 4] = [
        Constraint::COUNTRY_CONSTRAINED,
        Constraint::COUNTRY_UNCONSTRAINED,
        Constraint::REGION_CONSTRAINED,
        Constraint::REGION_UNCONSTRAINED,
    ];

    pub const fn new(scope: Scope, state: ConstraintState) -> Self {
        Constraint { scope, state }
    }

    pub fn parse(s: &str) -> Option<Constraint> {
        Constraint::ALL.into_iter().find(|c| c.as_str() == s.trim())
    }

    pub fn as_str(self) -> &'static str {
        match (self.scope, self.state) {
            (Scope::Country, ConstraintState::Constrained) => "country_constrained",
            (Scope::Country, ConstraintState::Unconstrained) => "country_unconstrained",
            (Scope::Region, ConstraintState::Constrained) => "region_constrained",
            (Scope::Region, ConstraintState::Unconstrained) => "region_unconstrained",
        }
    }

    /// "Nationalist"/"Regionalist" plus "Constrained"/"Unconstrained", for figure titles.
    pub fn describe(self) -> String {
        let scope = match self.scope {
            Scope::Country => "Nationalist",
            Scope::Region => "Regionalist",
        };
        let state = match self.state {
            ConstraintState::Constrained => "Constrained",
            ConstraintState::Unconstrained => "Unconstrained",
        };
        format!("{} {}", scope, state)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six reference minerals with their display metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mineral {
    Cobalt,
    Copper,
    Graphite,
    Lithium,
    Manganese,
    Nickel,
}

impl Mineral {
    pub const ALL: [Mineral; 6] = [
        Mineral::Cobalt,
        Mineral::Copper,
        Mineral::Graphite,
        Mineral::Lithium,
        Mineral::Manganese,
        Mineral::Nickel,
    ];

    pub fn from_name(name: &str) -> Option<Mineral> {
        Mineral::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn from_short(short: &str) -> Option<Mineral> {
        Mineral::ALL.into_iter().find(|m| m.short() == short)
    }

    pub fn name(self) -> &'static str {
        match self {
            Mineral::Cobalt => "cobalt",
            Mineral::Copper => "copper",
            Mineral::Graphite => "graphite",
            Mineral::Lithium => "lithium",
            Mineral::Manganese => "manganese",
            Mineral::Nickel => "nickel",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Mineral::Cobalt => "Co",
            Mineral::Copper => "Cu",
            Mineral::Graphite => "Gr",
            Mineral::Lithium => "Li",
            Mineral::Manganese => "Mn",
            Mineral::Nickel => "Ni",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Mineral::Cobalt => "#fdae61",
            Mineral::Copper => "#f46d43",
            Mineral::Graphite => "#66c2a5",
            Mineral::Lithium => "#c2a5cf",
            Mineral::Manganese => "#fee08b",
            Mineral::Nickel => "#3288bd",
        }
    }
}

/// One fact-table row after cleaning.
#[derive(Debug, Clone)]
pub struct Observation {
    pub scenario: ScenarioId,
    pub constraint: Constraint,
    pub iso3: String,
    pub reference_mineral: String,
    pub processing_stage: Stage,
    pub processing_type: String,
    pub year: i32,
    pub production_tonnes: f64,
    pub price_usd_per_tonne: f64,
    pub production_cost_usd_per_tonne: f64,
    pub revenue_usd: f64,
    pub all_cost_usd: f64,
    pub gdp_usd: f64,
    pub energy_tons_co2eq: f64,
    pub water_usage_m3: f64,
    pub transport_total_tons_co2eq: f64,
    pub transport_total_tonkm: f64,
    pub energy_req_capacity_kw: f64,
    pub unit_cost_usd_per_tonne: f64,
}

impl Observation {
    pub fn measure(&self, m: Measure) -> f64 {
        match m {
            Measure::ProductionTonnes => self.production_tonnes,
            Measure::PriceUsdPerTonne => self.price_usd_per_tonne,
            Measure::ProductionCostUsdPerTonne => self.production_cost_usd_per_tonne,
            Measure::RevenueUsd => self.revenue_usd,
            Measure::AllCostUsd => self.all_cost_usd,
            Measure::GdpUsd => self.gdp_usd,
            Measure::EnergyTonsCo2eq => self.energy_tons_co2eq,
            Measure::WaterUsageM3 => self.water_usage_m3,
            Measure::TransportTotalTonsCo2eq => self.transport_total_tons_co2eq,
            Measure::TransportTotalTonkm => self.transport_total_tonkm,
            Measure::EnergyReqCapacityKw => self.energy_req_capacity_kw,
            Measure::UnitCostUsdPerTonne => self.unit_cost_usd_per_tonne,
        }
    }

    pub fn is_region_aggregate(&self) -> bool {
        self.iso3 == REGION_ISO3
    }

    pub fn mineral(&self) -> Option<Mineral> {
        Mineral::from_name(&self.reference_mineral)
    }
}

/// `iso3` sentinel for the region aggregate rows.
pub const REGION_ISO3: &str = "region";

/// Grouping dimensions usable as pivot index or pivot columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Scenario,
    Constraint,
    Iso3,
    ReferenceMineral,
    ReferenceMineralShort,
    ProcessingStage,
    ProcessingType,
    Year,
}

impl Dimension {
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Scenario => "scenario",
            Dimension::Constraint => "constraint",
            Dimension::Iso3 => "iso3",
            Dimension::ReferenceMineral => "reference_mineral",
            Dimension::ReferenceMineralShort => "reference_mineral_short",
            Dimension::ProcessingStage => "processing_stage",
            Dimension::ProcessingType => "processing_type",
            Dimension::Year => "year",
        }
    }
}

/// A single grouping-key component. Ordered so group keys sort the way a
/// reader expects: numbers numerically, labels lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    Int(i64),
    Stage(StageKey),
    Text(String),
}

/// Hashable stage key (bit pattern of the stage value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageKey(u64);

impl StageKey {
    pub fn stage(self) -> Stage {
        Stage(f64::from_bits(self.0))
    }
}

impl From<Stage> for StageKey {
    fn from(s: Stage) -> Self {
        // normalise -0.0 so it groups with 0.0
        let v = if s.0 == 0.0 { 0.0 } else { s.0 };
        StageKey(v.to_bits())
    }
}

impl PartialOrd for StageKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StageKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.stage().cmp(&other.stage())
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(v) => write!(f, "{}", v),
            KeyPart::Stage(s) => write!(f, "{}", s.stage()),
            KeyPart::Text(s) => f.write_str(s),
        }
    }
}

/// Anything that can be sliced along a [`Dimension`].
pub trait Dimensioned {
    fn key(&self, dim: Dimension) -> KeyPart;
}

impl<T: Dimensioned + ?Sized> Dimensioned for &T {
    fn key(&self, dim: Dimension) -> KeyPart {
        (**self).key(dim)
    }
}

impl Dimensioned for Observation {
    fn key(&self, dim: Dimension) -> KeyPart {
        match dim {
            Dimension::Scenario => KeyPart::Text(self.scenario.raw().to_string()),
            Dimension::Constraint => KeyPart::Text(self.constraint.as_str().to_string()),
            Dimension::Iso3 => KeyPart::Text(self.iso3.clone()),
            Dimension::ReferenceMineral => KeyPart::Text(self.reference_mineral.clone()),
            Dimension::ReferenceMineralShort => KeyPart::Text(
                self.mineral()
                    .map(|m| m.short().to_string())
                    .unwrap_or_else(|| self.reference_mineral.clone()),
            ),
            Dimension::ProcessingStage => KeyPart::Stage(self.processing_stage.into()),
            Dimension::ProcessingType => KeyPart::Text(self.processing_type.clone()),
            Dimension::Year => KeyPart::Int(self.year as i64),
        }
    }
}

/// One row of the flat per-country exports (`revenue_by_country.csv`, ...).
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CountryMetricRow {
    pub country: String,
    pub year: i32,
    pub reference_mineral: String,
    pub variable: String,
    #[tabled(display_with = "display_opt")]
    pub value: Option<f64>,
}

fn display_opt(v: &Option<f64>) -> String {
    match v {
        Some(x) => format!("{:.4}", x),
        None => String::new(),
    }
}

/// Run metadata written next to the results, one entry per job.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub input: String,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub jobs: Vec<JobOutcome>,
}

#[derive(Debug, Serialize)]
pub struct JobOutcome {
    pub job: String,
    pub ok: bool,
    pub files_written: usize,
    pub skipped: Vec<String>,
    pub error: Option<String>,
}
