use crate::scenario::ScenarioId;
use crate::types::{Constraint, Observation, Stage};

/// Observation with every measure zeroed.
pub fn obs(scenario: &str, constraint: &str, iso3: &str, mineral: &str, stage: f64) -> Observation {
    let scenario = ScenarioId::parse(scenario);
    Observation {
        year: scenario.year().unwrap_or(2022),
        scenario,
        constraint: Constraint::parse(constraint).expect("test constraint"),
        iso3: iso3.to_string(),
        reference_mineral: mineral.to_string(),
        processing_stage: Stage(stage),
        processing_type: "Early refining".to_string(),
        production_tonnes: 0.0,
        price_usd_per_tonne: 0.0,
        production_cost_usd_per_tonne: 0.0,
        revenue_usd: 0.0,
        all_cost_usd: 0.0,
        gdp_usd: 0.0,
        energy_tons_co2eq: 0.0,
        water_usage_m3: 0.0,
        transport_total_tons_co2eq: 0.0,
        transport_total_tonkm: 0.0,
        energy_req_capacity_kw: 0.0,
        unit_cost_usd_per_tonne: 0.0,
    }
}
