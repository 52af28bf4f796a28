//! Column-presence checks: the identifying columns every row needs, and the
//! optional measure columns.
use crate::error::ReportError;
use crate::types::Measure;
use std::collections::BTreeSet;

/// Columns without which no row can be placed in a group.
pub const KEY_COLUMNS: [&str; 5] = ["scenario", "constraint", "iso3", "reference_mineral", "processing_stage"];

/// Which columns the loaded file actually carried.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    present: BTreeSet<Measure>,
    missing_keys: Vec<&'static str>,
}

/// Outcome of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Available(Vec<Measure>),
    Unavailable(Vec<Measure>),
}

impl Schema {
    pub fn from_headers<'a, I>(headers: I) -> Schema
    where
        I: IntoIterator<Item = &'a str>,
    {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
        let present = headers.iter().filter_map(|h| Measure::from_column(h)).collect();
        let missing_keys = KEY_COLUMNS.into_iter().filter(|k| !headers.contains(k)).collect();
        Schema { present, missing_keys }
    }

    /// Every measure present; used by tests and in-memory callers.
    pub fn complete() -> Schema {
        Schema { present: Measure::ALL.into_iter().collect(), missing_keys: Vec::new() }
    }

    pub fn has(&self, m: Measure) -> bool {
        self.present.contains(&m)
    }

    pub fn check(&self, needed: &[Measure]) -> Capability {
        let missing: Vec<Measure> = needed.iter().copied().filter(|m| !self.has(*m)).collect();
        if missing.is_empty() {
            Capability::Available(needed.to_vec())
        } else {
            Capability::Unavailable(missing)
        }
    }

    /// [`check`](Self::check) turned into a `Result` naming the table that needed the columns.
    pub fn require(&self, table: &str, needed: &[Measure]) -> Result<(), ReportError> {
        match self.check(needed) {
            Capability::Available(_) => Ok(()),
            Capability::Unavailable(missing) => Err(ReportError::MissingColumns {
                table: table.to_string(),
                missing: missing.iter().map(|m| m.column().to_string()).collect(),
            }),
        }
    }

    /// Identifying columns absent from the header.
    pub fn missing_keys(&self) -> &[&'static str] {
        &self.missing_keys
    }

    /// Fails when any identifying column is absent: every row would have
    /// been rejected, so nothing downstream has data to work with.
    pub fn require_keys(&self) -> Result<(), ReportError> {
        if self.missing_keys.is_empty() {
            Ok(())
        } else {
            Err(ReportError::MissingColumns {
                table: "fact_table".to_string(),
                missing: self.missing_keys.iter().map(|k| k.to_string()).collect(),
            })
        }
    }

    pub fn missing(&self) -> Vec<Measure> {
        Measure::ALL.into_iter().filter(|m| !self.has(*m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_missing_columns() {
        let schema = Schema::from_headers(["scenario", "production_tonnes", "revenue_usd"]);
        assert_eq!(
            schema.check(&[Measure::ProductionTonnes, Measure::GdpUsd]),
            Capability::Unavailable(vec![Measure::GdpUsd])
        );
        assert!(matches!(
            schema.check(&[Measure::RevenueUsd]),
            Capability::Available(_)
        ));
        let err = schema.require("unit_costs", &[Measure::UnitCostUsdPerTonne]).unwrap_err();
        assert!(err.to_string().contains("production_transport_energy_unit_cost_usd_per_tonne"));
    }

    #[test]
    fn absent_key_columns_fail_require_keys() {
        let schema = Schema::from_headers(["scenario", " iso3 ", "reference_mineral", "production_tonnes"]);
        assert_eq!(schema.missing_keys(), &["constraint", "processing_stage"]);
        let err = schema.require_keys().unwrap_err();
        assert_eq!(err.to_string(), "fact_table: missing required column(s): constraint, processing_stage");

        let full = Schema::from_headers(KEY_COLUMNS);
        assert!(full.require_keys().is_ok());
        assert!(Schema::complete().require_keys().is_ok());
    }
}
