pub mod charts;
pub mod config;
pub mod error;
pub mod jobs;
pub mod loader;
pub mod output;
pub mod pct_change;
pub mod pivot;
pub mod reports;
pub mod scenario;
pub mod schema;
pub mod share;
pub mod table;
pub mod types;
pub mod util;
pub mod value_added;

#[cfg(test)]
mod testutil;

pub use error::{ReportError, Result};
