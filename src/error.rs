use thiserror::Error;

/// Errors raised while loading the fact table or building a report table.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A table needs measure columns the input file does not carry.
    #[error("{table}: missing required column(s): {}", missing.join(", "))]
    MissingColumns { table: String, missing: Vec<String> },

    /// Filtering left nothing to aggregate.
    #[error("{table}: no rows left after filtering")]
    EmptySelection { table: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown job `{0}`")]
    UnknownJob(String),

    #[error("unknown job group `{0}`")]
    UnknownGroup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
