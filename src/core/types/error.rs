use std::path::PathBuf;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("Invalid summary {}: {reason}", path.display())]
    InvalidSummary { path: PathBuf, reason: String },

    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("Cannot compare an empty sample")]
    EmptySample,
    #[error("Sample contains a non-finite value: {0}")]
    NonFinite(f64),
    #[error("Hit count {hits} exceeds trial count {trials}")]
    TooManyHits { hits: u32, trials: u32 },
}
