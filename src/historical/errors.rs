use thiserror::Error;

use crate::volume_profile::errors::ProfileError;

/// Failures at the I/O boundary of the binary: files, CSV bars, TOML config, JSON output.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}
