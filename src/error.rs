//! Error types for Marga

use thiserror::Error;

/// Marga error type
#[derive(Error, Debug)]
pub enum MargaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Roadmap error: {0}")]
    Roadmap(String),

    #[error("Filter error: {0}")]
    Filter(String),

    #[error("Planner error: {0}")]
    Planner(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for MargaError {
    fn from(e: toml::de::Error) -> Self {
        MargaError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MargaError>;
