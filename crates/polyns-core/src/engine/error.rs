use thiserror::Error;

use super::checkpoint::CheckpointError;
use super::config::ConfigError;
use crate::core::geometry::GrowthError;
use crate::core::models::cell::CellError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid geometric state: {source}")]
    DegenerateCell {
        #[from]
        source: CellError,
    },

    #[error("Initial configuration could not be grown: {source}")]
    Growth {
        #[from]
        source: GrowthError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Checkpoint failed: {source}")]
    Checkpoint {
        #[from]
        source: CheckpointError,
    },

    #[error("Trajectory export failed: {source}")]
    Trajectory {
        #[from]
        source: std::io::Error,
    },

    #[error("Eviction log write failed: {source}")]
    EvictionLog {
        #[from]
        source: csv::Error,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
