// Domain error type shared by the valuation, roster, trade, and import layers.

use thiserror::Error;

use crate::model::Position;

#[derive(Debug, Error)]
pub enum FantasyError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("position limit reached: max {limit} {position} allowed")]
    CapacityExceeded { position: Position, limit: usize },

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl FantasyError {
    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FantasyError::NotFound(_) => "NotFound",
            FantasyError::InvalidInput(_) => "InvalidInput",
            FantasyError::CapacityExceeded { .. } => "CapacityExceeded",
            FantasyError::ExternalService(_) => "ExternalServiceError",
            FantasyError::Storage(_) => "Storage",
        }
    }
}

pub type Result<T> = std::result::Result<T, FantasyError>;
