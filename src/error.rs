//! Service-level error types

use thiserror::Error;

/// Errors surfaced by the orchestrator service itself.
///
/// Backend and provider failures are absorbed into degraded results long
/// before they reach this type; only configuration and request problems
/// escape to the API layer.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
