//! Error types for the simulation harness.

/// Errors that can occur while setting up or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("scenario failed: {0}")]
    Scenario(&'static str),
}
