//! Error types for the inference layer.

use thiserror::Error;

/// Errors that can occur while loading or running a model.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The model bytes could not be parsed.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The runtime rejected the session configuration.
    #[error("failed to create session: {0}")]
    SessionCreate(String),

    /// Input tensor does not match what the model expects.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Execution failed.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// Output tensor could not be converted.
    #[error("failed to extract output: {0}")]
    OutputExtraction(String),
}
