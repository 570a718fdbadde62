//! ONNX model execution for pagelens.
//!
//! Recognition models arrive as raw bytes (a session never touches the
//! filesystem), so every backend is constructed from a byte slice:
//! - `ort` with the XNNPACK execution provider on native platforms
//! - `tract` for WASM/browser builds

mod backend;
mod error;
mod tensor;

pub use backend::InferenceBackend;
pub use error::InferenceError;
pub use tensor::{InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use backend::ort::OrtBackend;

#[cfg(feature = "wasm")]
pub use backend::tract::TractBackend;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
