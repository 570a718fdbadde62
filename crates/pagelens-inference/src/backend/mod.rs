//! Inference backend implementations.

#[cfg(feature = "native")]
pub mod ort;

#[cfg(feature = "wasm")]
pub mod tract;

use crate::{InputTensor, OutputTensor, Result};

/// Trait for ONNX inference backends.
///
/// Abstracts over runtimes so the recognizer runs unchanged on native
/// platforms (via ort) and in the browser (via tract).
pub trait InferenceBackend: Send + Sync + Sized {
    /// Load a model from its serialized bytes.
    ///
    /// `input_shape` is the concrete NCHW shape the caller will feed. Runtimes
    /// with dynamic shape support may ignore it; tract needs it to type the
    /// graph before optimizing.
    fn from_bytes(bytes: &[u8], input_shape: &[usize]) -> Result<Self>;

    /// Run inference with the given named inputs.
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>>;

    /// Input names expected by the model, in declaration order.
    fn input_names(&self) -> &[String];
}
