//! Error types for the pagelens-core library.

use thiserror::Error;

/// Top-level error type, used outside of the engine's own operations
/// (configuration files, image files, raw inference calls).
#[derive(Error, Debug)]
pub enum PagelensError {
    /// Engine operation error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Inference error from the inference layer.
    #[error("inference error: {0}")]
    Inference(#[from] pagelens_inference::InferenceError),

    /// Image file decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or written.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Errors reported by engine operations.
///
/// Every variant is terminal for the call that produced it and leaves the
/// session usable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OcrError {
    /// Model bytes were empty, corrupt or incompatible.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Zero dimensions or a pixel buffer shorter than the dimensions require.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The recognition backend rejected the pixel data.
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Operation needs an image and none is loaded.
    #[error("no image loaded")]
    NoImage,

    /// Operation needs a recognition model and none is loaded.
    #[error("no model loaded")]
    NoModel,

    /// Unknown variable name or unparseable value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Layout analysis or recognition failed inside the backend.
    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// Result type for the pagelens library.
pub type Result<T> = std::result::Result<T, PagelensError>;
