//! OCR session engine.
//!
//! This crate provides:
//! - A lifecycle-checked engine (`OcrEngine`) over one page image and one model
//! - Memoized layout analysis and recognition
//! - Word/line box extraction, plain text, hOCR output and orientation estimation
//! - A built-in recognition backend (`PageBackend`) using connected-component
//!   layout analysis and a CRNN recognition model

pub mod error;
pub mod models;
pub mod ocr;

pub use error::{OcrError, PagelensError, Result};
pub use models::config::{EngineConfig, ModelConfig, PagelensConfig};
pub use ocr::{
    BackendVariables, BoxItem, LayoutFlags, OcrEngine, Orientation, PageBackend, PageIterator,
    PageLevel, PixelBuffer, ProgressSink, Rect, RecognitionBackend, SessionState, TextItem,
    TextUnit,
};

/// Re-export inference types.
pub use pagelens_inference::{InferenceBackend, InferenceError};

#[cfg(feature = "native")]
pub use pagelens_inference::OrtBackend;

#[cfg(feature = "wasm")]
pub use pagelens_inference::TractBackend;

/// Engine running the built-in backend on ONNX Runtime.
#[cfg(feature = "native")]
pub type NativeEngine = OcrEngine<PageBackend<OrtBackend>>;

/// Engine running the built-in backend on tract.
#[cfg(feature = "wasm")]
pub type WasmEngine = OcrEngine<PageBackend<TractBackend>>;
