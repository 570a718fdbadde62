//! Session engine: one image, one model, memoized analysis.

use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::EngineConfig;

use super::backend::RecognitionBackend;
use super::extract::BoxExtractor;
use super::hocr::HocrRenderer;
use super::orientation::OrientationDetector;
use super::pixels::PixelBuffer;
use super::progress::{ProgressMonitor, ProgressSink};
use super::{BoxItem, Orientation, TextItem, TextUnit};

/// How far the current image has been processed.
///
/// Each state implies the ones before it; results of a state stay valid
/// until the image is replaced or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// No image loaded.
    Empty,
    ImageLoaded,
    LayoutAnalyzed,
    Recognized,
}

/// OCR session over a single image and recognition model.
///
/// Not meant for concurrent use; run separate engines for parallel work.
pub struct OcrEngine<B: RecognitionBackend> {
    backend: B,
    state: SessionState,
    model_loaded: bool,
}

impl<B: RecognitionBackend> OcrEngine<B> {
    /// Create an empty session.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SessionState::Empty,
            model_loaded: false,
        }
    }

    pub fn version(&self) -> String {
        self.backend.version()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model_loaded
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Apply configured backend variables.
    ///
    /// All or nothing: if one variable is rejected, the ones already set
    /// go back to their previous values.
    pub fn configure(&mut self, config: &EngineConfig) -> Result<(), OcrError> {
        let mut applied: Vec<(&str, String)> = Vec::new();
        for (name, value) in &config.variables {
            let previous = self.backend.variable(name);
            if let Err(e) = self.backend.set_variable(name, value) {
                for (name, previous) in applied.into_iter().rev() {
                    if let Err(restore) = self.backend.set_variable(name, &previous) {
                        warn!("Failed to restore variable {}: {}", name, restore);
                    }
                }
                return Err(e);
            }
            if let Some(previous) = previous {
                applied.push((name.as_str(), previous));
            }
        }
        Ok(())
    }

    /// Load (or replace) the recognition model.
    ///
    /// Text recognized with a previous model is discarded; layout results
    /// are kept.
    pub fn load_model(&mut self, bytes: &[u8], lang: &str) -> Result<(), OcrError> {
        if bytes.is_empty() {
            return Err(OcrError::ModelLoad("model data is empty".to_string()));
        }

        self.backend.load_model(bytes, lang)?;
        self.model_loaded = true;

        if self.state == SessionState::Recognized {
            debug!("Dropping recognition results made with the previous model");
            self.state = SessionState::LayoutAnalyzed;
        }

        info!("Loaded model ({} bytes, lang {})", bytes.len(), lang);
        Ok(())
    }

    /// Load a new image, replacing the current one.
    ///
    /// The buffer is dropped once the backend has taken its copy.
    pub fn load_image(&mut self, image: PixelBuffer) -> Result<(), OcrError> {
        self.backend.set_image(&image)?;
        self.state = SessionState::ImageLoaded;
        info!("Loaded {}x{} image", image.width(), image.height());
        Ok(())
    }

    /// Load a new image from packed RGBA bytes.
    pub fn load_image_bytes(&mut self, width: u32, height: u32, bytes: &[u8]) -> Result<(), OcrError> {
        self.load_image(PixelBuffer::from_rgba_bytes(width, height, bytes)?)
    }

    /// Release the image and everything computed from it.
    pub fn clear_image(&mut self) {
        self.backend.clear();
        self.state = SessionState::Empty;
        debug!("Image cleared");
    }

    /// Layout geometry at `unit` granularity.
    pub fn bounding_boxes(&mut self, unit: TextUnit) -> Result<Vec<BoxItem>, OcrError> {
        self.ensure_layout()?;
        Ok(BoxExtractor::boxes(self.backend.page_iterator(), unit))
    }

    /// Recognized regions at `unit` granularity.
    pub fn text_boxes(
        &mut self,
        unit: TextUnit,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<TextItem>, OcrError> {
        self.ensure_recognized(progress)?;
        Ok(BoxExtractor::text_boxes(self.backend.page_iterator(), unit))
    }

    /// Recognized page text.
    pub fn text(&mut self, progress: &mut dyn ProgressSink) -> Result<String, OcrError> {
        self.ensure_recognized(progress)?;
        Ok(self.backend.utf8_text())
    }

    /// Recognized page as an hOCR document.
    pub fn hocr(&mut self, progress: &mut dyn ProgressSink) -> Result<String, OcrError> {
        self.ensure_recognized(progress)?;
        let renderer = HocrRenderer::new(self.backend.version());
        Ok(renderer.render(&self.backend.hocr_fragment(0)))
    }

    /// Estimate page orientation.
    ///
    /// Independent of layout and recognition. Detection failures give a
    /// zero-confidence upright result instead of an error.
    pub fn orientation(&mut self) -> Result<Orientation, OcrError> {
        if self.state == SessionState::Empty {
            return Err(OcrError::NoImage);
        }

        let Some(binary) = self.backend.thresholded_image() else {
            warn!("Orientation detection skipped: no thresholded image");
            return Ok(Orientation::default());
        };

        match OrientationDetector::new().detect(&binary) {
            Ok(scores) => {
                let orientation = Orientation::from_scores(scores);
                debug!("Orientation: {} degrees", orientation.rotation);
                Ok(orientation)
            }
            Err(e) => {
                warn!("Orientation detection failed: {}", e);
                Ok(Orientation::default())
            }
        }
    }

    pub fn variable(&self, name: &str) -> Option<String> {
        self.backend.variable(name)
    }

    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<(), OcrError> {
        self.backend.set_variable(name, value)
    }

    fn ensure_layout(&mut self) -> Result<(), OcrError> {
        match self.state {
            SessionState::Empty => Err(OcrError::NoImage),
            SessionState::ImageLoaded => {
                self.backend.analyze_layout()?;
                self.state = SessionState::LayoutAnalyzed;
                Ok(())
            }
            SessionState::LayoutAnalyzed | SessionState::Recognized => Ok(()),
        }
    }

    fn ensure_recognized(&mut self, progress: &mut dyn ProgressSink) -> Result<(), OcrError> {
        if self.state == SessionState::Empty {
            return Err(OcrError::NoImage);
        }
        if !self.model_loaded {
            return Err(OcrError::NoModel);
        }

        let mut monitor = ProgressMonitor::new(progress);

        if self.state == SessionState::Recognized {
            debug!("Using cached recognition results");
        } else {
            self.ensure_layout()?;
            self.backend.recognize(&mut monitor)?;
            self.state = SessionState::Recognized;
            info!("Recognition complete");
        }

        monitor.finish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(feature = "native")]
    #[test]
    fn test_native_engine_starts_empty() {
        use crate::ocr::PageBackend;
        use pagelens_inference::OrtBackend;

        let mut engine = OcrEngine::new(PageBackend::<OrtBackend>::new());
        assert_eq!(engine.state(), SessionState::Empty);
        assert!(!engine.is_model_loaded());
        assert!(engine.version().starts_with("pagelens "));
        assert_eq!(engine.bounding_boxes(TextUnit::Word), Err(OcrError::NoImage));
        assert_eq!(
            engine.load_model(b"", "eng"),
            Err(OcrError::ModelLoad("model data is empty".to_string()))
        );
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_native_engine_layout_without_model() {
        use crate::ocr::PageBackend;
        use pagelens_inference::OrtBackend;

        let (width, height) = (80u32, 30u32);
        let mut bytes = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (10..20).contains(&y) && (10..30).contains(&x) { 0 } else { 255 };
                bytes.extend([v, v, v, 255]);
            }
        }

        let mut engine = OcrEngine::new(PageBackend::<OrtBackend>::new());
        engine.load_image_bytes(width, height, &bytes).unwrap();

        let boxes = engine.bounding_boxes(TextUnit::Word).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].rect, crate::ocr::Rect::new(10, 10, 30, 20));
        assert_eq!(engine.state(), SessionState::LayoutAnalyzed);
        assert_eq!(engine.text(&mut |_: u8| {}), Err(OcrError::NoModel));
    }
}
