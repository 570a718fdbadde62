//! Recognition backends driven by the session engine.

use image::GrayImage;
use tracing::{debug, info};

use crate::error::OcrError;
use pagelens_inference::InferenceBackend;

use super::hocr::page_fragment;
use super::iterator::PageIterator;
use super::layout::{LayoutAnalyzer, PageLayout};
use super::pixels::PixelBuffer;
use super::preprocessing::ImagePreprocessor;
use super::progress::ProgressSink;
use super::recognizer::TextRecognizer;
use super::variables::BackendVariables;

/// Context kept around each word when cropping it for recognition.
const WORD_PADDING: i32 = 2;

/// Layout analysis and text recognition over one image at a time.
///
/// Implementations keep their own copy of the current image and any
/// analysis results; the engine decides when those results are stale.
pub trait RecognitionBackend {
    /// Human-readable name and version.
    fn version(&self) -> String;

    /// Replace the recognition model. On failure the previous model stays.
    fn load_model(&mut self, bytes: &[u8], lang: &str) -> Result<(), OcrError>;

    /// Take a private copy of `image`, dropping the previous image and its
    /// results first. Rejected images leave the backend untouched.
    fn set_image(&mut self, image: &PixelBuffer) -> Result<(), OcrError>;

    /// Drop the image and everything derived from it.
    fn clear(&mut self);

    /// Segment the current image.
    fn analyze_layout(&mut self) -> Result<(), OcrError>;

    /// Recognize every word of the current layout, analyzing it first if needed.
    fn recognize(&mut self, progress: &mut dyn ProgressSink) -> Result<(), OcrError>;

    /// Cursor over the current results, `None` if there are none.
    fn page_iterator(&self) -> Option<PageIterator<'_>>;

    /// Plain text of the current results.
    fn utf8_text(&self) -> String;

    /// hOCR `ocr_page` element for the current results.
    fn hocr_fragment(&self, page_number: u32) -> String;

    /// Binarized copy of the current image.
    fn thresholded_image(&mut self) -> Option<GrayImage>;

    fn variable(&self, name: &str) -> Option<String>;

    fn set_variable(&mut self, name: &str, value: &str) -> Result<(), OcrError>;
}

/// Built-in backend: connected-component layout and CRNN word recognition.
pub struct PageBackend<R: InferenceBackend> {
    vars: BackendVariables,
    preprocessor: ImagePreprocessor,
    recognizer: Option<TextRecognizer<R>>,
    lang: String,
    image: Option<GrayImage>,
    binary: Option<GrayImage>,
    layout: Option<PageLayout>,
}

impl<R: InferenceBackend> PageBackend<R> {
    pub fn new() -> Self {
        Self::with_variables(BackendVariables::default())
    }

    pub fn with_variables(vars: BackendVariables) -> Self {
        Self {
            vars,
            preprocessor: ImagePreprocessor::new(),
            recognizer: None,
            lang: String::from("eng"),
            image: None,
            binary: None,
            layout: None,
        }
    }

    fn ensure_binary(&mut self) -> Result<(), OcrError> {
        let image = self.image.as_ref().ok_or(OcrError::NoImage)?;
        if self.binary.is_none() {
            self.binary = Some(self.preprocessor.binarize(
                image,
                self.vars.threshold_window,
                self.vars.threshold_offset,
            ));
        }
        Ok(())
    }
}

impl<R: InferenceBackend> Default for PageBackend<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: InferenceBackend> RecognitionBackend for PageBackend<R> {
    fn version(&self) -> String {
        format!("pagelens {}", env!("CARGO_PKG_VERSION"))
    }

    fn load_model(&mut self, bytes: &[u8], lang: &str) -> Result<(), OcrError> {
        let recognizer = TextRecognizer::from_model(bytes, lang, self.vars.recognition_height)?;
        self.recognizer = Some(recognizer);
        self.lang = lang.to_string();

        // Text read by the previous model is stale; the geometry is not.
        if let Some(layout) = self.layout.as_mut() {
            layout.clear_recognition();
        }
        Ok(())
    }

    fn set_image(&mut self, image: &PixelBuffer) -> Result<(), OcrError> {
        let max = self.vars.max_image_dimension;
        if image.width() > max || image.height() > max {
            return Err(OcrError::ImageDecode(format!(
                "{}x{} exceeds the maximum dimension of {}",
                image.width(),
                image.height(),
                max
            )));
        }

        self.clear();
        self.image = Some(image.to_luma());
        debug!("Backend holds {}x{} image", image.width(), image.height());
        Ok(())
    }

    fn clear(&mut self) {
        self.layout = None;
        self.binary = None;
        self.image = None;
    }

    fn analyze_layout(&mut self) -> Result<(), OcrError> {
        self.ensure_binary()?;
        let binary = self.binary.as_ref().ok_or(OcrError::NoImage)?;
        let layout = LayoutAnalyzer::new(&self.vars).analyze(binary);
        info!("Layout analysis found {} words", layout.word_count());
        self.layout = Some(layout);
        Ok(())
    }

    fn recognize(&mut self, progress: &mut dyn ProgressSink) -> Result<(), OcrError> {
        if self.layout.is_none() {
            self.analyze_layout()?;
        }

        let recognizer = self.recognizer.as_ref().ok_or(OcrError::NoModel)?;
        let image = self.image.as_ref().ok_or(OcrError::NoImage)?;
        let layout = self.layout.as_mut().ok_or(OcrError::NoImage)?;

        let total = layout.word_count();
        for (done, word) in layout.words_mut().enumerate() {
            let crop = self.preprocessor.crop(image, &word.rect, WORD_PADDING);
            let result = recognizer.recognize(&crop)?;
            word.text = result.text;
            word.confidence = result.confidence * 100.0;
            progress.on_progress(((done + 1) * 100 / total) as u8);
        }

        info!("Recognized {} words", total);
        Ok(())
    }

    fn page_iterator(&self) -> Option<PageIterator<'_>> {
        self.layout
            .as_ref()
            .and_then(PageIterator::new)
            .map(|it| it.with_preserve_spaces(self.vars.preserve_interword_spaces))
    }

    fn utf8_text(&self) -> String {
        self.layout
            .as_ref()
            .map(|l| l.utf8_text(self.vars.preserve_interword_spaces))
            .unwrap_or_default()
    }

    fn hocr_fragment(&self, page_number: u32) -> String {
        let (width, height) = self.image.as_ref().map(|i| i.dimensions()).unwrap_or((0, 0));
        let empty = PageLayout::default();
        let layout = self.layout.as_ref().unwrap_or(&empty);
        page_fragment(layout, page_number, width, height, &self.lang)
    }

    fn thresholded_image(&mut self) -> Option<GrayImage> {
        self.ensure_binary().ok()?;
        self.binary.clone()
    }

    fn variable(&self, name: &str) -> Option<String> {
        self.vars.get(name)
    }

    fn set_variable(&mut self, name: &str, value: &str) -> Result<(), OcrError> {
        self.vars.set(name, value)?;
        if name.starts_with("threshold_") {
            self.binary = None;
        }
        debug!("Set {} = {}", name, value);
        Ok(())
    }
}
