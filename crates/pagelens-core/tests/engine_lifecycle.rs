//! Session lifecycle tests against a scripted backend.

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use pagelens_core::ocr::{Block, PageLayout, Paragraph, TextLine, Word};
use pagelens_core::{
    EngineConfig, LayoutFlags, OcrEngine, OcrError, Orientation, PageIterator, PixelBuffer,
    ProgressSink, Rect, RecognitionBackend, SessionState, TextUnit,
};
use pretty_assertions::assert_eq;

/// Backend that counts calls and produces one line of fixed words.
struct FakeBackend {
    words: Vec<(&'static str, f32)>,
    progress_steps: Vec<u8>,
    binary: Option<GrayImage>,
    reject_images: bool,
    variables: BTreeMap<String, String>,

    image: Option<(u32, u32)>,
    layout: Option<PageLayout>,

    layout_runs: usize,
    recognize_runs: usize,
    model_loads: usize,
}

impl FakeBackend {
    fn new() -> Self {
        Self {
            words: vec![("hello", 93.0), ("world", 81.0)],
            progress_steps: vec![30, 20, 70],
            binary: None,
            reject_images: false,
            variables: BTreeMap::from([("word_gap".to_string(), "0.5".to_string())]),
            image: None,
            layout: None,
            layout_runs: 0,
            recognize_runs: 0,
            model_loads: 0,
        }
    }

    fn with_words(mut self, words: Vec<(&'static str, f32)>) -> Self {
        self.words = words;
        self
    }

    fn with_binary(mut self, binary: GrayImage) -> Self {
        self.binary = Some(binary);
        self
    }
}

impl RecognitionBackend for FakeBackend {
    fn version(&self) -> String {
        "fake 1.0".to_string()
    }

    fn load_model(&mut self, bytes: &[u8], _lang: &str) -> Result<(), OcrError> {
        if bytes == b"corrupt" {
            return Err(OcrError::ModelLoad("corrupt".to_string()));
        }
        self.model_loads += 1;
        Ok(())
    }

    fn set_image(&mut self, image: &PixelBuffer) -> Result<(), OcrError> {
        if self.reject_images {
            return Err(OcrError::ImageDecode("rejected".to_string()));
        }
        self.clear();
        self.image = Some((image.width(), image.height()));
        Ok(())
    }

    fn clear(&mut self) {
        self.image = None;
        self.layout = None;
    }

    fn analyze_layout(&mut self) -> Result<(), OcrError> {
        if self.image.is_none() {
            return Err(OcrError::NoImage);
        }
        self.layout_runs += 1;

        let words = self
            .words
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let left = 10 + i as i32 * 40;
                Word::new(Rect::new(left, 10, left + 30, 20))
            })
            .collect();
        self.layout = Some(PageLayout::new(vec![Block::new(vec![Paragraph::new(vec![
            TextLine::new(words),
        ])])]));
        Ok(())
    }

    fn recognize(&mut self, progress: &mut dyn ProgressSink) -> Result<(), OcrError> {
        self.recognize_runs += 1;
        let layout = self.layout.as_mut().ok_or(OcrError::NoImage)?;
        for (word, (text, confidence)) in layout.words_mut().zip(&self.words) {
            word.text = text.to_string();
            word.confidence = *confidence;
        }
        for &step in &self.progress_steps {
            progress.on_progress(step);
        }
        Ok(())
    }

    fn page_iterator(&self) -> Option<PageIterator<'_>> {
        self.layout.as_ref().and_then(PageIterator::new)
    }

    fn utf8_text(&self) -> String {
        self.layout
            .as_ref()
            .map(|l| l.utf8_text(false))
            .unwrap_or_default()
    }

    fn hocr_fragment(&self, page_number: u32) -> String {
        format!("  <div class='ocr_page' id='page_{}'></div>\n", page_number + 1)
    }

    fn thresholded_image(&mut self) -> Option<GrayImage> {
        self.image?;
        self.binary.clone()
    }

    fn variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }

    fn set_variable(&mut self, name: &str, value: &str) -> Result<(), OcrError> {
        match self.variables.get_mut(name) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(OcrError::Config(format!("unknown variable: {}", name))),
        }
    }
}

fn white_page() -> PixelBuffer {
    PixelBuffer::new(100, 40, vec![0xFFFFFFFF; 4000]).unwrap()
}

fn loaded_engine(backend: FakeBackend) -> OcrEngine<FakeBackend> {
    let mut engine = OcrEngine::new(backend);
    engine.load_model(b"model", "eng").unwrap();
    engine.load_image(white_page()).unwrap();
    engine
}

fn no_progress() -> impl FnMut(u8) {
    |_| {}
}

#[test]
fn test_queries_need_an_image() {
    let mut engine = OcrEngine::new(FakeBackend::new());
    engine.load_model(b"model", "eng").unwrap();

    assert_eq!(engine.bounding_boxes(TextUnit::Word), Err(OcrError::NoImage));
    assert_eq!(engine.text_boxes(TextUnit::Word, &mut no_progress()), Err(OcrError::NoImage));
    assert_eq!(engine.text(&mut no_progress()), Err(OcrError::NoImage));
    assert_eq!(engine.hocr(&mut no_progress()), Err(OcrError::NoImage));
    assert_eq!(engine.orientation(), Err(OcrError::NoImage));
    assert_eq!(engine.backend().layout_runs, 0);
}

#[test]
fn test_text_queries_need_a_model() {
    let mut engine = OcrEngine::new(FakeBackend::new());
    engine.load_image(white_page()).unwrap();

    assert_eq!(engine.text_boxes(TextUnit::Line, &mut no_progress()), Err(OcrError::NoModel));
    assert_eq!(engine.text(&mut no_progress()), Err(OcrError::NoModel));
    assert_eq!(engine.hocr(&mut no_progress()), Err(OcrError::NoModel));

    // Geometry does not need a model.
    assert_eq!(engine.bounding_boxes(TextUnit::Word).unwrap().len(), 2);
    assert_eq!(engine.backend().recognize_runs, 0);
}

#[test]
fn test_layout_is_memoized() {
    let mut engine = loaded_engine(FakeBackend::new());
    assert_eq!(engine.state(), SessionState::ImageLoaded);

    let first = engine.bounding_boxes(TextUnit::Word).unwrap();
    let second = engine.bounding_boxes(TextUnit::Word).unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.backend().layout_runs, 1);
    assert_eq!(engine.state(), SessionState::LayoutAnalyzed);

    // Recognition reuses the layout.
    engine.text_boxes(TextUnit::Word, &mut no_progress()).unwrap();
    assert_eq!(engine.backend().layout_runs, 1);
}

#[test]
fn test_recognition_is_memoized() {
    let mut engine = loaded_engine(FakeBackend::new());

    let text = engine.text(&mut no_progress()).unwrap();
    assert_eq!(text, "hello world\n\n");
    engine.text_boxes(TextUnit::Line, &mut no_progress()).unwrap();
    engine.hocr(&mut no_progress()).unwrap();
    engine.bounding_boxes(TextUnit::Line).unwrap();

    assert_eq!(engine.backend().recognize_runs, 1);
    assert_eq!(engine.backend().layout_runs, 1);
    assert_eq!(engine.state(), SessionState::Recognized);
}

#[test]
fn test_new_image_invalidates_results() {
    let mut engine = loaded_engine(FakeBackend::new());
    engine.text(&mut no_progress()).unwrap();

    engine.load_image(white_page()).unwrap();
    assert_eq!(engine.state(), SessionState::ImageLoaded);

    engine.bounding_boxes(TextUnit::Word).unwrap();
    assert_eq!(engine.backend().layout_runs, 2);
    engine.text(&mut no_progress()).unwrap();
    assert_eq!(engine.backend().recognize_runs, 2);
}

#[test]
fn test_clear_image_invalidates_results() {
    let mut engine = loaded_engine(FakeBackend::new());
    engine.bounding_boxes(TextUnit::Word).unwrap();

    engine.clear_image();
    assert_eq!(engine.state(), SessionState::Empty);
    assert_eq!(engine.bounding_boxes(TextUnit::Word), Err(OcrError::NoImage));
    assert!(engine.is_model_loaded());

    engine.load_image(white_page()).unwrap();
    engine.bounding_boxes(TextUnit::Word).unwrap();
    assert_eq!(engine.backend().layout_runs, 2);
}

#[test]
fn test_new_model_invalidates_recognition_only() {
    let mut engine = loaded_engine(FakeBackend::new());
    engine.text(&mut no_progress()).unwrap();

    engine.load_model(b"other model", "pol").unwrap();
    assert_eq!(engine.state(), SessionState::LayoutAnalyzed);

    engine.text(&mut no_progress()).unwrap();
    assert_eq!(engine.backend().recognize_runs, 2);
    assert_eq!(engine.backend().layout_runs, 1);
}

#[test]
fn test_failed_model_load_changes_nothing() {
    let mut engine = OcrEngine::new(FakeBackend::new());
    assert!(matches!(engine.load_model(b"corrupt", "eng"), Err(OcrError::ModelLoad(_))));
    assert!(matches!(engine.load_model(b"", "eng"), Err(OcrError::ModelLoad(_))));
    assert!(!engine.is_model_loaded());

    let mut engine = loaded_engine(FakeBackend::new());
    engine.text(&mut no_progress()).unwrap();
    assert!(engine.load_model(b"corrupt", "eng").is_err());
    assert!(engine.is_model_loaded());
    assert_eq!(engine.state(), SessionState::Recognized);
}

#[test]
fn test_confidence_is_a_fraction() {
    let backend = FakeBackend::new().with_words(vec![("over", 140.0), ("under", -20.0), ("ok", 55.0)]);
    let mut engine = loaded_engine(backend);

    for unit in [TextUnit::Word, TextUnit::Line] {
        let items = engine.text_boxes(unit, &mut no_progress()).unwrap();
        assert!(!items.is_empty());
        for item in items {
            assert!((0.0..=1.0).contains(&item.confidence), "{:?}", item);
        }
    }

    let words = engine.text_boxes(TextUnit::Word, &mut no_progress()).unwrap();
    assert!((words[2].confidence - 0.55).abs() < 1e-6);
    assert_eq!(words[2].text, "ok");
}

#[test]
fn test_word_flags_on_two_word_line() {
    let mut engine = loaded_engine(FakeBackend::new());
    let items = engine.bounding_boxes(TextUnit::Word).unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].flags, LayoutFlags::START_OF_LINE);
    assert_eq!(items[1].flags, LayoutFlags::END_OF_LINE);
    assert_eq!(items[0].rect, Rect::new(10, 10, 40, 20));
}

#[test]
fn test_word_flags_on_single_word_line() {
    let mut engine = loaded_engine(FakeBackend::new().with_words(vec![("alone", 90.0)]));
    let items = engine.bounding_boxes(TextUnit::Word).unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].flags, LayoutFlags::START_OF_LINE | LayoutFlags::END_OF_LINE);
}

#[test]
fn test_line_items_have_no_flags() {
    let mut engine = loaded_engine(FakeBackend::new());

    let boxes = engine.bounding_boxes(TextUnit::Line).unwrap();
    assert_eq!(boxes.len(), 1);
    assert!(boxes[0].flags.is_empty());

    let items = engine.text_boxes(TextUnit::Line, &mut no_progress()).unwrap();
    assert_eq!(items[0].text, "hello world");
    assert!(items[0].flags.is_empty());
}

#[test]
fn test_progress_ends_with_100() {
    let mut engine = loaded_engine(FakeBackend::new());

    let mut seen = Vec::new();
    engine.text(&mut |p: u8| seen.push(p)).unwrap();
    assert_eq!(seen, vec![30, 30, 70, 100]);

    // Served from cache: still a terminal 100.
    let mut cached = Vec::new();
    engine
        .text_boxes(TextUnit::Word, &mut |p: u8| cached.push(p))
        .unwrap();
    assert_eq!(cached, vec![100]);

    let mut hocr = Vec::new();
    engine.hocr(&mut |p: u8| hocr.push(p)).unwrap();
    assert_eq!(hocr, vec![100]);
}

#[test]
fn test_no_progress_on_failure() {
    let mut engine = OcrEngine::new(FakeBackend::new());
    engine.load_image(white_page()).unwrap();

    let mut seen = Vec::new();
    assert!(engine.text(&mut |p: u8| seen.push(p)).is_err());
    assert!(seen.is_empty());
}

#[test]
fn test_hocr_document() {
    let mut engine = loaded_engine(FakeBackend::new());
    let hocr = engine.hocr(&mut no_progress()).unwrap();

    assert!(hocr.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(hocr.contains("<meta name='ocr-system' content='fake 1.0' />"));
    assert!(hocr.contains("<div class='ocr_page' id='page_1'></div>"));
    assert!(hocr.trim_end().ends_with("</html>"));
}

/// One line of 2px glyphs; every third glyph has an ascender.
fn upright_text() -> GrayImage {
    let mut image = GrayImage::new(60, 40);
    for (i, x) in (5..55u32).step_by(4).enumerate() {
        let top = if i % 3 == 0 { 8 } else { 15 };
        for y in top..25 {
            image.put_pixel(x, y, Luma([255]));
            image.put_pixel(x + 1, y, Luma([255]));
        }
    }
    image
}

#[test]
fn test_orientation_of_upright_text() {
    let mut engine = loaded_engine(FakeBackend::new().with_binary(upright_text()));
    let orientation = engine.orientation().unwrap();

    assert_eq!(orientation, Orientation { rotation: 0, confidence: 1.0 });
    // Independent of layout and recognition.
    assert_eq!(engine.state(), SessionState::ImageLoaded);
    assert_eq!(engine.backend().layout_runs, 0);
}

#[test]
fn test_orientation_of_inverted_text() {
    let inverted = image::imageops::rotate180(&upright_text());
    let mut engine = loaded_engine(FakeBackend::new().with_binary(inverted));
    assert_eq!(engine.orientation().unwrap().rotation, 180);
}

#[test]
fn test_orientation_failure_degrades() {
    // Blank page: detector has nothing to measure.
    let mut engine = loaded_engine(FakeBackend::new().with_binary(GrayImage::new(30, 30)));
    assert_eq!(engine.orientation().unwrap(), Orientation { rotation: 0, confidence: 0.0 });

    // No thresholded image at all.
    let mut engine = loaded_engine(FakeBackend::new());
    assert_eq!(engine.orientation().unwrap(), Orientation::default());
}

#[test]
fn test_invalid_images_are_rejected() {
    let mut engine = OcrEngine::new(FakeBackend::new());

    assert!(matches!(
        engine.load_image_bytes(0, 10, &[0; 400]),
        Err(OcrError::InvalidImage(_))
    ));
    assert!(matches!(
        engine.load_image_bytes(10, 10, &[0; 399]),
        Err(OcrError::InvalidImage(_))
    ));
    assert_eq!(engine.state(), SessionState::Empty);

    // Extra trailing bytes are fine.
    engine.load_image_bytes(10, 10, &[255; 410]).unwrap();
    assert_eq!(engine.state(), SessionState::ImageLoaded);
}

#[test]
fn test_rejected_image_keeps_previous_session() {
    let mut engine = loaded_engine(FakeBackend::new());
    engine.bounding_boxes(TextUnit::Word).unwrap();

    let mut backend = FakeBackend::new();
    backend.reject_images = true;
    let mut rejecting = OcrEngine::new(backend);
    assert!(matches!(rejecting.load_image(white_page()), Err(OcrError::ImageDecode(_))));
    assert_eq!(rejecting.state(), SessionState::Empty);

    // A failed load on a live session keeps its cached layout.
    assert!(engine.load_image_bytes(0, 0, &[]).is_err());
    assert_eq!(engine.state(), SessionState::LayoutAnalyzed);
    engine.bounding_boxes(TextUnit::Word).unwrap();
    assert_eq!(engine.backend().layout_runs, 1);
}

#[test]
fn test_variables_pass_through() {
    let mut engine = OcrEngine::new(FakeBackend::new());
    assert_eq!(engine.variable("word_gap").as_deref(), Some("0.5"));
    assert_eq!(engine.variable("missing"), None);

    engine.set_variable("word_gap", "0.9").unwrap();
    assert_eq!(engine.variable("word_gap").as_deref(), Some("0.9"));
    assert!(matches!(engine.set_variable("missing", "1"), Err(OcrError::Config(_))));

    let config = EngineConfig {
        variables: BTreeMap::from([("word_gap".to_string(), "1.5".to_string())]),
    };
    engine.configure(&config).unwrap();
    assert_eq!(engine.variable("word_gap").as_deref(), Some("1.5"));
}

#[test]
fn test_configure_is_all_or_nothing() {
    let mut engine = OcrEngine::new(FakeBackend::new());
    let config = EngineConfig {
        variables: BTreeMap::from([
            ("word_gap".to_string(), "1.5".to_string()),
            ("zoom".to_string(), "2".to_string()),
        ]),
    };

    assert!(matches!(engine.configure(&config), Err(OcrError::Config(_))));
    assert_eq!(engine.variable("word_gap").as_deref(), Some("0.5"));
}
