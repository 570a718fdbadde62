//! WASM bindings for the pagelens OCR session engine.
//!
//! The engine runs synchronously; long recognitions belong in a Web Worker,
//! with progress reported through the optional callback.

use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;
use web_sys::ImageData;

use pagelens_core::{
    OcrEngine, PageBackend, PixelBuffer, TextUnit as CoreTextUnit, TractBackend, WasmEngine,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Granularity of box queries.
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextUnit {
    Line = 0,
    Word = 1,
}

fn js_error(e: impl ToString) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(js_error)
}

/// Units arrive as plain numbers, so out-of-range values are possible.
fn parse_unit(unit: u32) -> Result<CoreTextUnit, JsValue> {
    CoreTextUnit::try_from(unit).map_err(js_error)
}

/// Forward progress to an optional JS callback.
fn progress_sink(callback: Option<js_sys::Function>) -> impl FnMut(u8) {
    move |percent: u8| {
        if let Some(f) = &callback {
            // Exceptions from the callback must not abort recognition.
            let _ = f.call1(&JsValue::NULL, &JsValue::from(percent));
        }
    }
}

/// OCR session over one image and one recognition model.
#[wasm_bindgen(js_name = OcrEngine)]
pub struct JsOcrEngine {
    inner: WasmEngine,
}

#[wasm_bindgen(js_class = OcrEngine)]
impl JsOcrEngine {
    /// Create an empty session.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: OcrEngine::new(PageBackend::<TractBackend>::new()),
        }
    }

    pub fn version(&self) -> String {
        self.inner.version()
    }

    /// Load an ONNX recognition model for `lang` (e.g. "eng").
    #[wasm_bindgen(js_name = loadModel)]
    pub fn load_model(&mut self, model: &[u8], lang: &str) -> Result<(), JsValue> {
        self.inner.load_model(model, lang).map_err(js_error)
    }

    /// Load an image from packed RGBA bytes.
    #[wasm_bindgen(js_name = loadImage)]
    pub fn load_image(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<(), JsValue> {
        self.inner
            .load_image_bytes(width, height, pixels)
            .map_err(js_error)
    }

    /// Load an image from a canvas `ImageData`.
    #[wasm_bindgen(js_name = loadImageData)]
    pub fn load_image_data(&mut self, image: &ImageData) -> Result<(), JsValue> {
        let pixels = image.data();
        let buffer = PixelBuffer::from_rgba_bytes(image.width(), image.height(), &pixels.0)
            .map_err(js_error)?;
        self.inner.load_image(buffer).map_err(js_error)
    }

    #[wasm_bindgen(js_name = clearImage)]
    pub fn clear_image(&mut self) {
        self.inner.clear_image();
    }

    /// Layout boxes as `{rect, flags}` objects.
    #[wasm_bindgen(js_name = getBoundingBoxes)]
    pub fn get_bounding_boxes(&mut self, unit: u32) -> Result<JsValue, JsValue> {
        let boxes = self
            .inner
            .bounding_boxes(parse_unit(unit)?)
            .map_err(js_error)?;
        to_js(&boxes)
    }

    /// Recognized regions as `{rect, flags, confidence, text}` objects.
    #[wasm_bindgen(js_name = getTextBoxes)]
    pub fn get_text_boxes(
        &mut self,
        unit: u32,
        progress: Option<js_sys::Function>,
    ) -> Result<JsValue, JsValue> {
        let unit = parse_unit(unit)?;
        let items = self
            .inner
            .text_boxes(unit, &mut progress_sink(progress))
            .map_err(js_error)?;
        to_js(&items)
    }

    #[wasm_bindgen(js_name = getText)]
    pub fn get_text(&mut self, progress: Option<js_sys::Function>) -> Result<String, JsValue> {
        self.inner
            .text(&mut progress_sink(progress))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = getHOCR)]
    pub fn get_hocr(&mut self, progress: Option<js_sys::Function>) -> Result<String, JsValue> {
        self.inner
            .hocr(&mut progress_sink(progress))
            .map_err(js_error)
    }

    /// `{rotation, confidence}` estimate.
    #[wasm_bindgen(js_name = getOrientation)]
    pub fn get_orientation(&mut self) -> Result<JsValue, JsValue> {
        let orientation = self.inner.orientation().map_err(js_error)?;
        to_js(&orientation)
    }

    #[wasm_bindgen(js_name = getVariable)]
    pub fn get_variable(&self, name: &str) -> Option<String> {
        self.inner.variable(name)
    }

    #[wasm_bindgen(js_name = setVariable)]
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<(), JsValue> {
        self.inner
            .set_variable(name, value)
            .map_err(js_error)
    }
}

impl Default for JsOcrEngine {
    fn default() -> Self {
        Self::new()
    }
}
