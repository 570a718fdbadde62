//! OCR session engine and its collaborators.

mod backend;
mod engine;
mod extract;
mod hocr;
mod iterator;
mod layout;
mod orientation;
mod pixels;
mod preprocessing;
mod progress;
mod recognizer;
mod variables;

pub use backend::{PageBackend, RecognitionBackend};
pub use engine::{OcrEngine, SessionState};
pub use extract::BoxExtractor;
pub use hocr::HocrRenderer;
pub use iterator::{PageIterator, PageLevel};
pub use layout::{Block, LayoutAnalyzer, PageLayout, Paragraph, TextLine, Word};
pub use orientation::{OrientationDetector, OrientationScores};
pub use pixels::PixelBuffer;
pub use preprocessing::ImagePreprocessor;
pub use progress::{ProgressMonitor, ProgressSink};
pub use recognizer::{RecognitionResult, TextRecognizer};
pub use variables::BackendVariables;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Axis-aligned rectangle in image pixel coordinates.
///
/// `right` and `bottom` are exclusive, so a single pixel at (x, y) is
/// `Rect::new(x, y, x + 1, y + 1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Create a rectangle, normalizing so that `left <= right` and `top <= bottom`.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Length of the overlap of the two vertical extents (0 if disjoint).
    pub fn vertical_overlap(&self, other: &Rect) -> i32 {
        (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0)
    }

    /// Length of the overlap of the two horizontal extents (0 if disjoint).
    pub fn horizontal_overlap(&self, other: &Rect) -> i32 {
        (self.right.min(other.right) - self.left.max(other.left)).max(0)
    }

    /// Union of a sequence of rectangles, `None` if it is empty.
    pub fn enclosing<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc, r| match acc {
            None => Some(*r),
            Some(acc) => Some(acc.union(r)),
        })
    }
}

/// Position of a word-level item within its text line.
///
/// Always empty for line-level items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutFlags(u8);

impl LayoutFlags {
    /// First element of its text line.
    pub const START_OF_LINE: LayoutFlags = LayoutFlags(1);
    /// Last element of its text line.
    pub const END_OF_LINE: LayoutFlags = LayoutFlags(2);

    pub const fn empty() -> Self {
        LayoutFlags(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: LayoutFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: LayoutFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for LayoutFlags {
    type Output = LayoutFlags;

    fn bitor(self, rhs: LayoutFlags) -> LayoutFlags {
        LayoutFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for LayoutFlags {
    fn bitor_assign(&mut self, rhs: LayoutFlags) {
        self.insert(rhs);
    }
}

/// Granularity at which boxes and text are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextUnit {
    Line,
    Word,
}

impl TextUnit {
    /// Layout hierarchy level this unit walks.
    pub fn level(self) -> PageLevel {
        match self {
            TextUnit::Line => PageLevel::Line,
            TextUnit::Word => PageLevel::Word,
        }
    }
}

impl FromStr for TextUnit {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "line" => Ok(TextUnit::Line),
            "word" => Ok(TextUnit::Word),
            other => Err(OcrError::Config(format!("unknown text unit: {}", other))),
        }
    }
}

impl TryFrom<u32> for TextUnit {
    type Error = OcrError;

    /// Numeric form used across the WASM boundary (0 = line, 1 = word).
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TextUnit::Line),
            1 => Ok(TextUnit::Word),
            other => Err(OcrError::Config(format!("unknown text unit: {}", other))),
        }
    }
}

impl fmt::Display for TextUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextUnit::Line => write!(f, "line"),
            TextUnit::Word => write!(f, "word"),
        }
    }
}

/// Geometry produced by layout analysis alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxItem {
    pub rect: Rect,
    pub flags: LayoutFlags,
}

/// Geometry plus recognition output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub rect: Rect,
    pub flags: LayoutFlags,
    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
    pub text: String,
}

impl From<TextItem> for BoxItem {
    fn from(item: TextItem) -> Self {
        BoxItem {
            rect: item.rect,
            flags: item.flags,
        }
    }
}

/// Coarse page orientation estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Clockwise rotation of the page content: 0, 90, 180 or 270.
    pub rotation: u16,
    /// 1.0 when the estimate was accepted, 0.0 when detection failed.
    pub confidence: f32,
}
