//! Named tunables of the built-in recognition backend.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OcrError;

const MIN_RECOGNITION_HEIGHT: u32 = 8;
const MAX_RECOGNITION_HEIGHT: u32 = 256;

/// Backend tunables, readable and writable by name as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendVariables {
    /// Side of the square window used for local mean thresholding (odd, >= 3).
    pub threshold_window: u32,

    /// How much darker than the local mean a pixel must be to count as ink.
    pub threshold_offset: i32,

    /// Connected components with fewer pixels are discarded as noise.
    pub min_blob_area: u32,

    /// Minimum vertical overlap (fraction of the shorter height) to join a line.
    pub line_overlap: f32,

    /// Horizontal gap, in median symbol heights, that starts a new word.
    pub word_gap: f32,

    /// Vertical gap, in median line heights, that starts a new paragraph.
    pub paragraph_gap: f32,

    /// Vertical gap, in median line heights, that starts a new block.
    pub block_gap: f32,

    /// Input height of the recognition model (8 - 256).
    pub recognition_height: u32,

    /// Images with a side longer than this are rejected.
    pub max_image_dimension: u32,

    /// Reproduce wide gaps between words as multiple spaces in plain text.
    pub preserve_interword_spaces: bool,
}

impl Default for BackendVariables {
    fn default() -> Self {
        Self {
            threshold_window: 31,
            threshold_offset: 10,
            min_blob_area: 4,
            line_overlap: 0.5,
            word_gap: 0.5,
            paragraph_gap: 1.0,
            block_gap: 2.5,
            recognition_height: 48,
            max_image_dimension: 32767,
            preserve_interword_spaces: false,
        }
    }
}

impl BackendVariables {
    /// Names of every known variable.
    pub const NAMES: [&'static str; 10] = [
        "threshold_window",
        "threshold_offset",
        "min_blob_area",
        "line_overlap",
        "word_gap",
        "paragraph_gap",
        "block_gap",
        "recognition_height",
        "max_image_dimension",
        "preserve_interword_spaces",
    ];

    /// Current value of a variable, `None` if the name is unknown.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            "threshold_window" => self.threshold_window.to_string(),
            "threshold_offset" => self.threshold_offset.to_string(),
            "min_blob_area" => self.min_blob_area.to_string(),
            "line_overlap" => self.line_overlap.to_string(),
            "word_gap" => self.word_gap.to_string(),
            "paragraph_gap" => self.paragraph_gap.to_string(),
            "block_gap" => self.block_gap.to_string(),
            "recognition_height" => self.recognition_height.to_string(),
            "max_image_dimension" => self.max_image_dimension.to_string(),
            "preserve_interword_spaces" => {
                String::from(if self.preserve_interword_spaces { "1" } else { "0" })
            }
            _ => return None,
        };
        Some(value)
    }

    /// Set a variable from its string form.
    ///
    /// Nothing changes when the name is unknown or the value is rejected.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), OcrError> {
        let value = value.trim();
        match name {
            "threshold_window" => {
                let window: u32 = parse(name, value)?;
                if window < 3 || window % 2 == 0 {
                    return Err(invalid(name, value, "must be an odd number >= 3"));
                }
                self.threshold_window = window;
            }
            "threshold_offset" => self.threshold_offset = parse(name, value)?,
            "min_blob_area" => self.min_blob_area = parse(name, value)?,
            "line_overlap" => {
                let overlap: f32 = parse(name, value)?;
                if !(overlap > 0.0 && overlap <= 1.0) {
                    return Err(invalid(name, value, "must be in (0, 1]"));
                }
                self.line_overlap = overlap;
            }
            "word_gap" => self.word_gap = parse_positive(name, value)?,
            "paragraph_gap" => self.paragraph_gap = parse_positive(name, value)?,
            "block_gap" => self.block_gap = parse_positive(name, value)?,
            "recognition_height" => {
                let height: u32 = parse(name, value)?;
                if !(MIN_RECOGNITION_HEIGHT..=MAX_RECOGNITION_HEIGHT).contains(&height) {
                    return Err(invalid(name, value, "must be between 8 and 256"));
                }
                self.recognition_height = height;
            }
            "max_image_dimension" => {
                let max: u32 = parse(name, value)?;
                if max == 0 {
                    return Err(invalid(name, value, "must be positive"));
                }
                self.max_image_dimension = max;
            }
            "preserve_interword_spaces" => {
                self.preserve_interword_spaces = match value.to_ascii_lowercase().as_str() {
                    "1" | "true" | "t" | "yes" | "on" => true,
                    "0" | "false" | "f" | "no" | "off" => false,
                    _ => return Err(invalid(name, value, "expected a boolean")),
                }
            }
            _ => {
                return Err(OcrError::Config(format!("unknown variable: {}", name)));
            }
        }
        Ok(())
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, OcrError> {
    value
        .parse()
        .map_err(|_| invalid(name, value, "could not be parsed"))
}

fn parse_positive(name: &str, value: &str) -> Result<f32, OcrError> {
    let parsed: f32 = parse(name, value)?;
    if !(parsed.is_finite() && parsed > 0.0) {
        return Err(invalid(name, value, "must be a positive number"));
    }
    Ok(parsed)
}

fn invalid(name: &str, value: &str, reason: &str) -> OcrError {
    OcrError::Config(format!(
        "Failed to set value for variable {}: {:?} {}",
        name, value, reason
    ))
}
