//! Page orientation heuristic.
//!
//! Latin text carries more ink above its x-height band (ascenders and
//! capitals) than below it (descenders). Measuring that imbalance on the
//! page and on the page turned by 90 degrees tells which way is up.

use image::GrayImage;
use image::imageops;
use tracing::debug;

use crate::error::OcrError;

use super::Orientation;
use super::preprocessing::INK;

/// Raw detector output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationScores {
    /// Positive when the text is upright, negative when upside down.
    pub up: f32,
    /// Same measure after a clockwise quarter turn. Negative means the
    /// content is turned 90 degrees clockwise.
    pub left: f32,
}

impl Orientation {
    /// Apply the decision rule to raw scores.
    ///
    /// A clear up/down signal wins; otherwise the page is assumed to lie
    /// on its side.
    pub fn from_scores(scores: OrientationScores) -> Self {
        let rotation = if scores.up.abs() - scores.left.abs() > 5.0 {
            if scores.up > 0.0 { 0 } else { 180 }
        } else if scores.left < 0.0 {
            90
        } else {
            270
        };

        Self {
            rotation,
            confidence: 1.0,
        }
    }
}

/// Ascender/descender orientation detector over a binarized page.
pub struct OrientationDetector {
    min_count: u64,
}

impl OrientationDetector {
    pub fn new() -> Self {
        Self { min_count: 10 }
    }

    /// Score a binarized page (foreground pixels are `INK`).
    pub fn detect(&self, binary: &GrayImage) -> Result<OrientationScores, OcrError> {
        let (up, up_count) = up_score(binary);
        let (left, left_count) = up_score(&imageops::rotate90(binary));

        debug!(
            "Orientation scores: up {:.2} ({} px), left {:.2} ({} px)",
            up, up_count, left, left_count
        );

        if up_count + left_count < self.min_count {
            return Err(OcrError::Recognition(
                "not enough text to estimate orientation".to_string(),
            ));
        }

        Ok(OrientationScores { up, left })
    }
}

impl Default for OrientationDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed ascender-over-descender score and the ink it was based on.
fn up_score(binary: &GrayImage) -> (f32, u64) {
    let (width, height) = binary.dimensions();
    let profile: Vec<u64> = (0..height)
        .map(|y| (0..width).filter(|&x| binary.get_pixel(x, y)[0] == INK).count() as u64)
        .collect();

    let (mut above, mut below) = (0u64, 0u64);
    let mut y = 0;
    while y < profile.len() {
        if profile[y] == 0 {
            y += 1;
            continue;
        }

        // One text line: a run of rows with ink.
        let start = y;
        while y < profile.len() && profile[y] > 0 {
            y += 1;
        }
        let band = &profile[start..y];

        let peak = band.iter().copied().max().unwrap_or(0);
        let core = |count: &u64| *count * 2 >= peak;
        let (Some(first), Some(last)) = (band.iter().position(core), band.iter().rposition(core))
        else {
            continue;
        };

        above += band[..first].iter().sum::<u64>();
        below += band[last + 1..].iter().sum::<u64>();
    }

    let total = above + below;
    if total == 0 {
        return (0.0, 0);
    }

    let score = 2.0 * (above as f32 - below as f32) / (total as f32).sqrt();
    (score, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use pretty_assertions::assert_eq;

    /// One line of 2px glyphs; every third glyph has an ascender.
    fn upright_line() -> GrayImage {
        let mut image = GrayImage::new(60, 40);
        for (i, x) in (5..55).step_by(4).enumerate() {
            let top = if i % 3 == 0 { 8 } else { 15 };
            for y in top..25 {
                for dx in 0..2 {
                    image.put_pixel(x + dx, y, Luma([INK]));
                }
            }
        }
        image
    }

    fn rotation(up: f32, left: f32) -> u16 {
        Orientation::from_scores(OrientationScores { up, left }).rotation
    }

    #[test]
    fn test_decision_table() {
        assert_eq!(rotation(10.0, 0.0), 0);
        assert_eq!(rotation(-10.0, 0.0), 180);
        assert_eq!(rotation(0.0, -10.0), 90);
        assert_eq!(rotation(0.0, 10.0), 270);
        // Weak up/down signal falls through to the sideways branch.
        assert_eq!(rotation(1.0, 1.0), 270);
        assert_eq!(Orientation::from_scores(OrientationScores { up: 9.0, left: 0.0 }).confidence, 1.0);
    }

    #[test]
    fn test_upright_text() {
        let scores = OrientationDetector::new().detect(&upright_line()).unwrap();
        assert!(scores.up > 5.0, "up = {}", scores.up);
        assert_eq!(Orientation::from_scores(scores).rotation, 0);
    }

    #[test]
    fn test_inverted_text() {
        let inverted = imageops::rotate180(&upright_line());
        let scores = OrientationDetector::new().detect(&inverted).unwrap();
        assert!(scores.up < -5.0, "up = {}", scores.up);
        assert_eq!(Orientation::from_scores(scores).rotation, 180);
    }

    #[test]
    fn test_text_turned_clockwise() {
        let turned = imageops::rotate90(&upright_line());
        let scores = OrientationDetector::new().detect(&turned).unwrap();
        assert!(scores.left < -5.0, "left = {}", scores.left);
        assert_eq!(Orientation::from_scores(scores).rotation, 90);
    }

    #[test]
    fn test_text_turned_counterclockwise() {
        let turned = imageops::rotate270(&upright_line());
        let scores = OrientationDetector::new().detect(&turned).unwrap();
        assert!(scores.left > 5.0, "left = {}", scores.left);
        assert_eq!(Orientation::from_scores(scores).rotation, 270);
    }

    #[test]
    fn test_blank_page_fails() {
        let err = OrientationDetector::new().detect(&GrayImage::new(20, 20)).unwrap_err();
        assert!(matches!(err, OcrError::Recognition(_)));
    }
}
