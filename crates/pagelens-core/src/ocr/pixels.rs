//! Owned 32-bit-per-pixel raster handed to the recognition backend.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};

use crate::error::OcrError;

/// Rectangular raster of packed `0xRRGGBBAA` pixels.
///
/// `pixels.len() == width * height` always holds; the fields are private so
/// the only way to get a buffer is through a validating constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Wrap packed pixels. Extra trailing pixels are dropped.
    pub fn new(width: u32, height: u32, mut pixels: Vec<u32>) -> Result<Self, OcrError> {
        let len = pixel_count(width, height)?;
        if pixels.len() < len {
            return Err(OcrError::InvalidImage(format!(
                "expected {} pixels for {}x{}, got {}",
                len,
                width,
                height,
                pixels.len()
            )));
        }
        pixels.truncate(len);

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from RGBA bytes (4 bytes per pixel, row-major).
    ///
    /// `bytes` must hold at least `width * height * 4` bytes.
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, OcrError> {
        let len = pixel_count(width, height)?;
        let byte_len = len
            .checked_mul(4)
            .ok_or_else(|| OcrError::InvalidImage(format!("{}x{} is too large", width, height)))?;
        if bytes.len() < byte_len {
            return Err(OcrError::InvalidImage(format!(
                "expected {} bytes for {}x{}, got {}",
                byte_len,
                width,
                height,
                bytes.len()
            )));
        }

        let pixels = bytes[..byte_len]
            .chunks_exact(4)
            .map(|px| u32::from_be_bytes([px[0], px[1], px[2], px[3]]))
            .collect();

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from an image decoded by the `image` crate.
    pub fn from_image(image: &DynamicImage) -> Result<Self, OcrError> {
        let (width, height) = image.dimensions();
        let rgba = image.to_rgba8();
        Self::from_rgba_bytes(width, height, rgba.as_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Convert to 8-bit luminance, compositing transparent pixels over white.
    pub fn to_luma(&self) -> GrayImage {
        let width = self.width;
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b, a] = self.pixels[(y * width + x) as usize].to_be_bytes();
            let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
            let alpha = a as u32;
            Luma([((luma * alpha + 255 * (255 - alpha)) / 255) as u8])
        })
    }
}

fn pixel_count(width: u32, height: u32) -> Result<usize, OcrError> {
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidImage(format!(
            "image dimensions must be non-zero, got {}x{}",
            width, height
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| OcrError::InvalidImage(format!("{}x{} is too large", width, height)))
}
