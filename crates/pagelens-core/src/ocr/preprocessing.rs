//! Image preprocessing for layout analysis and recognition.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use ndarray::Array4;
use tracing::debug;

use super::Rect;

/// Foreground value in a binarized image.
pub const INK: u8 = 255;

/// Image preprocessor for the OCR pipeline.
pub struct ImagePreprocessor {
    /// Target height for the recognition model.
    rec_target_height: u32,
    /// Padded width for the recognition model.
    rec_target_width: u32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            rec_target_height: 48,
            rec_target_width: 320,
        }
    }

    /// Set the recognition input height. The padded width scales with it.
    pub fn with_rec_height(mut self, height: u32) -> Self {
        let height = height.max(1);
        let width = u64::from(height) * 20 / 3;
        self.rec_target_height = height;
        self.rec_target_width = u32::try_from(width).unwrap_or(u32::MAX);
        self
    }

    /// NCHW shape of the tensors produced by `preprocess_for_recognition`.
    pub fn recognition_shape(&self) -> [usize; 4] {
        [
            1,
            3,
            self.rec_target_height as usize,
            self.rec_target_width as usize,
        ]
    }

    /// Preprocess a cropped word for recognition.
    ///
    /// The crop is scaled to the target height keeping its aspect ratio,
    /// clamped to the target width and right-padded, then normalized to
    /// [-1, 1] and replicated over three channels.
    pub fn preprocess_for_recognition(&self, crop: &GrayImage) -> Array4<f32> {
        let (width, height) = crop.dimensions();

        let aspect_ratio = width as f32 / height.max(1) as f32;
        let target_width = (self.rec_target_height as f32 * aspect_ratio).ceil() as u32;
        let target_width = target_width.clamp(1, self.rec_target_width);

        let resized = imageops::resize(crop, target_width, self.rec_target_height, FilterType::Triangle);

        let mut tensor = Array4::<f32>::zeros((
            1,
            3,
            self.rec_target_height as usize,
            self.rec_target_width as usize,
        ));

        for (x, y, pixel) in resized.enumerate_pixels() {
            let value = (pixel[0] as f32 / 255.0 - 0.5) / 0.5;
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }

        tensor
    }

    /// Crop a region with `padding` pixels of context, clipped to the image.
    pub fn crop(&self, image: &GrayImage, rect: &Rect, padding: i32) -> GrayImage {
        let (img_w, img_h) = image.dimensions();

        let (img_w, img_h) = (img_w as i32, img_h as i32);

        let left = (rect.left - padding).clamp(0, img_w - 1);
        let top = (rect.top - padding).clamp(0, img_h - 1);
        let right = (rect.right + padding).clamp(left + 1, img_w);
        let bottom = (rect.bottom + padding).clamp(top + 1, img_h);

        imageops::crop_imm(
            image,
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
        .to_image()
    }

    /// Binarize with a local mean threshold.
    ///
    /// A pixel is ink when it is darker than the mean of the
    /// `window x window` neighbourhood by more than `offset`. Output pixels
    /// are `INK` for foreground and 0 for background.
    pub fn binarize(&self, image: &GrayImage, window: u32, offset: i32) -> GrayImage {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;

        // Summed-area table with a zero top row and left column.
        let mut integral = vec![0u64; stride * (height as usize + 1)];
        for y in 0..height as usize {
            let mut row_sum = 0u64;
            for x in 0..width as usize {
                row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
                integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
            }
        }

        let half = window / 2;
        let binary = GrayImage::from_fn(width, height, |x, y| {
            let x0 = x.saturating_sub(half) as usize;
            let y0 = y.saturating_sub(half) as usize;
            let x1 = (x + half + 1).min(width) as usize;
            let y1 = (y + half + 1).min(height) as usize;

            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let count = ((x1 - x0) * (y1 - y0)) as u64;
            let mean = (sum / count) as i32;

            let pixel = image.get_pixel(x, y)[0] as i32;
            if pixel < mean - offset {
                Luma([INK])
            } else {
                Luma([0])
            }
        });

        debug!("Binarized {}x{} image (window {}, offset {})", width, height, window, offset);
        binary
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
