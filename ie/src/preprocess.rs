//! Preprocessing steps applied to a frame before it reaches the OCR engine.

use image::GrayImage;
use imageproc::contrast::{ThresholdType, equalize_histogram, otsu_level, threshold};

use crate::image::{clahe, ensure_dark_text_on_light, pad, upscale_to_height};

const CLAHE_GRID: u32 = 8;
const CLAHE_CLIP: f32 = 2.0;
const MIN_HEIGHT: u32 = 80;
const BORDER: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocess {
    /// Grayscale only.
    Minimal,
    /// Grayscale plus global histogram equalization.
    Equalized,
    /// Median denoise, CLAHE, Otsu binarization, upscale and a white border.
    Enhanced,
}

impl Preprocess {
    pub fn apply(self, frame: &crate::CaptureFrame) -> GrayImage {
        let gray = frame.to_gray();
        match self {
            Self::Minimal => gray,
            Self::Equalized => equalize_histogram(&gray),
            Self::Enhanced => enhance(&gray),
        }
    }
}

fn enhance(gray: &GrayImage) -> GrayImage {
    let denoised = imageproc::filter::median_filter(gray, 1, 1);
    let contrasted = clahe(&denoised, CLAHE_GRID, CLAHE_CLIP);
    let level = otsu_level(&contrasted);
    let bin = ensure_dark_text_on_light(threshold(&contrasted, level, ThresholdType::Binary));
    pad(&upscale_to_height(&bin, MIN_HEIGHT), BORDER)
}
