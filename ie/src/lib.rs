//! Image engine: captured frames, preprocessing and OCR.

mod error;
mod frame;
mod image;
pub mod ocr;
mod preprocess;
pub mod text;

pub use error::OcrError;
pub use frame::{CaptureFrame, RegionId};
pub use crate::image::{clahe, ensure_dark_text_on_light, pad, upscale_to_height};
pub use ocr::{OcrCandidate, OcrMode, OcrPipeline, TextRecognizer};
pub use preprocess::Preprocess;
