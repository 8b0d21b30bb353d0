//! In-process OCR through `ocr-rs` (Rust PaddleOCR bindings).

use std::{
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use image::GrayImage;

use super::{EngineParams, TextRecognizer};
use crate::OcrError;

/// Model files for the detection and recognition networks.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PaddleModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
    pub charset: PathBuf,
}

impl PaddleModels {
    /// The conventional layout inside an `ocr/` directory: one shared
    /// detection model plus a recognition model and charset per language.
    pub fn in_dir(dir: impl Into<PathBuf>, lang_code: &str) -> Self {
        let dir = dir.into();
        Self {
            detection: dir.join("detection.mnn"),
            recognition: dir.join(format!("{lang_code}_recognition.mnn")),
            charset: dir.join(format!("{lang_code}_charset.txt")),
        }
    }

    pub fn exist(&self) -> bool {
        self.detection.is_file() && self.recognition.is_file() && self.charset.is_file()
    }
}

pub struct Paddle {
    engine: Mutex<ocr_rs::OcrEngine>,
}

impl Paddle {
    pub fn try_new(models: &PaddleModels) -> Result<Self, OcrError> {
        for path in [&models.detection, &models.recognition, &models.charset] {
            if !path.is_file() {
                return Err(OcrError::EngineUnavailable(format!("model file {} not found", path.display())));
            }
        }

        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get() as i32)
            .unwrap_or(1);

        let engine = ocr_rs::OcrEngine::new(
            &models.detection,
            &models.recognition,
            &models.charset,
            Some(ocr_rs::OcrEngineConfig {
                backend: ocr_rs::Backend::CPU,
                thread_count,
                // Name plates use small stylized glyphs; High is worth the CPU cost.
                precision_mode: ocr_rs::PrecisionMode::High,
                enable_parallel: thread_count > 1,
                min_result_confidence: 0.5,
                ..Default::default()
            }),
        )
        .map_err(|err| OcrError::EngineUnavailable(err.to_string()))?;

        Ok(Self {
            engine: Mutex::new(engine),
        })
    }
}

impl TextRecognizer for Paddle {
    fn name(&self) -> &'static str {
        "paddle"
    }

    fn probe(&self) -> Result<(), OcrError> {
        // Models were loaded in `try_new`.
        Ok(())
    }

    fn recognize(&self, image: &GrayImage, _params: &EngineParams) -> Result<String, OcrError> {
        let rgb = image::DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let (width, height) = rgb.dimensions();
        let input = ocr_rs::preprocess::rgb_to_image(&rgb.into_raw(), width, height);

        let engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        let results = engine
            .recognize(&input)
            .map_err(|err| OcrError::Engine(err.to_string()))?;

        Ok(results
            .into_iter()
            .map(|v| v.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_models_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = Paddle::try_new(&PaddleModels::in_dir(dir.path(), "chinese")).err();
        assert!(matches!(err, Some(OcrError::EngineUnavailable(_))));
    }
}
