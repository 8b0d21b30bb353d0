#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// The engine can't run at all (missing executable, models, language data).
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("OCR engine failed: {0}")]
    Engine(String),
    #[error("OCR I/O error")]
    Io(#[from] std::io::Error),
    #[error("OCR image encoding failed")]
    Image(#[from] image::ImageError),
}
