//! OCR pipeline.
//!
//! A frame is preprocessed according to an [`OcrMode`] profile and handed to
//! a [`TextRecognizer`] backend. Backend failures never reach the caller: a
//! failed attempt yields an empty candidate and is logged.

mod paddle;
mod tesseract;

use std::path::PathBuf;

use image::GrayImage;

pub use paddle::{Paddle, PaddleModels};
pub use tesseract::Tesseract;

use crate::{CaptureFrame, OcrError, Preprocess, text};

/// Engine hints for one attempt. Tesseract reads both; the in-process engine
/// does its own layout analysis and ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    /// Page segmentation mode.
    pub psm: u8,
    /// Engine mode; 1 is the LSTM recognizer.
    pub oem: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    pub preprocess: Preprocess,
    pub engine: EngineParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrMode {
    Fast,
    Balanced,
    Accurate,
}

static PROFILES: [ModeProfile; 3] = [
    // Fast: single text line.
    ModeProfile {
        preprocess: Preprocess::Minimal,
        engine: EngineParams { psm: 7, oem: 1 },
    },
    // Balanced: sparse text anywhere in the crop.
    ModeProfile {
        preprocess: Preprocess::Equalized,
        engine: EngineParams { psm: 11, oem: 1 },
    },
    // Accurate: uniform block.
    ModeProfile {
        preprocess: Preprocess::Enhanced,
        engine: EngineParams { psm: 6, oem: 1 },
    },
];

impl OcrMode {
    /// Escalation order, cheapest first.
    pub const ALL: [OcrMode; 3] = [Self::Fast, Self::Balanced, Self::Accurate];

    pub fn profile(self) -> &'static ModeProfile {
        &PROFILES[self as usize]
    }
}

/// What one OCR attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrCandidate {
    pub raw_text: String,
    pub mode: OcrMode,
    pub preprocess: Preprocess,
}

impl OcrCandidate {
    fn empty(mode: OcrMode) -> Self {
        Self {
            raw_text: String::new(),
            mode,
            preprocess: mode.profile().preprocess,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_text.is_empty()
    }

    pub fn meaningful_chars(&self) -> usize {
        text::meaningful_chars(&self.raw_text)
    }
}

/// An OCR backend.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Checks that the engine can run at all. Called once at startup.
    fn probe(&self) -> Result<(), OcrError>;

    fn recognize(&self, image: &GrayImage, params: &EngineParams) -> Result<String, OcrError>;
}

pub struct OcrPipeline {
    engine: Box<dyn TextRecognizer>,
    min_usable_chars: usize,
    debug_dir: Option<PathBuf>,
}

impl OcrPipeline {
    /// Wraps `engine` after checking it is usable.
    pub fn new(engine: Box<dyn TextRecognizer>) -> Result<Self, OcrError> {
        engine.probe()?;
        tracing::info!(engine = engine.name(), "OCR engine ready");
        Ok(Self {
            engine,
            min_usable_chars: 2,
            debug_dir: None,
        })
    }

    /// Text with fewer meaningful chars than this makes escalation continue.
    pub fn with_min_usable_chars(mut self, chars: usize) -> Self {
        self.min_usable_chars = chars;
        self
    }

    /// Writes every preprocessed image into `dir` for inspection.
    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn recognize(&self, frame: &CaptureFrame, mode: OcrMode) -> OcrCandidate {
        if frame.is_empty() {
            return OcrCandidate::empty(mode);
        }

        let profile = mode.profile();
        let image = profile.preprocess.apply(frame);
        self.dump(&image, frame, mode);

        let raw_text = match self.engine.recognize(&image, &profile.engine) {
            Ok(raw) => text::tidy(&raw),
            Err(err) => {
                tracing::debug!(error = %err, ?mode, region = %frame.region, "OCR attempt failed");
                String::new()
            }
        };

        OcrCandidate {
            raw_text,
            mode,
            preprocess: profile.preprocess,
        }
    }

    /// Tries the modes cheapest first and stops at the first usable text.
    /// If none is usable, returns the attempt with the most meaningful chars.
    pub fn recognize_escalating(&self, frame: &CaptureFrame) -> OcrCandidate {
        let mut best = OcrCandidate::empty(OcrMode::Fast);
        for mode in OcrMode::ALL {
            let candidate = self.recognize(frame, mode);
            if candidate.meaningful_chars() >= self.min_usable_chars {
                return candidate;
            }
            tracing::trace!(?mode, text = %candidate.raw_text, "escalating");
            if candidate.meaningful_chars() > best.meaningful_chars() {
                best = candidate;
            }
        }
        best
    }

    /// Runs `modes` concurrently and keeps the longest non-empty result.
    /// Ties go to the mode listed first.
    pub fn race(&self, frame: &CaptureFrame, modes: &[OcrMode]) -> OcrCandidate {
        let results = std::thread::scope(|s| {
            let handles = modes
                .iter()
                .map(|&mode| (mode, s.spawn(move || self.recognize(frame, mode))))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|(mode, handle)| handle.join().unwrap_or_else(|_| OcrCandidate::empty(mode)))
                .collect::<Vec<_>>()
        });

        let mut best: Option<OcrCandidate> = None;
        for candidate in results {
            if candidate.is_empty() {
                continue;
            }
            let longer = best
                .as_ref()
                .is_none_or(|b| candidate.raw_text.chars().count() > b.raw_text.chars().count());
            if longer {
                best = Some(candidate);
            }
        }
        best.unwrap_or_else(|| OcrCandidate::empty(modes.first().copied().unwrap_or(OcrMode::Fast)))
    }

    fn dump(&self, image: &GrayImage, frame: &CaptureFrame, mode: OcrMode) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let path = dir.join(format!("{}_{:?}_{stamp}.png", frame.region, mode).to_lowercase());
        let written = std::fs::create_dir_all(dir)
            .map_err(OcrError::from)
            .and_then(|()| image.save(&path).map_err(OcrError::from));
        if let Err(err) = written {
            tracing::warn!(error = %err, path = %path.display(), "failed to write OCR debug image");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::RegionId;

    type Reply = (u8, Result<&'static str, &'static str>);

    /// Replies from a fixed table keyed by page segmentation mode, and records calls.
    struct Scripted {
        replies: Vec<Reply>,
        calls: Arc<Mutex<Vec<u8>>>,
    }

    impl TextRecognizer for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn probe(&self) -> Result<(), OcrError> {
            Ok(())
        }

        fn recognize(&self, _image: &GrayImage, params: &EngineParams) -> Result<String, OcrError> {
            self.calls.lock().unwrap().push(params.psm);
            match self.replies.iter().find(|(psm, _)| *psm == params.psm) {
                Some((_, Ok(text))) => Ok(text.to_string()),
                Some((_, Err(msg))) => Err(OcrError::Engine(msg.to_string())),
                None => Ok(String::new()),
            }
        }
    }

    struct Broken;

    impl TextRecognizer for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn probe(&self) -> Result<(), OcrError> {
            Err(OcrError::EngineUnavailable("no models".into()))
        }

        fn recognize(&self, _image: &GrayImage, _params: &EngineParams) -> Result<String, OcrError> {
            unreachable!()
        }
    }

    fn frame() -> CaptureFrame {
        CaptureFrame::new(RgbaImage::from_pixel(40, 12, Rgba([20, 20, 20, 255])), RegionId::MonsterName)
    }

    fn scripted(replies: Vec<Reply>) -> (OcrPipeline, Arc<Mutex<Vec<u8>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let engine = Scripted {
            replies,
            calls: calls.clone(),
        };
        (OcrPipeline::new(Box::new(engine)).unwrap(), calls)
    }

    #[test]
    fn modes_map_to_fixed_profiles() {
        assert_eq!(OcrMode::Fast.profile().engine.psm, 7);
        assert_eq!(OcrMode::Balanced.profile().preprocess, Preprocess::Equalized);
        assert_eq!(OcrMode::Accurate.profile().preprocess, Preprocess::Enhanced);
        assert_eq!(OcrMode::Accurate.profile().engine.psm, 6);
    }

    #[test]
    fn unavailable_engine_fails_at_construction() {
        assert!(matches!(OcrPipeline::new(Box::new(Broken)), Err(OcrError::EngineUnavailable(_))));
    }

    #[test]
    fn engine_errors_become_empty_text() {
        let (pipeline, _) = scripted(vec![(7, Err("crashed"))]);
        let candidate = pipeline.recognize(&frame(), OcrMode::Fast);
        assert!(candidate.is_empty());
        assert_eq!(candidate.mode, OcrMode::Fast);
    }

    #[test]
    fn escalation_stops_at_first_usable_text() {
        let (pipeline, calls) = scripted(vec![(7, Ok("|")), (11, Ok("舞火大师\n7")), (6, Ok("unused"))]);
        let candidate = pipeline.recognize_escalating(&frame());
        assert_eq!(candidate.raw_text, "舞火大师");
        assert_eq!(candidate.mode, OcrMode::Balanced);
        assert_eq!(*calls.lock().unwrap(), [7, 11]);
    }

    #[test]
    fn escalation_keeps_best_when_nothing_is_usable() {
        let (pipeline, calls) = scripted(vec![(7, Ok("")), (11, Err("timeout")), (6, Ok("火 ~"))]);
        let candidate = pipeline.recognize_escalating(&frame());
        assert_eq!(candidate.raw_text, "火 ~");
        assert_eq!(candidate.mode, OcrMode::Accurate);
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn race_keeps_longest_text() {
        let (pipeline, _) = scripted(vec![(7, Ok("火灵")), (11, Ok("舞火大师")), (6, Err("bad"))]);
        let candidate = pipeline.race(&frame(), &OcrMode::ALL);
        assert_eq!(candidate.raw_text, "舞火大师");
        assert_eq!(candidate.mode, OcrMode::Balanced);

        let (pipeline, _) = scripted(vec![]);
        assert!(pipeline.race(&frame(), &OcrMode::ALL).is_empty());
    }

    #[test]
    fn empty_frame_skips_the_engine() {
        let (pipeline, calls) = scripted(vec![(7, Ok("x"))]);
        let empty = CaptureFrame::new(RgbaImage::new(0, 0), RegionId::ItemName);
        assert!(pipeline.recognize_escalating(&empty).is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }
}
