//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use data::{EntityKind, MatchPolicy};
use ie::RegionId;
use serde::{Deserialize, Serialize};

use crate::capture::WindowMatch;

/// On-disk configuration for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How the game window is told apart from everything else on screen.
    pub window: WindowMatch,

    /// Poll interval (seconds) between timed recognition cycles.
    /// Zero or negative disables the timer; cycles then run on triggers only.
    pub poll_interval_s: f32,

    /// Repeats of the same result within this window are shown once.
    pub debounce_ms: u64,

    /// Region the loop reads.
    pub region: RegionId,

    /// Restrict matching to one entity kind.
    pub kind: Option<EntityKind>,

    /// Directory with the catalog JSON files.
    pub data_dir: PathBuf,

    /// Capture rectangles (`position.json`).
    pub position_file: PathBuf,

    pub ocr: OcrSettings,

    pub game_log: GameLogSettings,

    pub matching: MatchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowMatch::default(),
            poll_interval_s: 1.0,
            debounce_ms: 1500,
            region: RegionId::MonsterName,
            kind: None,
            data_dir: PathBuf::from("data"),
            position_file: PathBuf::from("data/position.json"),
            ocr: OcrSettings::default(),
            game_log: GameLogSettings::default(),
            matching: MatchPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    #[default]
    Tesseract,
    Paddle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub backend: OcrBackend,

    /// Tesseract executable. Searched for in the usual install locations when unset.
    pub tesseract_path: Option<PathBuf>,
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,

    /// Folder holding the Paddle models. Discovered next to the binary when unset.
    pub paddle_models_dir: Option<PathBuf>,
    pub paddle_language: String,

    /// Minimum meaningful characters before escalation stops.
    pub min_usable_chars: usize,

    /// Preprocessed images are written here when set.
    pub debug_dir: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            tesseract_path: None,
            tessdata_dir: None,
            language: "chi_sim".to_string(),
            paddle_models_dir: None,
            paddle_language: "chinese".to_string(),
            min_usable_chars: 2,
            debug_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameLogSettings {
    pub enabled: bool,

    /// `Player.log` location. Defaults to the game's LocalLow folder.
    pub path: Option<PathBuf>,

    /// Regexes; a matching log line starts a recognition cycle.
    pub markers: Vec<String>,
}

impl Default for GameLogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            markers: vec!["Card Purchased:".to_string()],
        }
    }
}

impl GameLogSettings {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(crate::logmon::default_log_path)
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("bazaar-lens.json"))
    }

    /// Load configuration from disk, falling back to defaults on missing file.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk.
    pub fn try_load() -> Result<Self> {
        Self::try_load_from(&Self::path()?)
    }

    /// Like [`Config::try_load`], for an explicit file. A missing file yields defaults.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_s > 0.0).then(|| Duration::from_secs_f32(self.poll_interval_s))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::try_load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bazaar-lens.json");

        let mut cfg = Config::default();
        cfg.region = RegionId::ItemName;
        cfg.kind = Some(EntityKind::Item);
        cfg.ocr.backend = OcrBackend::Paddle;
        cfg.matching.english_threshold = 0.75;
        cfg.save_to(&path).unwrap();

        assert_eq!(Config::try_load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{ "debounce_ms": 200, "ocr": { "language": "eng" } }"#).unwrap();

        let cfg = Config::try_load_from(&path).unwrap();
        assert_eq!(cfg.debounce(), Duration::from_millis(200));
        assert_eq!(cfg.ocr.language, "eng");
        assert_eq!(cfg.ocr.backend, OcrBackend::Tesseract);
        assert_eq!(cfg.poll_interval(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::try_load_from(&path).is_err());
    }

    #[test]
    fn zero_interval_disables_the_timer() {
        let cfg = Config {
            poll_interval_s: 0.0,
            ..Config::default()
        };
        assert_eq!(cfg.poll_interval(), None);
    }
}
