use std::{
    path::{Path, PathBuf},
    process::Command,
};

use image::GrayImage;

use super::{EngineParams, TextRecognizer};
use crate::OcrError;

const COMMON_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

/// External `tesseract` executable, fed through a temporary PNG.
#[derive(Debug, Clone)]
pub struct Tesseract {
    executable: PathBuf,
    tessdata_dir: Option<PathBuf>,
    language: String,
}

impl Tesseract {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            tessdata_dir: None,
            language: "chi_sim".to_owned(),
        }
    }

    /// Picks the configured executable if given, otherwise a portable copy
    /// next to the running binary, a common install location, or `tesseract`
    /// from `PATH`.
    pub fn locate(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            return Self::new(path);
        }

        let exe_name = if cfg!(windows) { "tesseract.exe" } else { "tesseract" };
        let portable = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("Tesseract-OCR").join(exe_name)));

        let found = portable
            .into_iter()
            .chain(COMMON_PATHS.iter().map(PathBuf::from))
            .find(|path| path.is_file());

        match found {
            Some(path) => {
                tracing::debug!(path = %path.display(), "found tesseract");
                Self::new(path)
            }
            None => Self::new("tesseract"),
        }
    }

    pub fn with_tessdata_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tessdata_dir = dir;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn command(&self) -> Command {
        #[allow(unused_mut)]
        let mut cmd = Command::new(&self.executable);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }
        cmd
    }
}

impl TextRecognizer for Tesseract {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn probe(&self) -> Result<(), OcrError> {
        let output = self.command().arg("--version").output().map_err(|err| {
            OcrError::EngineUnavailable(format!("cannot run {}: {err}", self.executable.display()))
        })?;
        if !output.status.success() {
            return Err(OcrError::EngineUnavailable(format!(
                "{} --version exited with {}",
                self.executable.display(),
                output.status
            )));
        }

        if let Some(dir) = &self.tessdata_dir {
            let traineddata = dir.join(format!("{}.traineddata", self.language));
            if !traineddata.is_file() {
                return Err(OcrError::EngineUnavailable(format!(
                    "language data {} not found",
                    traineddata.display()
                )));
            }
        }
        Ok(())
    }

    fn recognize(&self, image: &GrayImage, params: &EngineParams) -> Result<String, OcrError> {
        let input = tempfile::Builder::new().prefix("lens-ocr-").suffix(".png").tempfile()?;
        image.save_with_format(input.path(), image::ImageFormat::Png)?;

        let mut cmd = self.command();
        cmd.arg(input.path()).arg("stdout");
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        let output = cmd
            .arg("-l")
            .arg(&self.language)
            .arg("--oem")
            .arg(params.oem.to_string())
            .arg("--psm")
            .arg(params.psm.to_string())
            .arg("-c")
            .arg("preserve_interword_spaces=1")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(stderr.trim().to_owned()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
