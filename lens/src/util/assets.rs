use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use ie::ocr::PaddleModels;

/// Overrides model discovery; may point at the app root or at `ocr/` itself.
pub const ASSETS_DIR_ENV: &str = "BAZAAR_LENS_ASSETS_DIR";

fn normalize_ocr_dir(dir: PathBuf) -> PathBuf {
	if dir.join("detection.mnn").is_file() { dir } else { dir.join("ocr") }
}

fn search_dirs(configured: Option<&Path>) -> Vec<PathBuf> {
	let mut candidates = Vec::new();
	if let Some(dir) = configured {
		candidates.push(dir.to_path_buf());
	}
	if let Some(dir) = std::env::var_os(ASSETS_DIR_ENV) {
		candidates.push(PathBuf::from(dir));
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		candidates.push(dir.to_path_buf());
	}
	if let Ok(cwd) = std::env::current_dir() {
		candidates.push(cwd);
	}
	// Workspace root, for `cargo run` from another directory.
	#[cfg(debug_assertions)]
	candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".."));
	candidates
}

/// Finds the Paddle model files for `lang_code`, trying the configured
/// directory, `BAZAAR_LENS_ASSETS_DIR`, the executable's folder, the working
/// directory, and in debug builds the workspace root.
pub fn resolve_paddle_models(configured: Option<&Path>, lang_code: &str) -> Result<PaddleModels> {
	find_models(search_dirs(configured), lang_code)
}

fn find_models(candidates: Vec<PathBuf>, lang_code: &str) -> Result<PaddleModels> {
	let mut tried = Vec::new();
	for base in candidates {
		let ocr_dir = normalize_ocr_dir(base);
		let models = PaddleModels::in_dir(&ocr_dir, lang_code);
		if models.exist() {
			return Ok(models);
		}
		tried.push(ocr_dir);
	}

	bail!(
		"OCR model files not found. Expected ocr/detection.mnn, ocr/{lang_code}_recognition.mnn and ocr/{lang_code}_charset.txt.\n\nSearched in:\n{}\n\nFix: copy the 'ocr/' folder next to the executable (or set {ASSETS_DIR_ENV} to the folder that contains it).",
		tried
			.into_iter()
			.map(|p| format!("  - {}", p.display()))
			.collect::<Vec<_>>()
			.join("\n")
	)
}
