use std::path::{Path, PathBuf};

use ie::{CaptureFrame, RegionId};
use serde::{Deserialize, Serialize};

use crate::position::{PositionConfig, Rect};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
	/// No game window to capture right now (closed, minimized, not started).
	#[error("game window unavailable: {0}")]
	Unavailable(String),
	#[error("region {region} {rect:?} lies outside the {width}x{height} capture")]
	Region {
		region: RegionId,
		rect: Rect,
		width: u32,
		height: u32,
	},
	#[error("capture backend failed: {0}")]
	Backend(String),
}

/// Where frames come from. The recognition loop only sees this trait.
pub trait FrameSource: Send {
	fn capture(&self, region: RegionId) -> Result<CaptureFrame, CaptureError>;
}

/// How to recognize the game window among all top-level windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowMatch {
	/// Lowercase substrings of the title or app name that identify the game.
	pub keywords: Vec<String>,
	/// Lowercase substrings that rule a window out (editors, recorders, ourselves).
	pub exclude: Vec<String>,
	/// Windows smaller than this are only used when nothing larger matches.
	pub min_width: u32,
	pub min_height: u32,
}

impl Default for WindowMatch {
	fn default() -> Self {
		Self {
			keywords: vec!["the bazaar".into(), "thebazaar".into(), "unitywndclass".into()],
			exclude: [".py", "cursor", "editor", "visual studio code", "vscode", "pycharm", "obs", "bazaar-lens", "bazaarhelper"]
				.into_iter()
				.map(String::from)
				.collect(),
			min_width: 800,
			min_height: 600,
		}
	}
}

impl WindowMatch {
	pub fn matches(&self, title: &str, app_name: &str) -> bool {
		let title = title.to_lowercase();
		let app_name = app_name.to_lowercase();
		let hit = |needle: &String| title.contains(needle.as_str()) || app_name.contains(needle.as_str());
		self.keywords.iter().any(hit) && !self.exclude.iter().any(hit)
	}
}

/// Crop `rect` out of a full-window image.
pub fn crop_region(image: &image::RgbaImage, region: RegionId, rect: Rect) -> Result<CaptureFrame, CaptureError> {
	let (width, height) = image.dimensions();
	let (x, y, w, h) = rect.clamp_to(width, height).ok_or(CaptureError::Region {
		region,
		rect,
		width,
		height,
	})?;
	let cropped = image::imageops::crop_imm(image, x, y, w, h).to_image();
	Ok(CaptureFrame::new(cropped, region))
}

/// Captures regions of the live game window through `xcap`.
pub struct WindowCapture {
	window: WindowMatch,
	positions: PositionConfig,
}

impl WindowCapture {
	pub fn new(window: WindowMatch, positions: PositionConfig) -> Self {
		Self { window, positions }
	}

	fn find_window(&self) -> Result<xcap::Window, CaptureError> {
		let windows = xcap::Window::all().map_err(|err| CaptureError::Backend(err.to_string()))?;

		let mut minimized = false;
		let mut candidates = windows
			.into_iter()
			.filter(|w| {
				let title = w.title().unwrap_or_default();
				let app_name = w.app_name().unwrap_or_default();
				self.window.matches(&title, &app_name)
			})
			.filter(|w| {
				let is_minimized = w.is_minimized().unwrap_or(false);
				minimized |= is_minimized;
				!is_minimized
			})
			.filter_map(|w| {
				let size = (w.width().ok()?, w.height().ok()?);
				Some((w, size))
			})
			.collect::<Vec<_>>();

		// Full-size windows first, then by area.
		candidates.sort_by_key(|(_, (w, h))| {
			let full = *w >= self.window.min_width && *h >= self.window.min_height;
			std::cmp::Reverse((full, *w as u64 * *h as u64))
		});

		match candidates.into_iter().next() {
			Some((window, (w, h))) => {
				tracing::trace!(title = %window.title().unwrap_or_default(), width = w, height = h, "game window");
				Ok(window)
			}
			None if minimized => Err(CaptureError::Unavailable("window is minimized".into())),
			None => Err(CaptureError::Unavailable("no matching window".into())),
		}
	}
}

impl FrameSource for WindowCapture {
	fn capture(&self, region: RegionId) -> Result<CaptureFrame, CaptureError> {
		let window = self.find_window()?;
		let img = window.capture_image().map_err(|err| CaptureError::Backend(err.to_string()))?;
		let (width, height) = (img.width(), img.height());
		let img = image::RgbaImage::from_raw(width, height, img.into_raw())
			.ok_or_else(|| CaptureError::Backend("capture buffer size mismatch".into()))?;
		crop_region(&img, region, self.positions.capture_rect(region))
	}
}

/// Serves regions of a still screenshot, for offline runs and tuning.
///
/// Without a position file every region is the whole image.
pub struct ImageFileSource {
	path: PathBuf,
	image: image::RgbaImage,
	positions: Option<PositionConfig>,
}

impl ImageFileSource {
	pub fn open(path: &Path, positions: Option<PositionConfig>) -> anyhow::Result<Self> {
		use anyhow::Context;
		let image = image::open(path).with_context(|| format!("open {:?}", path))?.to_rgba8();
		Ok(Self {
			path: path.to_path_buf(),
			image,
			positions,
		})
	}
}

impl FrameSource for ImageFileSource {
	fn capture(&self, region: RegionId) -> Result<CaptureFrame, CaptureError> {
		match &self.positions {
			Some(positions) => crop_region(&self.image, region, positions.capture_rect(region)).inspect_err(|err| {
				tracing::debug!(error = %err, path = %self.path.display(), "region outside screenshot");
			}),
			None => Ok(CaptureFrame::new(self.image.clone(), region)),
		}
	}
}
