//! Capture rectangles, loaded once from `position.json`.
//!
//! Coordinates are window-relative pixels. Each region is given by its four
//! corners; the capture rectangle is their bounding box.

use std::path::Path;

use anyhow::{Context, Result};
use ie::RegionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
	pub x: i32,
	pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad {
	pub top_left: Point,
	pub top_right: Point,
	pub bottom_left: Point,
	pub bottom_right: Point,
}

impl Quad {
	fn corners(&self) -> [Point; 4] {
		[self.top_left, self.top_right, self.bottom_left, self.bottom_right]
	}

	pub fn bounds(&self) -> Rect {
		let corners = self.corners();
		let min_x = corners.iter().map(|p| p.x).min().unwrap_or(0);
		let max_x = corners.iter().map(|p| p.x).max().unwrap_or(0);
		let min_y = corners.iter().map(|p| p.y).min().unwrap_or(0);
		let max_y = corners.iter().map(|p| p.y).max().unwrap_or(0);
		Rect::from_corners(min_x, min_y, max_x, max_y)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
	pub x: i32,
	pub y: i32,
	pub width: u32,
	pub height: u32,
}

impl Rect {
	pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
		Self {
			x: x1.min(x2),
			y: y1.min(y2),
			width: x1.abs_diff(x2),
			height: y1.abs_diff(y2),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}

	/// The part of this rectangle inside a `width` x `height` surface, as
	/// `(x, y, w, h)`, or `None` when they don't overlap.
	pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
		let x1 = (self.x as i64).clamp(0, width as i64);
		let y1 = (self.y as i64).clamp(0, height as i64);
		let x2 = (self.x as i64 + self.width as i64).clamp(0, width as i64);
		let y2 = (self.y as i64 + self.height as i64).clamp(0, height as i64);
		if x2 <= x1 || y2 <= y1 {
			return None;
		}
		Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
	}
}

/// Name position relative to the icon, one delta per corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerOffset {
	pub top_left: (i32, i32),
	pub top_right: (i32, i32),
	pub bottom_left: (i32, i32),
	pub bottom_right: (i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPositions {
	pub icon: Quad,
	pub name: Quad,
}

impl EntityPositions {
	pub fn icon_name_offset(&self) -> CornerOffset {
		let delta = |name: Point, icon: Point| (name.x - icon.x, name.y - icon.y);
		CornerOffset {
			top_left: delta(self.name.top_left, self.icon.top_left),
			top_right: delta(self.name.top_right, self.icon.top_right),
			bottom_left: delta(self.name.bottom_left, self.icon.bottom_left),
			bottom_right: delta(self.name.bottom_right, self.icon.bottom_right),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionConfig {
	pub monster: EntityPositions,
	pub item: EntityPositions,
}

/// Extra margin around a name rectangle derived from an icon elsewhere on screen.
const NAME_PADDING: f32 = 0.2;

impl PositionConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let json = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
		let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
		Ok(cfg)
	}

	fn entity(&self, region: RegionId) -> &EntityPositions {
		match region {
			RegionId::MonsterIcon | RegionId::MonsterName => &self.monster,
			RegionId::ItemIcon | RegionId::ItemName => &self.item,
		}
	}

	pub fn quad(&self, region: RegionId) -> &Quad {
		let entity = self.entity(region);
		if region.is_name() { &entity.name } else { &entity.icon }
	}

	pub fn rect(&self, region: RegionId) -> Rect {
		self.quad(region).bounds()
	}

	/// Rectangle to grab for `region`. Icons are taken as configured; name
	/// plates are placed relative to their icon, with slack for longer names.
	pub fn capture_rect(&self, region: RegionId) -> Rect {
		if region.is_name() {
			self.name_rect_for_icon(region, self.entity(region).icon.bounds())
		} else {
			self.rect(region)
		}
	}

	/// Where the name plate sits for an icon found at `icon`, with some slack
	/// on every side. `region` picks the monster or item layout.
	pub fn name_rect_for_icon(&self, region: RegionId, icon: Rect) -> Rect {
		let offset = self.entity(region).icon_name_offset();
		let x1 = icon.x + offset.top_left.0;
		let y1 = icon.y + offset.top_left.1;
		let x2 = icon.x + icon.width as i32 + offset.bottom_right.0;
		let y2 = icon.y + icon.height as i32 + offset.bottom_right.1;

		let pad_x = ((x2 - x1) as f32 * NAME_PADDING) as i32;
		let pad_y = ((y2 - y1) as f32 * NAME_PADDING) as i32;
		Rect::from_corners(x1 - pad_x, y1 - pad_y, x2 + pad_x, y2 + pad_y)
	}
}
