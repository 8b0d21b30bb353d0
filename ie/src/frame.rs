//! Captured screen regions.

use std::{fmt, str::FromStr, time::Instant};

/// Named capture rectangles on the game window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionId {
    MonsterIcon,
    MonsterName,
    ItemIcon,
    ItemName,
}

impl RegionId {
    pub const ALL: [RegionId; 4] = [Self::MonsterIcon, Self::MonsterName, Self::ItemIcon, Self::ItemName];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonsterIcon => "monster_icon",
            Self::MonsterName => "monster_name",
            Self::ItemIcon => "item_icon",
            Self::ItemName => "item_name",
        }
    }

    pub fn is_name(&self) -> bool {
        matches!(self, Self::MonsterName | Self::ItemName)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| format!("unknown region `{s}` (expected one of monster_icon, monster_name, item_icon, item_name)"))
    }
}

/// Pixels of one region at one moment. Frames are consumed by a single
/// recognition cycle and never stored.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub image: image::RgbaImage,
    pub region: RegionId,
    pub captured_at: Instant,
}

impl CaptureFrame {
    pub fn new(image: image::RgbaImage, region: RegionId) -> Self {
        Self {
            image,
            region,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn to_gray(&self) -> image::GrayImage {
        image::imageops::grayscale(&self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_names_parse_both_separators() {
        assert_eq!("monster-name".parse::<RegionId>(), Ok(RegionId::MonsterName));
        assert_eq!("ITEM_ICON".parse::<RegionId>(), Ok(RegionId::ItemIcon));
        assert!("boss_name".parse::<RegionId>().is_err());
    }

    #[test]
    fn zero_sized_frame_is_empty() {
        let frame = CaptureFrame::new(image::RgbaImage::new(0, 12), RegionId::ItemName);
        assert!(frame.is_empty());
        assert!(!CaptureFrame::new(image::RgbaImage::new(3, 3), RegionId::ItemName).is_empty());
    }
}
