use std::path::PathBuf;

use clap::Parser;
use data::EntityKind;
use ie::RegionId;

use crate::config::{Config, OcrBackend};

#[derive(Debug, Parser)]
#[command(name = "bazaar-lens")]
#[command(about = "Recognizes monsters and items on The Bazaar's screen", long_about = None)]
pub struct Cli {
	/// Config file (default: bazaar-lens.json in the user config directory)
	#[arg(short, long)]
	pub config: Option<PathBuf>,

	/// Directory with the catalog JSON files
	#[arg(long)]
	pub data_dir: Option<PathBuf>,

	/// Capture rectangles file
	#[arg(long)]
	pub positions: Option<PathBuf>,

	/// Region to read (monster_icon, monster_name, item_icon, item_name)
	#[arg(short, long)]
	pub region: Option<RegionId>,

	/// Only match entities of this kind (monster, item, skill, event)
	#[arg(short, long)]
	pub kind: Option<EntityKind>,

	/// OCR backend
	#[arg(long, value_enum)]
	pub backend: Option<OcrBackend>,

	/// Run one recognition cycle, print the result and exit
	#[arg(long)]
	pub once: bool,

	/// Read from a screenshot instead of the live game window
	#[arg(long)]
	pub image: Option<PathBuf>,

	/// Start with an empty catalog if the catalog cannot be loaded
	#[arg(long)]
	pub degraded: bool,

	/// Debug logging (RUST_LOG takes precedence)
	#[arg(short, long)]
	pub verbose: bool,

	/// Print the effective configuration as JSON and exit
	#[arg(long)]
	pub dump_config: bool,

	/// Write the effective configuration to the config file and exit
	#[arg(long)]
	pub save_config: bool,
}

impl Cli {
	/// Command-line values win over the config file.
	pub fn apply(&self, cfg: &mut Config) {
		if let Some(dir) = &self.data_dir {
			cfg.data_dir = dir.clone();
		}
		if let Some(path) = &self.positions {
			cfg.position_file = path.clone();
		}
		if let Some(region) = self.region {
			cfg.region = region;
		}
		if self.kind.is_some() {
			cfg.kind = self.kind;
		}
		if let Some(backend) = self.backend {
			cfg.ocr.backend = backend;
		}
	}
}
