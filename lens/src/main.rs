//! Bazaar Lens.
//!
//! Reads monster and item names off The Bazaar's window and resolves them
//! against the local catalog.

mod capture;
mod cli;
mod config;
mod logmon;
mod position;
mod recognition;
mod signal;
mod util;

use std::{
	io::BufRead,
	path::Path,
	sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use data::{CatalogFile, CatalogIndex, FuzzyMatcher, MatchResult, SharedCatalog};
use ie::{OcrPipeline, TextRecognizer, ocr};

use crate::{
	capture::{FrameSource, ImageFileSource, WindowCapture},
	cli::Cli,
	config::{Config, OcrBackend, OcrSettings},
	logmon::LogMonitor,
	position::PositionConfig,
	recognition::{LoopSettings, RecognitionLoop, Recognizer},
	signal::Trigger,
};

fn main() -> Result<()> {
	let cli = Cli::parse();

	// Structured logging. `RUST_LOG` wins over `--verbose`.
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let mut cfg = match &cli.config {
		Some(path) => Config::try_load_from(path)?,
		None => Config::load_or_default(),
	};
	cli.apply(&mut cfg);

	if cli.dump_config {
		println!("{}", serde_json::to_string_pretty(&cfg).context("serialize config")?);
		return Ok(());
	}
	if cli.save_config {
		match &cli.config {
			Some(path) => cfg.save_to(path)?,
			None => cfg.save()?,
		}
		tracing::info!("config saved");
		return Ok(());
	}

	let files = CatalogFile::defaults(&cfg.data_dir);
	let catalog = SharedCatalog::new(load_catalog(&files, cli.degraded)?);
	let matcher = Arc::new(FuzzyMatcher::new(catalog.clone(), cfg.matching.clone()));
	let pipeline = Arc::new(ocr_pipeline(&cfg.ocr)?);
	let recognizer = Recognizer::new(frame_source(&cfg, cli.image.as_deref())?, pipeline, matcher);

	if cli.once {
		let result = recognizer.run_once(cfg.region, cfg.kind);
		present(&result);
		return Ok(());
	}

	let recognition = RecognitionLoop::spawn(
		recognizer,
		LoopSettings {
			region: cfg.region,
			kind: cfg.kind,
			poll_interval: cfg.poll_interval(),
			debounce: cfg.debounce(),
		},
		present,
	);
	let monitor = log_monitor(&cfg, recognition.trigger());

	println!("Enter = recognize now, r = reload catalog, s = state, q = quit");
	let trigger = recognition.trigger();
	for line in std::io::stdin().lock().lines() {
		let line = line.context("read stdin")?;
		match line.trim() {
			"" => trigger.fire(),
			"r" | "reload" => match catalog.reload(&files) {
				Ok(generation) => tracing::info!(generation, "catalog reloaded"),
				Err(err) => tracing::warn!(error = %err, "catalog reload failed; keeping the current one"),
			},
			"s" | "state" => println!("{:?}", recognition.state()),
			"q" | "quit" => break,
			other => tracing::warn!(command = other, "unknown command"),
		}
	}

	if let Some(monitor) = monitor {
		monitor.stop();
	}
	recognition.shutdown();
	Ok(())
}

fn load_catalog(files: &[CatalogFile], degraded: bool) -> Result<CatalogIndex> {
	match CatalogIndex::load(files) {
		Ok(index) => Ok(index),
		Err(err) if degraded => {
			tracing::warn!(error = %err, "catalog unavailable; running with an empty catalog");
			Ok(CatalogIndex::empty())
		}
		Err(err) => Err(err).context("load catalog (pass --degraded to start without one)"),
	}
}

fn ocr_pipeline(settings: &OcrSettings) -> Result<OcrPipeline> {
	let engine: Box<dyn TextRecognizer> = match settings.backend {
		OcrBackend::Tesseract => Box::new(
			ocr::Tesseract::locate(settings.tesseract_path.as_deref())
				.with_tessdata_dir(settings.tessdata_dir.clone())
				.with_language(&settings.language),
		),
		OcrBackend::Paddle => {
			let models = util::assets::resolve_paddle_models(settings.paddle_models_dir.as_deref(), &settings.paddle_language)?;
			Box::new(ocr::Paddle::try_new(&models)?)
		}
	};
	let pipeline = OcrPipeline::new(engine)
		.context("OCR engine unavailable")?
		.with_min_usable_chars(settings.min_usable_chars)
		.with_debug_dir(settings.debug_dir.clone());
	Ok(pipeline)
}

fn frame_source(cfg: &Config, image: Option<&Path>) -> Result<Box<dyn FrameSource>> {
	if let Some(path) = image {
		// Without a position file the whole screenshot is read.
		let positions = if cfg.position_file.is_file() {
			Some(PositionConfig::load(&cfg.position_file)?)
		} else {
			None
		};
		return Ok(Box::new(ImageFileSource::open(path, positions)?));
	}

	let positions = PositionConfig::load(&cfg.position_file)?;
	Ok(Box::new(WindowCapture::new(cfg.window.clone(), positions)))
}

fn log_monitor(cfg: &Config, trigger: Trigger) -> Option<LogMonitor> {
	if !cfg.game_log.enabled {
		return None;
	}
	let Some(path) = cfg.game_log.resolved_path() else {
		tracing::warn!("no home directory; game log monitor disabled");
		return None;
	};
	let started = logmon::compile_markers(&cfg.game_log.markers).and_then(|markers| LogMonitor::start(&path, markers, trigger));
	match started {
		Ok(monitor) => Some(monitor),
		Err(err) => {
			tracing::warn!(error = %err, "game log monitor disabled");
			None
		}
	}
}

fn present(result: &MatchResult) {
	match &result.entry {
		Some(entry) => {
			let tier = result.match_tier.map(|t| t.to_string()).unwrap_or_default();
			println!(
				"{} {} ({}) [{tier} {:.2}] <- {:?}",
				entry.kind, entry.name, entry.name_localized, result.score, result.text
			);
		}
		None => {
			tracing::debug!(text = %result.text, "no match");
			println!("-");
		}
	}
}
