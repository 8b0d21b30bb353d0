//! Watches the game's `Player.log` and starts a recognition cycle when a
//! scene-change line shows up.

use std::{
	fs::File,
	io::{self, Read, Seek, SeekFrom},
	path::{Path, PathBuf},
	sync::mpsc,
	thread::JoinHandle,
	time::Duration,
};

use anyhow::{Context, Result, bail};
use notify::{RecursiveMode, Watcher};
use regex::Regex;

use crate::signal::{Signal, StopToken, Trigger};

/// Upper bound between two looks at the file. Some platforms drop change
/// events for files the writer keeps open.
const POLL: Duration = Duration::from_millis(250);

/// `%USERPROFILE%/AppData/LocalLow/Tempo Storm/The Bazaar/Player.log`.
pub fn default_log_path() -> Option<PathBuf> {
	let home = dirs::home_dir()?;
	Some(home.join("AppData").join("LocalLow").join("Tempo Storm").join("The Bazaar").join("Player.log"))
}

pub fn compile_markers(markers: &[String]) -> Result<Vec<Regex>> {
	markers
		.iter()
		.map(|m| Regex::new(m).with_context(|| format!("invalid log marker {m:?}")))
		.collect()
}

/// Reads lines appended to a file since the last call.
#[derive(Debug)]
pub struct Tail {
	path: PathBuf,
	pos: u64,
	partial: Vec<u8>,
}

impl Tail {
	/// Starts after whatever the file already holds.
	pub fn at_end(path: impl Into<PathBuf>) -> io::Result<Self> {
		let path = path.into();
		let pos = std::fs::metadata(&path)?.len();
		Ok(Self {
			path,
			pos,
			partial: Vec::new(),
		})
	}

	/// Complete lines written since the last poll. A trailing unterminated
	/// line is held back until its newline arrives. A file that shrank was
	/// rewritten and is read again from the start; a missing one reads as empty.
	pub fn poll(&mut self) -> io::Result<Vec<String>> {
		let mut file = match File::open(&self.path) {
			Ok(file) => file,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(err),
		};

		let len = file.metadata()?.len();
		if len < self.pos {
			tracing::debug!(path = %self.path.display(), "log truncated; reading from start");
			self.pos = 0;
			self.partial.clear();
		}
		if len == self.pos {
			return Ok(Vec::new());
		}

		file.seek(SeekFrom::Start(self.pos))?;
		let read = (&mut file).take(len - self.pos).read_to_end(&mut self.partial)?;
		self.pos += read as u64;

		let mut lines = Vec::new();
		while let Some(idx) = self.partial.iter().position(|&b| b == b'\n') {
			let line: Vec<u8> = self.partial.drain(..=idx).collect();
			let line = String::from_utf8_lossy(&line);
			lines.push(line.trim_end_matches(['\r', '\n']).to_owned());
		}
		Ok(lines)
	}
}

pub struct LogMonitor {
	stop: StopToken,
	handle: Option<JoinHandle<()>>,
}

impl LogMonitor {
	/// Starts tailing `path`. Fails when the file does not exist or cannot be
	/// watched; the caller decides whether that matters.
	pub fn start(path: &Path, markers: Vec<Regex>, trigger: Trigger) -> Result<Self> {
		if !path.is_file() {
			bail!("game log {:?} not found", path);
		}
		let dir = path.parent().context("game log has no parent directory")?;
		let mut tail = Tail::at_end(path).with_context(|| format!("open {:?}", path))?;

		let (tx, rx) = mpsc::channel();
		let mut watcher = notify::recommended_watcher(tx).context("create file watcher")?;
		watcher
			.watch(dir, RecursiveMode::NonRecursive)
			.with_context(|| format!("watch {:?}", dir))?;

		let signal = Signal::new();
		let stop = signal.stop_token();
		let file_name = path.file_name().map(|n| n.to_owned());
		let log = path.to_path_buf();

		let handle = {
			let stop = stop.clone();
			std::thread::Builder::new()
				.name("lens-logmon".into())
				.spawn(move || {
					// Dropping the watcher ends the event stream.
					let _watcher = watcher;
					tracing::info!(path = %log.display(), "watching game log");
					while !stop.is_cancelled() {
						match rx.recv_timeout(POLL) {
							Ok(Ok(event)) if !event.paths.iter().any(|p| p.file_name() == file_name.as_deref()) => continue,
							Ok(Err(err)) => tracing::warn!(error = %err, "file watcher error"),
							Err(mpsc::RecvTimeoutError::Disconnected) => break,
							_ => {}
						}
						match tail.poll() {
							Ok(lines) => {
								let hits = count_markers(&lines, &markers);
								if hits > 0 {
									tracing::debug!(hits, "scene change in game log");
									trigger.fire();
								}
							}
							Err(err) => tracing::warn!(error = %err, path = %log.display(), "failed to read game log"),
						}
					}
				})
				.context("spawn log monitor thread")?
		};

		Ok(Self {
			stop,
			handle: Some(handle),
		})
	}

	pub fn stop(mut self) {
		self.halt();
	}

	fn halt(&mut self) {
		self.stop.cancel();
		if let Some(handle) = self.handle.take()
			&& handle.join().is_err()
		{
			tracing::error!("log monitor thread panicked");
		}
	}
}

impl Drop for LogMonitor {
	fn drop(&mut self) {
		self.halt();
	}
}

fn count_markers(lines: &[String], markers: &[Regex]) -> usize {
	lines.iter().filter(|line| markers.iter().any(|re| re.is_match(line))).count()
}

#[cfg(test)]
mod tests {
	use std::{fs::OpenOptions, io::Write, time::Instant};

	use super::*;
	use crate::signal::Wake;

	fn append(path: &Path, text: &str) {
		let mut f = OpenOptions::new().append(true).open(path).unwrap();
		f.write_all(text.as_bytes()).unwrap();
	}

	#[test]
	fn tail_skips_history_and_holds_partial_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("Player.log");
		std::fs::write(&path, "old line\n").unwrap();

		let mut tail = Tail::at_end(&path).unwrap();
		assert!(tail.poll().unwrap().is_empty());

		append(&path, "first\r\nsec");
		assert_eq!(tail.poll().unwrap(), ["first"]);
		append(&path, "ond\n");
		assert_eq!(tail.poll().unwrap(), ["second"]);
	}

	#[test]
	fn tail_restarts_after_truncation() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("Player.log");
		std::fs::write(&path, "a long line from the previous session\n").unwrap();
		let mut tail = Tail::at_end(&path).unwrap();

		std::fs::write(&path, "new\n").unwrap();
		assert_eq!(tail.poll().unwrap(), ["new"]);
	}

	#[test]
	fn tail_of_deleted_file_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("Player.log");
		std::fs::write(&path, "").unwrap();
		let mut tail = Tail::at_end(&path).unwrap();
		std::fs::remove_file(&path).unwrap();
		assert!(tail.poll().unwrap().is_empty());
	}

	#[test]
	fn markers_are_regexes() {
		let markers = compile_markers(&["Card Purchased:".into(), r"^\[Combat\] start".into()]).unwrap();
		let lines = [
			"Card Purchased: InstanceId: itm_1 - TemplateIdabc - Target:Player".to_string(),
			"[Combat] start".to_string(),
			"something else [Combat] start".to_string(),
		];
		assert_eq!(count_markers(&lines, &markers), 2);
		assert!(compile_markers(&["(".into()]).is_err());
	}

	#[test]
	fn missing_log_does_not_start() {
		let dir = tempfile::tempdir().unwrap();
		let res = LogMonitor::start(&dir.path().join("Player.log"), Vec::new(), Signal::new().trigger());
		assert!(res.is_err());
	}

	#[test]
	fn marker_line_fires_the_trigger() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("Player.log");
		std::fs::write(&path, "Card Purchased: before we started\n").unwrap();

		let signal = Signal::new();
		let monitor = LogMonitor::start(&path, compile_markers(&["Card Purchased:".into()]).unwrap(), signal.trigger()).unwrap();

		append(&path, "unrelated\n");
		assert_eq!(signal.wait_until(Some(Instant::now() + Duration::from_millis(600))), Wake::TimedOut);

		append(&path, "Card Purchased: InstanceId: itm_2\n");
		assert_eq!(signal.wait_until(Some(Instant::now() + Duration::from_secs(5))), Wake::Triggered);
		monitor.stop();
	}
}
