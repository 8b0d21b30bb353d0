//! The capture → OCR → match loop.
//!
//! One worker thread runs cycles on a timer and on demand; a second thread
//! hands results to the presentation callback through a [`LatestSlot`], so a
//! slow presenter only ever sees the newest result.

use std::{
	sync::{
		Arc,
		atomic::{AtomicU8, Ordering},
	},
	thread::JoinHandle,
	time::{Duration, Instant},
};

use data::{EntityKind, FuzzyMatcher, MatchResult};
use ie::{OcrPipeline, RegionId};

use crate::{
	capture::{CaptureError, FrameSource},
	signal::{LatestSlot, Signal, StopToken, Trigger, Wake},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
	Idle,
	Capturing,
	Recognizing,
	Matching,
	Presenting,
}

impl LoopState {
	fn from_u8(v: u8) -> Self {
		match v {
			1 => Self::Capturing,
			2 => Self::Recognizing,
			3 => Self::Matching,
			4 => Self::Presenting,
			_ => Self::Idle,
		}
	}
}

#[derive(Debug, Clone, Default)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
	fn set(&self, state: LoopState) {
		self.0.store(state as u8, Ordering::Release);
	}

	fn get(&self) -> LoopState {
		LoopState::from_u8(self.0.load(Ordering::Acquire))
	}
}

/// Suppresses repeats of the same outcome.
///
/// Two results are the same when both are misses, or both matched the same
/// `(kind, name)`. A repeat seen within `window` of the previous sighting is
/// dropped and extends the window, so an entity that stays on screen is
/// presented once.
#[derive(Debug)]
pub struct Debouncer {
	window: Duration,
	last: Option<(Option<(EntityKind, String)>, Instant)>,
}

impl Debouncer {
	pub fn new(window: Duration) -> Self {
		Self { window, last: None }
	}

	pub fn admit(&mut self, result: &MatchResult, now: Instant) -> bool {
		let subject = result.subject().map(|(kind, name)| (kind, name.to_owned()));
		if let Some((last, seen)) = &mut self.last
			&& *last == subject
		{
			let repeat = now.saturating_duration_since(*seen) < self.window;
			*seen = now;
			return !repeat;
		}
		self.last = Some((subject, now));
		true
	}
}

/// Runs single recognition cycles. Owns the frame source; the pipeline and
/// matcher may be shared.
pub struct Recognizer {
	source: Box<dyn FrameSource>,
	pipeline: Arc<OcrPipeline>,
	matcher: Arc<FuzzyMatcher>,
}

impl Recognizer {
	pub fn new(source: Box<dyn FrameSource>, pipeline: Arc<OcrPipeline>, matcher: Arc<FuzzyMatcher>) -> Self {
		Self {
			source,
			pipeline,
			matcher,
		}
	}

	/// One synchronous capture → OCR → match pass.
	pub fn run_once(&self, region: RegionId, kind: Option<EntityKind>) -> MatchResult {
		self.cycle(region, kind, &StateCell::default())
	}

	fn cycle(&self, region: RegionId, kind: Option<EntityKind>, state: &StateCell) -> MatchResult {
		state.set(LoopState::Capturing);
		let frame = match self.source.capture(region) {
			Ok(frame) => frame,
			Err(err) => {
				match &err {
					CaptureError::Unavailable(_) => tracing::debug!(error = %err, %region, "nothing captured"),
					_ => tracing::warn!(error = %err, %region, "capture failed"),
				}
				return MatchResult::none("", self.matcher.catalog().generation());
			}
		};

		state.set(LoopState::Recognizing);
		let candidate = self.pipeline.recognize_escalating(&frame);
		drop(frame);
		if candidate.is_empty() {
			tracing::debug!(%region, "no text recognized");
		}

		state.set(LoopState::Matching);
		self.matcher.find_best_match(&candidate.raw_text, kind)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
	pub region: RegionId,
	pub kind: Option<EntityKind>,
	/// `None` runs cycles on triggers only.
	pub poll_interval: Option<Duration>,
	pub debounce: Duration,
}

pub struct RecognitionLoop {
	signal: Signal,
	state: StateCell,
	worker: Option<JoinHandle<()>>,
	presenter: Option<JoinHandle<()>>,
}

impl RecognitionLoop {
	pub fn spawn(recognizer: Recognizer, settings: LoopSettings, mut present: impl FnMut(&MatchResult) + Send + 'static) -> Self {
		let signal = Signal::new();
		let state = StateCell::default();
		let slot = Arc::new(LatestSlot::new());

		let presenter = {
			let slot = slot.clone();
			std::thread::Builder::new()
				.name("lens-presenter".into())
				.spawn(move || {
					while let Some(result) = slot.recv() {
						present(&result);
					}
				})
				.map_err(|err| tracing::error!(error = %err, "failed to start presenter thread"))
				.ok()
		};

		let worker = {
			let signal = signal.clone();
			let stop = signal.stop_token();
			let state = state.clone();
			std::thread::Builder::new()
				.name("lens-recognition".into())
				.spawn(move || {
					run_worker(&recognizer, &settings, &signal, &stop, &state, &slot);
					slot.close();
				})
				.map_err(|err| tracing::error!(error = %err, "failed to start recognition thread"))
				.ok()
		};

		Self {
			signal,
			state,
			worker,
			presenter,
		}
	}

	pub fn trigger(&self) -> Trigger {
		self.signal.trigger()
	}

	pub fn state(&self) -> LoopState {
		self.state.get()
	}

	pub fn stop(&self) {
		self.signal.stop_token().cancel();
	}

	/// Stops both threads and waits for them. An in-flight cycle finishes first.
	pub fn shutdown(mut self) {
		self.join();
	}

	fn join(&mut self) {
		self.stop();
		for handle in [self.worker.take(), self.presenter.take()].into_iter().flatten() {
			if handle.join().is_err() {
				tracing::error!("recognition thread panicked");
			}
		}
	}
}

impl Drop for RecognitionLoop {
	fn drop(&mut self) {
		self.join();
	}
}

fn run_worker(
	recognizer: &Recognizer,
	settings: &LoopSettings,
	signal: &Signal,
	stop: &StopToken,
	state: &StateCell,
	slot: &LatestSlot<MatchResult>,
) {
	let mut debouncer = Debouncer::new(settings.debounce);
	let mut seq = 0u64;
	// First timed cycle runs right away.
	let mut next_tick = settings.poll_interval.map(|_| Instant::now());

	loop {
		if signal.wait_until(next_tick) == Wake::Stopped {
			break;
		}

		seq += 1;
		let result = recognizer.cycle(settings.region, settings.kind, state);
		if stop.is_cancelled() {
			break;
		}

		if debouncer.admit(&result, Instant::now()) {
			state.set(LoopState::Presenting);
			slot.publish(seq, result);
		} else {
			tracing::trace!(seq, "result unchanged");
		}
		state.set(LoopState::Idle);

		next_tick = settings.poll_interval.map(|interval| Instant::now() + interval);
	}
	state.set(LoopState::Idle);
	tracing::debug!(cycles = seq, "recognition loop stopped");
}
