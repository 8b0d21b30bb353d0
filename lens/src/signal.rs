//! Wake-up, cancellation and hand-off primitives for the worker threads.

use std::{
	sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
	time::Instant,
};

#[derive(Debug, Default)]
struct WakeState {
	pending: bool,
	stopped: bool,
}

#[derive(Debug, Default)]
struct Wakeup {
	state: Mutex<WakeState>,
	cv: Condvar,
}

impl Wakeup {
	fn lock(&self) -> MutexGuard<'_, WakeState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Why a [`Signal::wait_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
	Triggered,
	TimedOut,
	Stopped,
}

/// Shared wake-up state of one worker. Hand out [`Trigger`]s and
/// [`StopToken`]s; the worker itself waits on the signal.
#[derive(Debug, Clone, Default)]
pub struct Signal(Arc<Wakeup>);

impl Signal {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn trigger(&self) -> Trigger {
		Trigger(self.0.clone())
	}

	pub fn stop_token(&self) -> StopToken {
		StopToken(self.0.clone())
	}

	/// Blocks until triggered, stopped, or `deadline` passes (`None` waits
	/// for a trigger or stop only). Stop wins over a pending trigger. A
	/// pending trigger is consumed.
	pub fn wait_until(&self, deadline: Option<Instant>) -> Wake {
		let mut state = self.0.lock();
		loop {
			if state.stopped {
				return Wake::Stopped;
			}
			if state.pending {
				state.pending = false;
				return Wake::Triggered;
			}
			match deadline {
				None => {
					state = self.0.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
				}
				Some(deadline) => {
					let now = Instant::now();
					if now >= deadline {
						return Wake::TimedOut;
					}
					let (guard, _timeout) = self
						.0
						.cv
						.wait_timeout(state, deadline - now)
						.unwrap_or_else(PoisonError::into_inner);
					state = guard;
				}
			}
		}
	}
}

/// Requests a recognition cycle. Triggers fired before the worker gets to
/// them collapse into one.
#[derive(Debug, Clone)]
pub struct Trigger(Arc<Wakeup>);

impl Trigger {
	pub fn fire(&self) {
		let mut state = self.0.lock();
		state.pending = true;
		self.0.cv.notify_all();
	}
}

/// Cancels a worker. Once cancelled, stays cancelled.
#[derive(Debug, Clone)]
pub struct StopToken(Arc<Wakeup>);

impl StopToken {
	pub fn cancel(&self) {
		let mut state = self.0.lock();
		state.stopped = true;
		self.0.cv.notify_all();
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.lock().stopped
	}
}

struct SlotState<T> {
	value: Option<T>,
	last_seq: u64,
	closed: bool,
}

/// Single-value channel that only ever holds the newest item.
///
/// Every value carries a sequence number; publishing a value that is not
/// newer than the last accepted one is refused, so a slow producer can
/// never overwrite fresher data.
pub struct LatestSlot<T> {
	state: Mutex<SlotState<T>>,
	cv: Condvar,
}

impl<T> Default for LatestSlot<T> {
	fn default() -> Self {
		Self {
			state: Mutex::new(SlotState {
				value: None,
				last_seq: 0,
				closed: false,
			}),
			cv: Condvar::new(),
		}
	}
}

impl<T> LatestSlot<T> {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Stores `value` unless something at least as new was already published.
	/// An unread older value is replaced.
	pub fn publish(&self, seq: u64, value: T) -> bool {
		let mut state = self.lock();
		if state.closed || seq <= state.last_seq {
			return false;
		}
		state.last_seq = seq;
		state.value = Some(value);
		self.cv.notify_all();
		true
	}

	#[cfg(test)]
	pub fn try_take(&self) -> Option<T> {
		self.lock().value.take()
	}

	/// Blocks for the next value; `None` once the slot is closed and drained.
	pub fn recv(&self) -> Option<T> {
		let mut state = self.lock();
		loop {
			if let Some(value) = state.value.take() {
				return Some(value);
			}
			if state.closed {
				return None;
			}
			state = self.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
		}
	}

	pub fn close(&self) {
		let mut state = self.lock();
		state.closed = true;
		self.cv.notify_all();
	}
}
