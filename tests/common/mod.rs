#![allow(dead_code)]

use strata_cache::{TickHandle, Ticker};

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A ticker that never fires on its own: scheduled callbacks are collected
/// and run only when the test says so, which makes sweep timing
/// deterministic.
#[derive(Default)]
pub struct RecordingTicker {
  callbacks: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
}

impl RecordingTicker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of schedules requested so far.
  pub fn schedule_count(&self) -> usize {
    self.callbacks.lock().unwrap().len()
  }

  /// Runs every scheduled callback once, as if one interval elapsed.
  pub fn fire(&self) {
    for callback in self.callbacks.lock().unwrap().iter() {
      callback();
    }
  }
}

impl Ticker for RecordingTicker {
  fn schedule(
    &self,
    _initial_delay: Duration,
    _interval: Duration,
    on_tick: Box<dyn Fn() + Send + Sync>,
  ) -> TickHandle {
    self.callbacks.lock().unwrap().push(on_tick);
    TickHandle::new(Arc::new(AtomicBool::new(false)))
  }
}
