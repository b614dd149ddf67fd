use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Schedules a repeating callback, used by tiers to drive periodic sweeps.
///
/// Tiers only schedule when configured with a positive cleanup interval; an
/// absent or non-positive interval means the tier sweeps exactly once at
/// construction and the ticker is never involved.
pub trait Ticker: Send + Sync {
  /// Invokes `on_tick` after `initial_delay` and then once per `interval`
  /// until the returned handle is cancelled or dropped. A zero `interval`
  /// means run once, never again.
  fn schedule(
    &self,
    initial_delay: Duration,
    interval: Duration,
    on_tick: Box<dyn Fn() + Send + Sync>,
  ) -> TickHandle;
}

/// Cancellation handle for a scheduled tick loop.
///
/// Cancelling is idempotent; dropping the handle cancels too, which ties
/// the callback's lifetime to whoever owns the handle and rules out ticks
/// firing against a torn-down owner.
#[derive(Debug)]
pub struct TickHandle {
  stop_flag: Arc<AtomicBool>,
}

impl TickHandle {
  /// Wraps a shared stop flag. `Ticker` implementations hand the same flag
  /// to their tick loop and observe it to know when to stop.
  pub fn new(stop_flag: Arc<AtomicBool>) -> Self {
    Self { stop_flag }
  }

  pub fn cancel(&self) {
    self.stop_flag.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.stop_flag.load(Ordering::Relaxed)
  }
}

impl Drop for TickHandle {
  fn drop(&mut self) {
    self.cancel();
  }
}

/// The production ticker: one background thread per schedule.
///
/// The thread sleeps out whatever is left of the interval after each tick,
/// and exits at the next wakeup once cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadTicker;

impl ThreadTicker {
  pub fn new() -> Self {
    Self
  }
}

impl Ticker for ThreadTicker {
  fn schedule(
    &self,
    initial_delay: Duration,
    interval: Duration,
    on_tick: Box<dyn Fn() + Send + Sync>,
  ) -> TickHandle {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_clone = stop_flag.clone();

    thread::spawn(move || {
      if !initial_delay.is_zero() {
        thread::sleep(initial_delay);
      }

      while !stop_clone.load(Ordering::Relaxed) {
        let tick_start = Instant::now();

        on_tick();

        // Run once, never again.
        if interval.is_zero() {
          break;
        }

        // Sleep for the remaining duration of the tick interval.
        if let Some(remaining) = interval.checked_sub(tick_start.elapsed()) {
          thread::sleep(remaining);
        }
      }
    });

    TickHandle { stop_flag }
  }
}
