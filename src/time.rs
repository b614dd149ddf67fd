use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A source of wall-clock time.
///
/// Every tier reads time exclusively through its injected `Clock`, which is
/// what makes expiration deterministic under test: swap in a [`ManualClock`]
/// and advance it explicitly.
pub trait Clock: Send + Sync {
  fn now(&self) -> SystemTime;
}

/// The production clock, backed by [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  #[inline]
  fn now(&self) -> SystemTime {
    SystemTime::now()
  }
}

/// A clock that only moves when told to.
///
/// Cloning shares the underlying time, so a clone handed to a tier and a
/// clone kept by the test advance together.
#[derive(Debug, Clone)]
pub struct ManualClock {
  now: Arc<Mutex<SystemTime>>,
}

impl ManualClock {
  pub fn new(start: SystemTime) -> Self {
    Self {
      now: Arc::new(Mutex::new(start)),
    }
  }

  /// Moves the clock forward by `delta`.
  pub fn advance(&self, delta: Duration) {
    let mut now = self.now.lock();
    *now += delta;
  }

  /// Sets the clock to an absolute time.
  pub fn set(&self, to: SystemTime) {
    *self.now.lock() = to;
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new(SystemTime::UNIX_EPOCH)
  }
}

impl Clock for ManualClock {
  #[inline]
  fn now(&self) -> SystemTime {
    *self.now.lock()
  }
}
