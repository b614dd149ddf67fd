use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Decides when a cached entry stops being servable.
///
/// A policy is a pure function of elapsed time; it carries no mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpirationPolicy {
  /// The entry expires a fixed duration after it was created, regardless
  /// of how often it is read.
  SinceCreation(Duration),
  /// The entry expires a fixed duration after it was last read; every
  /// successful read restarts the window.
  SinceLastAccess(Duration),
  /// The entry never expires.
  Never,
}

/// A cached value together with its timestamps and expiration policy.
///
/// The value and creation time are fixed at construction; only the last
/// access time moves, and only forwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringItem<V> {
  value: V,
  creation_time: SystemTime,
  last_access_time: SystemTime,
  expiration_policy: ExpirationPolicy,
}

impl<V> ExpiringItem<V> {
  /// Wraps `value`, stamping both timestamps with `now`.
  pub fn new(value: V, policy: ExpirationPolicy, now: SystemTime) -> Self {
    Self {
      value,
      creation_time: now,
      last_access_time: now,
      expiration_policy: policy,
    }
  }

  #[inline]
  pub fn value(&self) -> &V {
    &self.value
  }

  #[inline]
  pub fn into_value(self) -> V {
    self.value
  }

  #[inline]
  pub fn creation_time(&self) -> SystemTime {
    self.creation_time
  }

  #[inline]
  pub fn last_access_time(&self) -> SystemTime {
    self.last_access_time
  }

  #[inline]
  pub fn policy(&self) -> ExpirationPolicy {
    self.expiration_policy
  }

  /// Whether the item is expired at `now`.
  ///
  /// The comparison is strictly-greater: an item whose window is `d` is
  /// still servable at exactly `creation + d`.
  pub fn is_expired(&self, now: SystemTime) -> bool {
    match self.expiration_policy {
      ExpirationPolicy::SinceCreation(window) => {
        elapsed_since(now, self.creation_time) > window
      }
      ExpirationPolicy::SinceLastAccess(window) => {
        elapsed_since(now, self.last_access_time) > window
      }
      ExpirationPolicy::Never => false,
    }
  }

  /// Refreshes the last access time.
  ///
  /// The access time never moves backwards, so a stale `now` (e.g. from a
  /// clock adjustment) cannot shrink an already-granted idle window.
  pub fn touch(&mut self, now: SystemTime) {
    if now > self.last_access_time {
      self.last_access_time = now;
    }
  }
}

// Elapsed time, saturating to zero when `since` is in the future.
#[inline]
fn elapsed_since(now: SystemTime, since: SystemTime) -> Duration {
  now.duration_since(since).unwrap_or(Duration::ZERO)
}
