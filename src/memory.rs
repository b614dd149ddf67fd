use crate::item::{ExpirationPolicy, ExpiringItem};
use crate::lock::{QueueRwLock, ReadWriteLock};
use crate::lru::LruStore;
use crate::tier::CacheTier;
use crate::ticker::{ThreadTicker, TickHandle, Ticker};
use crate::time::{Clock, SystemClock};

use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`MemoryTier`].
#[derive(Debug, Clone)]
pub struct MemoryConfig {
  /// Maximum number of entries held before LRU eviction kicks in.
  pub capacity: usize,
  /// Expiration policy stamped onto every entry written to this tier.
  pub policy: ExpirationPolicy,
  /// Interval between automatic expiration sweeps. `None` or zero means
  /// a single sweep at construction and none after.
  pub cleanup_interval: Option<Duration>,
}

impl MemoryConfig {
  pub fn new(capacity: usize, policy: ExpirationPolicy) -> Self {
    Self {
      capacity,
      policy,
      cleanup_interval: None,
    }
  }

  pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
    self.cleanup_interval = Some(interval);
    self
  }
}

/// An in-memory cache tier: an [`LruStore`] of [`ExpiringItem`]s behind a
/// tier-level reader/writer lock.
///
/// Reads refresh the entry's recency and last access time; expired entries
/// are deleted on the read that discovers them. Both side effects go
/// through the store's own internal mutex, so they are performed while
/// holding only the tier's *read* lock and never require escalating to the
/// write lock.
pub struct MemoryTier<K, V, L = QueueRwLock>
where
  K: Eq + Hash + Clone,
{
  store: LruStore<K, ExpiringItem<V>>,
  policy: ExpirationPolicy,
  clock: Arc<dyn Clock>,
  lock: L,
  sweeper: Mutex<Option<TickHandle>>,
}

impl<K, V> MemoryTier<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Clone + Send + Sync + 'static,
{
  /// Builds a tier with the production clock, ticker, and queue lock.
  pub fn new(config: MemoryConfig) -> Arc<Self> {
    Self::with_parts(
      config,
      Arc::new(SystemClock),
      &ThreadTicker::new(),
      QueueRwLock::new(),
    )
  }
}

impl<K, V, L> MemoryTier<K, V, L>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Clone + Send + Sync + 'static,
  L: ReadWriteLock + 'static,
{
  /// Builds a tier from injected collaborators. The deterministic-test
  /// entry point: pass a [`ManualClock`](crate::ManualClock) and a
  /// [`NoopLock`](crate::NoopLock) to drive expiry by hand.
  pub fn with_parts(
    config: MemoryConfig,
    clock: Arc<dyn Clock>,
    ticker: &dyn Ticker,
    lock: L,
  ) -> Arc<Self> {
    let tier = Arc::new(Self {
      store: LruStore::new(config.capacity),
      policy: config.policy,
      clock,
      lock,
      sweeper: Mutex::new(None),
    });
    Self::start_sweeper(&tier, config.cleanup_interval, ticker);
    tier
  }

  /// Current number of stored entries, expired or not.
  pub fn len(&self) -> usize {
    self.store.len()
  }

  pub fn is_empty(&self) -> bool {
    self.store.is_empty()
  }

  fn start_sweeper(tier: &Arc<Self>, interval: Option<Duration>, ticker: &dyn Ticker) {
    match interval {
      Some(interval) if interval > Duration::ZERO => {
        // The callback holds a weak reference; once the tier is dropped the
        // handle cancels the loop and any in-flight tick finds no tier.
        let weak = Arc::downgrade(tier);
        let handle = ticker.schedule(
          Duration::ZERO,
          interval,
          Box::new(move || {
            if let Some(tier) = weak.upgrade() {
              tier.sweep_expired();
            }
          }),
        );
        *tier.sweeper.lock() = Some(handle);
      }
      _ => tier.sweep_expired(),
    }
  }
}

impl<K, V, L> CacheTier<K, V> for MemoryTier<K, V, L>
where
  K: Eq + Hash + Clone + Send + Sync,
  V: Clone + Send + Sync,
  L: ReadWriteLock,
{
  fn set(&self, key: K, value: V) {
    let item = ExpiringItem::new(value, self.policy, self.clock.now());
    self.lock.write(|| self.store.set(key, item));
  }

  fn get(&self, key: &K) -> Option<V> {
    self.lock.read(|| {
      let mut item = self.store.get(key)?;

      if item.is_expired(self.clock.now()) {
        // Deleting under the tier's read lock is fine: the store's own
        // mutex keeps the link mutation exclusive.
        self.store.remove(key);
        return None;
      }

      item.touch(self.clock.now());
      let value = item.value().clone();
      // Persist the refreshed access time; this also counts as a use.
      self.store.set(key.clone(), item);
      Some(value)
    })
  }

  fn remove(&self, key: &K) {
    self.lock.write(|| self.store.remove(key));
  }

  fn clear(&self) {
    self.lock.write(|| self.store.clear());
  }

  fn sweep_expired(&self) {
    self.lock.write(|| {
      let now = self.clock.now();
      let mut removed = 0usize;

      for key in self.store.keys() {
        let Some(item) = self.store.get(&key) else {
          continue;
        };
        if item.is_expired(now) {
          self.store.remove(&key);
          removed += 1;
        }
      }

      if removed > 0 {
        tracing::debug!(removed, "memory tier sweep removed expired entries");
      }
    });
  }
}
