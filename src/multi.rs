use crate::lock::{ReadWriteLock, RecursiveRwLock};
use crate::tier::CacheTier;

use std::sync::Arc;

/// A cache tier composed of other tiers, ordered by priority.
///
/// Index 0 is the highest-priority tier: it is checked first on reads and,
/// like every other tier, populated eagerly on writes. A read that hits a
/// lower tier promotes the value into every higher tier afterwards, so hot
/// entries migrate toward the front.
///
/// The composite's own lock — not the member tiers' locks — is what orders
/// concurrent operations issued through the composite. Tiers accessed
/// directly as well as through the composite can observe interleavings
/// between the two paths.
pub struct MultiLevelCache<K, V, L = RecursiveRwLock> {
  tiers: Vec<Arc<dyn CacheTier<K, V>>>,
  lock: L,
}

impl<K, V> MultiLevelCache<K, V> {
  /// Composes `tiers` (highest priority first) behind a recursive lock.
  pub fn new(tiers: Vec<Arc<dyn CacheTier<K, V>>>) -> Self {
    Self::with_lock(tiers, RecursiveRwLock::new())
  }
}

impl<K, V, L: ReadWriteLock> MultiLevelCache<K, V, L> {
  pub fn with_lock(tiers: Vec<Arc<dyn CacheTier<K, V>>>, lock: L) -> Self {
    Self { tiers, lock }
  }

  pub fn tier_count(&self) -> usize {
    self.tiers.len()
  }
}

impl<K, V, L> CacheTier<K, V> for MultiLevelCache<K, V, L>
where
  K: Clone + Send + Sync,
  V: Clone + Send + Sync,
  L: ReadWriteLock,
{
  /// Writes through to every member tier, in priority order.
  fn set(&self, key: K, value: V) {
    self.lock.write(|| {
      for tier in &self.tiers {
        tier.set(key.clone(), value.clone());
      }
    });
  }

  /// Scans tiers in priority order and returns the first hit, then
  /// promotes the value into the tiers that missed.
  fn get(&self, key: &K) -> Option<V> {
    // Lookup runs under the read lock only. The write lock must not be
    // taken while the read lock is still held: the queue lock variant is
    // not reentrant across modes, so promotion is deferred until after the
    // read lock is released.
    let (hit_index, value) = self.lock.read(|| {
      self
        .tiers
        .iter()
        .enumerate()
        .find_map(|(index, tier)| tier.get(key).map(|value| (index, value)))
    })?;

    if hit_index > 0 {
      self.lock.write(|| {
        // Promotion is a fresh set per tier and re-stamps timestamps there,
        // intentionally: the value is hot again.
        for higher in self.tiers[..hit_index].iter().rev() {
          higher.set(key.clone(), value.clone());
        }
      });
    }

    Some(value)
  }

  fn remove(&self, key: &K) {
    self.lock.write(|| {
      for tier in &self.tiers {
        tier.remove(key);
      }
    });
  }

  fn clear(&self) {
    self.lock.write(|| {
      for tier in &self.tiers {
        tier.clear();
      }
    });
  }

  fn sweep_expired(&self) {
    self.lock.write(|| {
      for tier in &self.tiers {
        tier.sweep_expired();
      }
    });
  }
}
