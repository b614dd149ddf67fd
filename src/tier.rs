/// The capability contract shared by every cache tier.
///
/// Implemented by [`MemoryTier`](crate::MemoryTier),
/// [`DiskTier`](crate::DiskTier), and
/// [`MultiLevelCache`](crate::MultiLevelCache), which composes other tiers
/// behind the same interface.
///
/// All miss conditions — absent key, expired entry, unreadable or
/// undecodable stored bytes — surface as `None`, never as errors: a cache
/// must fail open, and any uncertainty about an entry's validity resolves
/// to treating it as absent.
pub trait CacheTier<K, V>: Send + Sync {
  /// Stores `value` under `key`, stamped with the tier's expiration policy
  /// and the current time, fully replacing any prior entry.
  fn set(&self, key: K, value: V);

  /// Returns the live value for `key`, refreshing its last access time.
  ///
  /// An entry found expired is deleted as a side effect of the read and
  /// reported as a miss.
  fn get(&self, key: &K) -> Option<V>;

  /// Deletes the entry for `key`; no-op if absent.
  fn remove(&self, key: &K);

  /// Deletes every entry in this tier.
  fn clear(&self);

  /// Scans the whole tier and deletes every currently-expired entry.
  /// Entries with [`ExpirationPolicy::Never`](crate::ExpirationPolicy::Never)
  /// are never swept.
  fn sweep_expired(&self);
}
