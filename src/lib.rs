//! A pluggable, concurrent, tiered caching engine.
//!
//! # Features
//! - **Expiring entries**: per-tier expiration policies (never, since
//!   creation, since last access) with access-time refresh.
//! - **In-memory LRU tier**: fixed capacity, O(1) operations backed by an
//!   arena-allocated recency list.
//! - **On-disk tier**: one file per key, serialized through a pluggable
//!   codec; corrupt or unreadable entries degrade to cache misses.
//! - **Multi-level composition**: ordered tiers with read-through,
//!   write-through, and promotion of lower-tier hits.
//! - **Pluggable locking**: queue-style and recursive reader/writer locks,
//!   injectable per tier.
//! - **Deterministic testing**: injectable clock, storage backend, codec,
//!   and sweep ticker.

// Public modules that form the API
pub mod codec;
pub mod disk;
pub mod error;
pub mod item;
pub mod lock;
pub mod lru;
pub mod memory;
pub mod multi;
pub mod tier;
pub mod ticker;
pub mod time;

// Re-export the primary user-facing types for convenience
pub use codec::{Codec, JsonCodec};
pub use disk::{DiskConfig, DiskTier, FsBackend, StorageBackend};
pub use error::StorageError;
pub use item::{ExpirationPolicy, ExpiringItem};
pub use lock::{NoopLock, QueueRwLock, ReadWriteLock, RecursiveRwLock};
pub use lru::LruStore;
pub use memory::{MemoryConfig, MemoryTier};
pub use multi::MultiLevelCache;
pub use tier::CacheTier;
pub use ticker::{ThreadTicker, TickHandle, Ticker};
pub use time::{Clock, ManualClock, SystemClock};
