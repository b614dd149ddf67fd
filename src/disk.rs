use crate::codec::{Codec, JsonCodec};
use crate::error::StorageError;
use crate::item::{ExpirationPolicy, ExpiringItem};
use crate::lock::{QueueRwLock, ReadWriteLock};
use crate::tier::CacheTier;
use crate::ticker::{ThreadTicker, TickHandle, Ticker};
use crate::time::{Clock, SystemClock};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::fs;

/// Narrow filesystem shim used by the persisted tier.
///
/// One stored blob per cache key. The backend is assumed to give at least
/// path-level atomicity for individual blob reads and writes; cross-key
/// ordering comes from the owning tier's lock, not from the backend.
pub trait StorageBackend: Send + Sync {
  fn exists(&self, path: &Path) -> bool;

  /// Creates a container (directory) at `path`, with intermediate
  /// containers when `recursive` is set.
  fn create_container(&self, path: &Path, recursive: bool) -> Result<(), StorageError>;

  /// Names of the entries directly inside the container at `path`.
  fn list_entries(&self, path: &Path) -> Result<Vec<String>, StorageError>;

  /// Deletes the blob or container at `path`. Deleting a missing path
  /// fails, but callers treat that specific failure as a no-op.
  fn delete(&self, path: &Path) -> Result<(), StorageError>;

  /// Writes `bytes` to `path`, replacing any prior content. Returns false
  /// on failure instead of raising.
  fn write(&self, path: &Path, bytes: &[u8]) -> bool;

  /// Reads the blob at `path`; `None` if absent or unreadable.
  fn read(&self, path: &Path) -> Option<Vec<u8>>;
}

/// The production backend, straight onto `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsBackend;

impl FsBackend {
  pub fn new() -> Self {
    Self
  }
}

impl StorageBackend for FsBackend {
  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }

  fn create_container(&self, path: &Path, recursive: bool) -> Result<(), StorageError> {
    if recursive {
      fs::create_dir_all(path)?;
    } else {
      fs::create_dir(path)?;
    }
    Ok(())
  }

  fn list_entries(&self, path: &Path) -> Result<Vec<String>, StorageError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
      let entry = entry?;
      names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
  }

  fn delete(&self, path: &Path) -> Result<(), StorageError> {
    let meta = fs::metadata(path)?;
    if meta.is_dir() {
      fs::remove_dir_all(path)?;
    } else {
      fs::remove_file(path)?;
    }
    Ok(())
  }

  fn write(&self, path: &Path, bytes: &[u8]) -> bool {
    fs::write(path, bytes).is_ok()
  }

  fn read(&self, path: &Path) -> Option<Vec<u8>> {
    fs::read(path).ok()
  }
}

/// Configuration for a [`DiskTier`].
#[derive(Debug, Clone)]
pub struct DiskConfig {
  /// Directory holding one file per cached key.
  pub directory: PathBuf,
  /// Expiration policy stamped onto every entry written to this tier.
  pub policy: ExpirationPolicy,
  /// Interval between automatic expiration sweeps. `None` or zero means
  /// a single sweep at construction and none after.
  pub cleanup_interval: Option<Duration>,
}

impl DiskConfig {
  pub fn new(directory: impl Into<PathBuf>, policy: ExpirationPolicy) -> Self {
    Self {
      directory: directory.into(),
      policy,
      cleanup_interval: None,
    }
  }

  pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
    self.cleanup_interval = Some(interval);
    self
  }
}

/// A persisted cache tier: one codec-serialized blob per key on a
/// [`StorageBackend`].
///
/// Blob names are the percent-encoded `Display` form of the key, so any
/// displayable key maps to a single flat entry inside the cache directory,
/// including keys containing path separators.
///
/// Every miss-shaped failure — missing blob, unreadable blob, undecodable
/// bytes — is absorbed as `None`, and a failed write leaves the prior entry
/// state untouched. The cache directory is created when absent.
pub struct DiskTier<K, V, L = QueueRwLock> {
  directory: PathBuf,
  policy: ExpirationPolicy,
  backend: Arc<dyn StorageBackend>,
  codec: Arc<dyn Codec<V>>,
  clock: Arc<dyn Clock>,
  lock: L,
  sweeper: Mutex<Option<TickHandle>>,
  _key: PhantomData<fn(K) -> K>,
}

impl<K, V> DiskTier<K, V>
where
  K: Display + Send + Sync + 'static,
  V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
  /// Builds a tier with the production backend, JSON codec, clock, ticker,
  /// and queue lock.
  pub fn new(config: DiskConfig) -> Arc<Self> {
    Self::with_parts(
      config,
      Arc::new(FsBackend::new()),
      Arc::new(JsonCodec::new()),
      Arc::new(SystemClock),
      &ThreadTicker::new(),
      QueueRwLock::new(),
    )
  }
}

impl<K, V, L> DiskTier<K, V, L>
where
  K: Display + Send + Sync + 'static,
  V: Send + Sync + 'static,
  L: ReadWriteLock + 'static,
{
  /// Builds a tier from injected collaborators, for alternate backends,
  /// codecs, or deterministic tests.
  pub fn with_parts(
    config: DiskConfig,
    backend: Arc<dyn StorageBackend>,
    codec: Arc<dyn Codec<V>>,
    clock: Arc<dyn Clock>,
    ticker: &dyn Ticker,
    lock: L,
  ) -> Arc<Self> {
    let tier = Arc::new(Self {
      directory: config.directory,
      policy: config.policy,
      backend,
      codec,
      clock,
      lock,
      sweeper: Mutex::new(None),
      _key: PhantomData,
    });

    tier.lock.write(|| tier.ensure_container());
    Self::start_sweeper(&tier, config.cleanup_interval, ticker);
    tier
  }

  // Filenames are the percent-encoded key, so separators and traversal
  // sequences cannot reach outside the cache directory. Bare "." and ".."
  // survive percent-encoding as path components, so their dots are escaped
  // as well.
  fn file_path(&self, key: &K) -> PathBuf {
    let encoded = urlencoding::encode(&key.to_string()).into_owned();
    let name = match encoded.as_str() {
      "." | ".." => encoded.replace('.', "%2E"),
      _ => encoded,
    };
    self.directory.join(name)
  }

  fn ensure_container(&self) {
    if self.backend.exists(&self.directory) {
      return;
    }
    if let Err(err) = self.backend.create_container(&self.directory, true) {
      tracing::warn!(
        directory = %self.directory.display(),
        %err,
        "failed to create cache directory"
      );
    }
  }

  fn start_sweeper(tier: &Arc<Self>, interval: Option<Duration>, ticker: &dyn Ticker) {
    match interval {
      Some(interval) if interval > Duration::ZERO => {
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

impl<K, V, L> CacheTier<K, V> for DiskTier<K, V, L>
where
  K: Display + Send + Sync + 'static,
  V: Send + Sync + 'static,
  L: ReadWriteLock + 'static,
{
  fn set(&self, key: K, value: V) {
    let item = ExpiringItem::new(value, self.policy, self.clock.now());
    let path = self.file_path(&key);

    self.lock.write(|| {
      self.ensure_container();
      let Some(bytes) = self.codec.encode(&item) else {
        tracing::warn!(path = %path.display(), "entry failed to encode; not stored");
        return;
      };
      if !self.backend.write(&path, &bytes) {
        tracing::warn!(path = %path.display(), "entry write failed; not stored");
      }
    });
  }

  fn get(&self, key: &K) -> Option<V> {
    let path = self.file_path(key);

    self.lock.read(|| {
      let bytes = self.backend.read(&path)?;
      let mut item = self.codec.decode(&bytes)?;

      if item.is_expired(self.clock.now()) {
        let _ = self.backend.delete(&path);
        return None;
      }

      item.touch(self.clock.now());
      // Persist the refreshed access time back to the blob. A failure here
      // only loses the refresh, never the entry.
      if let Some(bytes) = self.codec.encode(&item) {
        let _ = self.backend.write(&path, &bytes);
      }
      Some(item.into_value())
    })
  }

  fn remove(&self, key: &K) {
    let path = self.file_path(key);
    self.lock.write(|| {
      // A missing blob is not an error worth surfacing.
      let _ = self.backend.delete(&path);
    });
  }

  fn clear(&self) {
    self.lock.write(|| {
      let _ = self.backend.delete(&self.directory);
      self.ensure_container();
    });
  }

  fn sweep_expired(&self) {
    self.lock.write(|| {
      let names = match self.backend.list_entries(&self.directory) {
        Ok(names) => names,
        Err(err) => {
          tracing::warn!(%err, "disk tier sweep could not list entries");
          return;
        }
      };

      let now = self.clock.now();
      let mut removed = 0usize;

      for name in names {
        let path = self.directory.join(&name);

        // Unreadable or undecodable blobs are dead weight; sweep them too.
        let live = self
          .backend
          .read(&path)
          .and_then(|bytes| self.codec.decode(&bytes))
          .map_or(false, |item: ExpiringItem<V>| !item.is_expired(now));

        if !live {
          let _ = self.backend.delete(&path);
          removed += 1;
        }
      }

      if removed > 0 {
        tracing::debug!(removed, "disk tier sweep removed entries");
      }
    });
  }
}
