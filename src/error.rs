use thiserror::Error;

/// Errors surfaced by a [`StorageBackend`](crate::disk::StorageBackend).
///
/// Cache misses are never errors: an absent, expired, or undecodable entry
/// is reported as `None` by the owning tier. Only backend I/O failures are
/// represented here, and the tiers absorb them as silent no-ops so that the
/// cache always fails open.
#[derive(Debug, Error)]
pub enum StorageError {
  /// The underlying I/O operation failed (permissions, disk error, ...).
  #[error("storage i/o failure: {0}")]
  Io(#[from] std::io::Error),
}
