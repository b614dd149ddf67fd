use parking_lot::lock_api::RawRwLock as RawRwLockApi;
use parking_lot::{Mutex, RawRwLock, RwLock};
use std::collections::HashMap;
use std::thread::{self, ThreadId};

/// The reader/writer locking strategy shared by every cache tier.
///
/// `read` runs `block` with concurrent-read semantics and returns its
/// result; `write` runs `block` exclusively. On every implementation in
/// this crate `write` is synchronous: the block has completed by the time
/// the call returns.
pub trait ReadWriteLock: Send + Sync {
  fn read<T>(&self, block: impl FnOnce() -> Option<T>) -> Option<T>;
  fn write(&self, block: impl FnOnce());
}

/// A queue-style reader/writer lock.
///
/// Reads run concurrently with other reads; a write waits for all
/// outstanding reads and writes to drain, then runs exclusively. Not
/// reentrant: calling `write` from inside a `read` block on the same lock
/// deadlocks. Tiers that never nest lock acquisitions (every concrete tier
/// in this crate) can use it as their default.
#[derive(Debug, Default)]
pub struct QueueRwLock {
  inner: RwLock<()>,
}

impl QueueRwLock {
  pub fn new() -> Self {
    Self::default()
  }
}

impl ReadWriteLock for QueueRwLock {
  fn read<T>(&self, block: impl FnOnce() -> Option<T>) -> Option<T> {
    let _guard = self.inner.read();
    block()
  }

  fn write(&self, block: impl FnOnce()) {
    let _guard = self.inner.write();
    block();
  }
}

#[derive(Debug, Default)]
struct ThreadHolds {
  reads: HashMap<ThreadId, usize>,
  writes: HashMap<ThreadId, usize>,
}

/// A reader/writer lock that permits same-thread, same-mode reentry.
///
/// Per-thread hold counts live under a short internal mutex, distinct from
/// the native reader/writer primitive: a thread that already holds a read
/// lock re-enters by bumping its count without touching the primitive, and
/// only the outermost unlock releases it. Write holds mirror this for
/// exclusive mode.
///
/// Recursion protects same-mode reentry only. A thread holding a read lock
/// that then asks for the write lock still deadlocks at the primitive, as
/// with any reader/writer lock.
///
/// Unlocking without a matching lock is caller misuse and panics rather
/// than corrupting the hold counts.
pub struct RecursiveRwLock {
  raw: RawRwLock,
  holds: Mutex<ThreadHolds>,
}

impl Default for RecursiveRwLock {
  fn default() -> Self {
    Self::new()
  }
}

impl RecursiveRwLock {
  pub fn new() -> Self {
    Self {
      raw: RawRwLock::INIT,
      holds: Mutex::new(ThreadHolds::default()),
    }
  }

  /// Acquires the lock in read mode, reentrant for the calling thread.
  pub fn read_lock(&self) {
    let thread = thread::current().id();

    {
      let mut holds = self.holds.lock();
      if let Some(count) = holds.reads.get_mut(&thread) {
        // Already a reader on this thread; no primitive acquisition.
        *count += 1;
        return;
      }
    }

    // First read hold for this thread. The holds mutex must not be held
    // across this call, or a blocked reader would stall every other thread.
    self.raw.lock_shared();

    self.holds.lock().reads.insert(thread, 1);
  }

  /// Releases one read hold; the primitive is released when the calling
  /// thread's count reaches zero.
  ///
  /// # Panics
  /// Panics if the calling thread holds no read lock.
  pub fn read_unlock(&self) {
    let thread = thread::current().id();
    let mut holds = self.holds.lock();

    match holds.reads.get_mut(&thread) {
      Some(count) if *count > 1 => {
        *count -= 1;
      }
      Some(_) => {
        holds.reads.remove(&thread);
        drop(holds);
        // SAFETY: this thread's count just reached zero, so it owns exactly
        // one outstanding shared acquisition of `raw`.
        unsafe { self.raw.unlock_shared() };
      }
      None => {
        drop(holds);
        panic!("attempted to release a read lock that was not held");
      }
    }
  }

  /// Acquires the lock in write mode, reentrant for the calling thread.
  pub fn write_lock(&self) {
    let thread = thread::current().id();

    {
      let mut holds = self.holds.lock();
      if let Some(count) = holds.writes.get_mut(&thread) {
        *count += 1;
        return;
      }
    }

    self.raw.lock_exclusive();

    self.holds.lock().writes.insert(thread, 1);
  }

  /// Releases one write hold; the primitive is released when the calling
  /// thread's count reaches zero.
  ///
  /// # Panics
  /// Panics if the calling thread holds no write lock.
  pub fn write_unlock(&self) {
    let thread = thread::current().id();
    let mut holds = self.holds.lock();

    match holds.writes.get_mut(&thread) {
      Some(count) if *count > 1 => {
        *count -= 1;
      }
      Some(_) => {
        holds.writes.remove(&thread);
        drop(holds);
        // SAFETY: this thread's count just reached zero, so it owns the
        // single outstanding exclusive acquisition of `raw`.
        unsafe { self.raw.unlock_exclusive() };
      }
      None => {
        drop(holds);
        panic!("attempted to release a write lock that was not held");
      }
    }
  }
}

// Unlock-on-drop guards so a panicking block still releases its hold;
// leaking the acquisition would wedge the lock for every other thread.
struct ReadHoldGuard<'a>(&'a RecursiveRwLock);

impl Drop for ReadHoldGuard<'_> {
  fn drop(&mut self) {
    self.0.read_unlock();
  }
}

struct WriteHoldGuard<'a>(&'a RecursiveRwLock);

impl Drop for WriteHoldGuard<'_> {
  fn drop(&mut self) {
    self.0.write_unlock();
  }
}

impl ReadWriteLock for RecursiveRwLock {
  fn read<T>(&self, block: impl FnOnce() -> Option<T>) -> Option<T> {
    self.read_lock();
    let _guard = ReadHoldGuard(self);
    block()
  }

  fn write(&self, block: impl FnOnce()) {
    self.write_lock();
    let _guard = WriteHoldGuard(self);
    block();
  }
}

/// Runs blocks with no synchronization at all.
///
/// Only valid where single-threaded access is known, e.g. tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLock;

impl ReadWriteLock for NoopLock {
  fn read<T>(&self, block: impl FnOnce() -> Option<T>) -> Option<T> {
    block()
  }

  fn write(&self, block: impl FnOnce()) {
    block();
  }
}
