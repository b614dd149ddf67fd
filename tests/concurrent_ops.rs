mod common;

use common::RecordingTicker;
use strata_cache::{
  CacheTier, DiskConfig, DiskTier, ExpirationPolicy, FsBackend, JsonCodec, ManualClock,
  MemoryConfig, MemoryTier, MultiLevelCache, QueueRwLock,
};

use std::sync::{Arc, Barrier};
use std::thread;

const NUM_THREADS: usize = 16;

fn memory_tier(clock: &ManualClock) -> Arc<MemoryTier<String, String>> {
  MemoryTier::with_parts(
    MemoryConfig::new(1024, ExpirationPolicy::Never),
    Arc::new(clock.clone()),
    &RecordingTicker::new(),
    QueueRwLock::new(),
  )
}

#[test]
fn concurrent_distinct_sets_on_memory_tier() {
  let clock = ManualClock::default();
  let tier = memory_tier(&clock);
  let barrier = Arc::new(Barrier::new(NUM_THREADS));
  let mut handles = vec![];

  for i in 0..NUM_THREADS {
    let tier = tier.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      tier.set(format!("key{}", i), format!("value{}", i));
    }));
  }

  for handle in handles {
    handle.join().unwrap();
  }

  assert_eq!(tier.len(), NUM_THREADS);
  for i in 0..NUM_THREADS {
    assert_eq!(
      tier.get(&format!("key{}", i)),
      Some(format!("value{}", i)),
      "every key must be independently retrievable"
    );
  }
}

#[test]
fn concurrent_readers_and_writers_on_memory_tier() {
  let clock = ManualClock::default();
  let tier = memory_tier(&clock);
  tier.set("shared".to_string(), "constant".to_string());

  let barrier = Arc::new(Barrier::new(NUM_THREADS));
  let mut handles = vec![];

  for i in 0..NUM_THREADS {
    let tier = tier.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      for round in 0..50 {
        if i % 2 == 0 {
          tier.set(format!("key{}", i), format!("value{}-{}", i, round));
        } else {
          // Readers interleave with writers; a hit must always carry the
          // unchanging value.
          if let Some(value) = tier.get(&"shared".to_string()) {
            assert_eq!(value, "constant");
          }
        }
      }
    }));
  }

  for handle in handles {
    handle.join().unwrap();
  }

  assert_eq!(tier.get(&"shared".to_string()), Some("constant".to_string()));
}

#[test]
fn concurrent_distinct_sets_on_disk_tier() {
  let dir = tempfile::tempdir().unwrap();
  let clock = ManualClock::default();
  let tier: Arc<DiskTier<String, String>> = DiskTier::with_parts(
    DiskConfig::new(dir.path(), ExpirationPolicy::Never),
    Arc::new(FsBackend::new()),
    Arc::new(JsonCodec::new()),
    Arc::new(clock.clone()),
    &RecordingTicker::new(),
    QueueRwLock::new(),
  );

  let barrier = Arc::new(Barrier::new(NUM_THREADS));
  let mut handles = vec![];

  for i in 0..NUM_THREADS {
    let tier = tier.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      tier.set(format!("key{}", i), format!("value{}", i));
    }));
  }

  for handle in handles {
    handle.join().unwrap();
  }

  for i in 0..NUM_THREADS {
    assert_eq!(
      tier.get(&format!("key{}", i)),
      Some(format!("value{}", i))
    );
  }
  assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), NUM_THREADS);
}

#[test]
fn concurrent_distinct_sets_through_the_composite() {
  let clock = ManualClock::default();
  let top = memory_tier(&clock);
  let bottom = memory_tier(&clock);
  let cache = Arc::new(MultiLevelCache::new(vec![
    top.clone() as Arc<dyn CacheTier<String, String>>,
    bottom.clone() as Arc<dyn CacheTier<String, String>>,
  ]));

  let barrier = Arc::new(Barrier::new(NUM_THREADS));
  let mut handles = vec![];

  for i in 0..NUM_THREADS {
    let cache = cache.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      cache.set(format!("key{}", i), format!("value{}", i));
    }));
  }

  for handle in handles {
    handle.join().unwrap();
  }

  // Write-through means both member tiers hold all keys.
  assert_eq!(top.len(), NUM_THREADS);
  assert_eq!(bottom.len(), NUM_THREADS);
  for i in 0..NUM_THREADS {
    assert_eq!(
      cache.get(&format!("key{}", i)),
      Some(format!("value{}", i))
    );
  }
}

#[test]
fn concurrent_promoting_reads_do_not_deadlock() {
  let clock = ManualClock::default();
  let top = memory_tier(&clock);
  let bottom = memory_tier(&clock);
  let cache = Arc::new(MultiLevelCache::new(vec![
    top.clone() as Arc<dyn CacheTier<String, String>>,
    bottom.clone() as Arc<dyn CacheTier<String, String>>,
  ]));

  // Present only in the bottom tier, so every early read wants to promote.
  bottom.set("hot".to_string(), "value".to_string());

  let barrier = Arc::new(Barrier::new(NUM_THREADS));
  let mut handles = vec![];

  for _ in 0..NUM_THREADS {
    let cache = cache.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      for _ in 0..20 {
        assert_eq!(cache.get(&"hot".to_string()), Some("value".to_string()));
      }
    }));
  }

  for handle in handles {
    handle.join().unwrap();
  }

  assert_eq!(top.get(&"hot".to_string()), Some("value".to_string()));
}
