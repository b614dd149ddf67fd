use ahash::RandomState;
use generational_arena::{Arena, Index};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
struct Node<K, V> {
  key: K,
  value: V,
  next: Option<Index>,
  prev: Option<Index>,
}

// The recency list plus its index, mutated as one unit under the store's
// mutex. Arena indices stand in for node pointers, so link surgery never
// touches ownership.
#[derive(Debug)]
struct LruInner<K: Eq + Hash + Clone, V> {
  nodes: Arena<Node<K, V>>,
  // O(1) lookup of a key to its node index in the arena.
  lookup: HashMap<K, Index, RandomState>,
  // Head is the most-recently-used item.
  head: Option<Index>,
  // Tail is the least-recently-used item.
  tail: Option<Index>,
}

impl<K: Eq + Hash + Clone, V> LruInner<K, V> {
  fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::default(),
      head: None,
      tail: None,
    }
  }

  // Detach a node from the list without removing it from the arena or map.
  fn unlink(&mut self, index: Index) {
    let node = &self.nodes[index];
    let prev_idx = node.prev;
    let next_idx = node.next;

    if let Some(prev) = prev_idx {
      self.nodes[prev].next = next_idx;
    } else {
      self.head = next_idx;
    }

    if let Some(next) = next_idx {
      self.nodes[next].prev = prev_idx;
    } else {
      self.tail = prev_idx;
    }
  }

  // Link an already-allocated node in as the new head.
  fn push_front_node(&mut self, index: Index) {
    let old_head = self.head;
    self.nodes[index].next = old_head;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old_head) = old_head {
      self.nodes[old_head].prev = Some(index);
    }

    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  fn move_to_front(&mut self, index: Index) {
    if self.head != Some(index) {
      self.unlink(index);
      self.push_front_node(index);
    }
  }

  fn remove(&mut self, key: &K) -> Option<V> {
    let index = self.lookup.remove(key)?;
    self.unlink(index);
    let node = self.nodes.remove(index)?;
    Some(node.value)
  }

  fn pop_back(&mut self) -> Option<(K, V)> {
    let tail_index = self.tail?;
    let key = self.nodes[tail_index].key.clone();
    let value = self.remove(&key)?;
    Some((key, value))
  }
}

/// A fixed-capacity associative store with least-recently-used eviction.
///
/// Lookup is a hash index into an arena of doubly linked nodes; `set`,
/// `get`, and `remove` are all O(1). Both `set` and a successful `get`
/// count as a use and move the entry to the most-recently-used position.
/// Once `capacity` entries are held, inserting a new key evicts the
/// least-recently-used one. A capacity of zero retains nothing.
///
/// The store is internally synchronized with a single mutex, so direct
/// concurrent calls are safe in isolation; tiers additionally wrap it in
/// their own reader/writer lock, which is the ordering callers rely on.
#[derive(Debug)]
pub struct LruStore<K: Eq + Hash + Clone, V> {
  capacity: usize,
  inner: Mutex<LruInner<K, V>>,
}

impl<K: Eq + Hash + Clone, V> LruStore<K, V> {
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity,
      inner: Mutex::new(LruInner::new()),
    }
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Inserts or replaces the value for `key` and marks it most recently
  /// used. Evicts from the tail if the store would exceed its capacity.
  pub fn set(&self, key: K, value: V) {
    let mut inner = self.inner.lock();

    if let Some(&index) = inner.lookup.get(&key) {
      inner.nodes[index].value = value;
      inner.move_to_front(index);
      return;
    }

    let node = Node {
      key: key.clone(),
      value,
      next: None,
      prev: None,
    };
    let index = inner.nodes.insert(node);
    inner.lookup.insert(key, index);
    inner.push_front_node(index);

    while inner.lookup.len() > self.capacity {
      inner.pop_back();
    }
  }

  /// Returns a copy of the value for `key`, marking it most recently used.
  /// An absent key is a normal miss, not an error.
  pub fn get(&self, key: &K) -> Option<V>
  where
    V: Clone,
  {
    let mut inner = self.inner.lock();
    let index = *inner.lookup.get(key)?;
    inner.move_to_front(index);
    Some(inner.nodes[index].value.clone())
  }

  /// Detaches and drops the entry for `key`, if present.
  pub fn remove(&self, key: &K) {
    self.inner.lock().remove(key);
  }

  /// Drops every entry and resets the recency list.
  pub fn clear(&self) {
    let mut inner = self.inner.lock();
    inner.nodes.clear();
    inner.lookup.clear();
    inner.head = None;
    inner.tail = None;
  }

  /// A snapshot of the currently stored keys, in no particular order.
  /// Not stable across operations made outside the caller's own locking.
  pub fn keys(&self) -> Vec<K> {
    self.inner.lock().lookup.keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.inner.lock().lookup.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  // A helper for tests, to get the order of keys from head to tail.
  #[cfg(test)]
  pub(crate) fn keys_by_recency(&self) -> Vec<K> {
    let inner = self.inner.lock();
    let mut keys = Vec::new();
    let mut current = inner.head;
    while let Some(index) = current {
      keys.push(inner.nodes[index].key.clone());
      current = inner.nodes[index].next;
    }
    keys
  }

  // List length and index size must always agree.
  #[cfg(test)]
  pub(crate) fn is_consistent(&self) -> bool {
    let list_len = self.keys_by_recency().len();
    let inner = self.inner.lock();
    list_len == inner.lookup.len() && inner.nodes.len() == inner.lookup.len()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn new_store_is_empty() {
    let store = LruStore::<i32, i32>::new(4);
    assert!(store.is_empty());
    assert!(store.keys().is_empty());
    assert_eq!(store.get(&1), None);
  }

  #[test]
  fn set_and_get_single_item() {
    let store = LruStore::new(4);
    store.set("a", 1);
    assert_eq!(store.get(&"a"), Some(1));
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn newest_item_is_at_the_front() {
    let store = LruStore::new(4);
    store.set(1, "one");
    store.set(2, "two");
    store.set(3, "three");
    assert_eq!(store.keys_by_recency(), vec![3, 2, 1]);
  }

  #[test]
  fn set_existing_key_updates_value_and_moves_to_front() {
    let store = LruStore::new(4);
    store.set(1, "one");
    store.set(2, "two");
    store.set(1, "uno");

    assert_eq!(store.keys_by_recency(), vec![1, 2]);
    assert_eq!(store.get(&1), Some("uno"));
    assert_eq!(store.len(), 2);
  }

  #[test]
  fn get_counts_as_a_use() {
    let store = LruStore::new(3);
    store.set(1, ());
    store.set(2, ());
    store.set(3, ());

    store.get(&1);
    assert_eq!(store.keys_by_recency(), vec![1, 3, 2]);

    // 2 is now the LRU entry and should be the eviction victim.
    store.set(4, ());
    assert_eq!(store.get(&2), None);
    assert_eq!(store.keys_by_recency(), vec![4, 1, 3]);
  }

  #[test]
  fn eviction_removes_least_recently_used() {
    let store = LruStore::new(2);
    store.set(1, ());
    store.set(2, ());
    store.set(3, ());

    assert_eq!(store.len(), 2);
    assert_eq!(store.get(&1), None, "oldest entry should be evicted");
    assert!(store.get(&2).is_some());
    assert!(store.get(&3).is_some());
    assert!(store.is_consistent());
  }

  #[test]
  fn count_never_exceeds_capacity() {
    let store = LruStore::new(3);
    for i in 0..100 {
      store.set(i, i);
      assert!(store.len() <= 3);
      assert!(store.is_consistent());
    }
    // The three most recently used keys survive.
    let mut keys = store.keys();
    keys.sort();
    assert_eq!(keys, vec![97, 98, 99]);
  }

  #[test]
  fn zero_capacity_retains_nothing() {
    let store = LruStore::new(0);
    store.set(1, "one");
    assert_eq!(store.get(&1), None);
    assert!(store.is_empty());
    assert!(store.is_consistent());
  }

  #[test]
  fn remove_detaches_from_middle() {
    let store = LruStore::new(4);
    store.set(1, ());
    store.set(2, ());
    store.set(3, ());

    store.remove(&2);
    assert_eq!(store.keys_by_recency(), vec![3, 1]);
    assert_eq!(store.get(&2), None);
    assert!(store.is_consistent());
  }

  #[test]
  fn remove_absent_key_is_a_noop() {
    let store = LruStore::new(4);
    store.set(1, ());
    store.remove(&99);
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn clear_resets_store() {
    let store = LruStore::new(4);
    store.set(1, ());
    store.set(2, ());

    store.clear();
    assert!(store.is_empty());
    assert!(store.keys_by_recency().is_empty());
    assert!(store.is_consistent());

    // The store remains usable after a clear.
    store.set(3, ());
    assert!(store.get(&3).is_some());
  }
}
