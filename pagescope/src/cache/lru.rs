use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::stats::{AtomicCacheStats, CacheStats};

const NIL: usize = usize::MAX;

/// A fixed-capacity cache with least-recently-used eviction.
///
/// Entries live in a slab of nodes linked into a recency list, with a hash
/// index from keys to slots, so `get` and `put` are O(1). The whole structure
/// is guarded by one lock; `get` re-splices the entry under the same lock that
/// guards `put`.
pub struct LruCache<K, V> {
    inner: Mutex<LruInner<K, V>>,
    stats: AtomicCacheStats,
}

struct LruInner<K, V> {
    capacity: usize,
    table: FxHashMap<K, usize>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    // Most recently used.
    head: usize,
    // Least recently used.
    tail: usize,
}

struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        Self {
            inner: Mutex::new(LruInner {
                capacity,
                table: FxHashMap::default(),
                nodes: Vec::new(),
                free: Vec::new(),
                head: NIL,
                tail: NIL,
            }),
            stats: AtomicCacheStats::default(),
        }
    }

    /// Returns a clone of the value and marks the entry most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        match inner.table.get(key).copied() {
            Some(slot) => {
                inner.unlink(slot);
                inner.push_front(slot);
                self.stats.lookup_hit.inc();
                Some(inner.node(slot).value.clone())
            }
            None => {
                self.stats.lookup_miss.inc();
                None
            }
        }
    }

    /// Returns a clone of the value without touching its recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        let inner = self.inner.lock();
        let slot = *inner.table.get(key)?;
        Some(inner.node(slot).value.clone())
    }

    /// Returns true if the cache holds `key`, without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().table.contains_key(key)
    }

    /// Inserts or replaces the entry and marks it most recently used.
    ///
    /// If the cache then holds more than `capacity` keys, the least recently
    /// used entry is dropped.
    pub fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        self.stats.insert.inc();
        if let Some(slot) = inner.table.get(&key).copied() {
            inner.node_mut(slot).value = value;
            inner.unlink(slot);
            inner.push_front(slot);
            return;
        }

        let node = Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };
        let slot = match inner.free.pop() {
            Some(slot) => {
                inner.nodes[slot] = Some(node);
                slot
            }
            None => {
                inner.nodes.push(Some(node));
                inner.nodes.len() - 1
            }
        };
        inner.push_front(slot);
        inner.table.insert(key, slot);

        if inner.table.len() > inner.capacity {
            inner.evict_tail();
            self.stats.evict.inc();
        }
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.table.clear();
        inner.nodes.clear();
        inner.free.clear();
        inner.head = NIL;
        inner.tail = NIL;
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().table.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

impl<K, V> LruInner<K, V>
where
    K: Hash + Eq,
{
    fn node(&self, slot: usize) -> &Node<K, V> {
        self.nodes[slot].as_ref().expect("linked slot is occupied")
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<K, V> {
        self.nodes[slot].as_mut().expect("linked slot is occupied")
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node(slot);
            (node.prev, node.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }
        let node = self.node_mut(slot);
        node.prev = NIL;
        node.next = NIL;
    }

    fn push_front(&mut self, slot: usize) {
        let head = self.head;
        {
            let node = self.node_mut(slot);
            node.prev = NIL;
            node.next = head;
        }
        if head == NIL {
            self.tail = slot;
        } else {
            self.node_mut(head).prev = slot;
        }
        self.head = slot;
    }

    fn evict_tail(&mut self) {
        let slot = self.tail;
        assert_ne!(slot, NIL);
        self.unlink(slot);
        if let Some(node) = self.nodes[slot].take() {
            self.table.remove(&node.key);
        }
        self.free.push(slot);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use quickcheck::quickcheck;

    use super::*;

    #[test]
    fn evict_first_inserted() {
        const C: u64 = 4;
        let c = LruCache::new(C as usize);
        for k in 0..=C {
            c.put(k, vec![k]);
        }
        assert_eq!(c.len(), C as usize);
        assert!(!c.contains(&0));
        for k in 1..=C {
            assert_eq!(c.get(&k), Some(vec![k]));
        }
        assert_eq!(c.stats().evict, 1);
    }

    #[test]
    fn get_promotes() {
        const C: u64 = 3;
        let c = LruCache::new(C as usize);
        for k in 0..C {
            c.put(k, k);
        }
        // Key 0 is now the most recently used.
        assert_eq!(c.get(&0), Some(0));

        // Each new key evicts the stalest remaining one, 0 goes last.
        c.put(10, 10);
        assert!(!c.contains(&1));
        assert!(c.contains(&0));
        c.put(11, 11);
        assert!(!c.contains(&2));
        assert!(c.contains(&0));
        c.put(12, 12);
        assert!(!c.contains(&0));
        assert_eq!(c.len(), C as usize);
    }

    #[test]
    fn peek_does_not_promote() {
        let c = LruCache::new(2);
        c.put(1, "a");
        c.put(2, "b");
        assert_eq!(c.peek(&1), Some("a"));
        c.put(3, "c");
        assert!(!c.contains(&1));
        assert_eq!(c.peek(&9), None);
    }

    #[test]
    fn replace_existing() {
        let c = LruCache::new(2);
        c.put(1, 1);
        c.put(2, 2);
        c.put(1, 100);
        assert_eq!(c.len(), 2);
        c.put(3, 3);
        assert_eq!(c.get(&1), Some(100));
        assert!(!c.contains(&2));

        let stats = c.stats();
        assert_eq!(stats.insert, 4);
        assert_eq!(stats.evict, 1);
        assert_eq!(stats.lookup_hit, 1);
    }

    #[test]
    fn miss_has_no_side_effects() {
        let c = LruCache::new(1);
        assert_eq!(c.get(&1u32), None::<u32>);
        assert!(c.is_empty());
        assert_eq!(c.stats().lookup_miss, 1);
    }

    #[test]
    fn clear() {
        let c = LruCache::new(2);
        c.put(1, 1);
        c.put(2, 2);
        c.clear();
        assert!(c.is_empty());
        c.put(3, 3);
        c.put(4, 4);
        c.put(5, 5);
        assert_eq!(c.len(), 2);
        assert_eq!(c.capacity(), 2);
    }

    #[test]
    #[should_panic]
    fn zero_capacity() {
        let _ = LruCache::<u64, u64>::new(0);
    }

    #[test]
    fn concurrent_access() {
        let c = Arc::new(LruCache::new(16));
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let c = c.clone();
                thread::spawn(move || {
                    for i in 0..1000u64 {
                        let k = (t * 1000 + i) % 64;
                        c.put(k, k);
                        if let Some(v) = c.get(&k) {
                            assert_eq!(v, k);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(c.len(), 16);
    }

    // Replays random operations against a plain recency vector.
    quickcheck! {
        fn matches_model(capacity: u8, ops: Vec<(bool, u8)>) -> bool {
            let capacity = capacity as usize % 8 + 1;
            let c = LruCache::new(capacity);
            // Front is the least recently used.
            let mut model: Vec<(u8, u8)> = Vec::new();
            for (is_put, key) in ops {
                let key = key % 16;
                if is_put {
                    c.put(key, key);
                    model.retain(|(k, _)| *k != key);
                    model.push((key, key));
                    if model.len() > capacity {
                        model.remove(0);
                    }
                } else {
                    let expect = model.iter().position(|(k, _)| *k == key).map(|i| {
                        let entry = model.remove(i);
                        model.push(entry);
                        entry.1
                    });
                    if c.get(&key) != expect {
                        return false;
                    }
                }
            }
            c.len() == model.len() && model.iter().all(|(k, _)| c.contains(k))
        }
    }
}
