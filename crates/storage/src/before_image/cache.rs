//! Bounded FIFO cache of recently read before-images
//!
//! An optional accelerator: callers always fall back to the authoritative
//! store on a miss. The map and the insertion-order queue are updated
//! separately, without a lock spanning both, so a reader may briefly miss
//! an entry that a concurrent eviction is removing.
//!
//! # Eviction
//!
//! Strict FIFO by insertion order. When the count after an insert exceeds
//! `max_size`, the oldest keys are evicted until the count is back within
//! capacity. `put` of a present key is a no-op (first writer wins).

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

/// Bounded FIFO cache safe for concurrent readers and writers
#[derive(Debug)]
pub struct BeforeImageEntryCache<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V>,
    order: Mutex<VecDeque<K>>,
    size: AtomicUsize,
    max_size: usize,
}

impl<K, V> BeforeImageEntryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `max_size` entries
    pub fn new(max_size: usize) -> Self {
        Self {
            map: DashMap::with_capacity(max_size),
            order: Mutex::new(VecDeque::with_capacity(max_size)),
            size: AtomicUsize::new(0),
            max_size,
        }
    }

    /// Capacity
    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Current entry count
    #[inline]
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// True when nothing is cached
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value for `key`
    pub fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).map(|v| v.value().clone())
    }

    /// Whether `key` is cached
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert unless present, then evict down to capacity
    pub fn put(&self, key: K, value: V) {
        match self.map.entry(key.clone()) {
            Entry::Occupied(_) => return,
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
        self.order.lock().push_back(key);
        let size = self.size.fetch_add(1, Ordering::AcqRel) + 1;
        if size > self.max_size {
            self.evict();
        }
    }

    fn evict(&self) {
        while self.size.load(Ordering::Acquire) > self.max_size {
            let oldest = self.order.lock().pop_front();
            match oldest {
                Some(key) => {
                    if self.map.remove(&key).is_some() {
                        self.size.fetch_sub(1, Ordering::AcqRel);
                    }
                }
                // a concurrent put has not queued its key yet
                None => break,
            }
        }
    }
}
