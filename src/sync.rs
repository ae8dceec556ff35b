//! Concurrency utilities for the catalog search.

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::{AHashMap, RandomState};
use core::hash::{BuildHasher, Hash, Hasher};
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;

/// A concurrent hash map broken over many shards so several worker threads
/// can fill it without contending on one lock.
///
/// Values are handed out by clone, which keeps the lock-hold window tiny;
/// callers store `Arc`s when values are large. Lookups that race with an
/// insert of the same key may both compute the value, and the second
/// insert wins; that is fine for the memoization this map exists for,
/// where recomputation always produces the same value.
pub struct ShardedMap<K, V> {
    shards: Vec<Mutex<AHashMap<K, V>>>,
    hasher: RandomState,
}

impl<K: Hash + Eq, V: Clone> ShardedMap<K, V> {
    pub fn new() -> ShardedMap<K, V> {
        let count = (num_cpus::get() * 4).next_power_of_two();

        let mut shards = Vec::with_capacity(count);
        shards.resize_with(count, || Mutex::new(AHashMap::new()));

        ShardedMap {
            shards,
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, key: &K) -> &Mutex<AHashMap<K, V>> {
        let mut state = self.hasher.build_hasher();
        key.hash(&mut state);

        let mask = self.shards.len() as u64 - 1;
        &self.shards[(state.finish() & mask) as usize]
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).lock().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.shard(&key).lock().insert(key, value)
    }
}

/// A counter striped across cores, so rayon workers can bump it without
/// bouncing one cache line between them.
pub struct Counter(Vec<CachePadded<AtomicU64>>);

impl Counter {
    pub fn zero() -> Counter {
        let mut vec = Vec::new();
        vec.resize_with(num_cpus::get(), || CachePadded::new(AtomicU64::new(0)));

        Counter(vec)
    }

    pub fn get(&self) -> u64 {
        self.0
            .iter()
            .map(|atomic| atomic.load(Ordering::Relaxed))
            .sum()
    }

    pub fn increment(&self) {
        let idx = rayon::current_thread_index().unwrap_or(0);
        self.0[idx % self.0.len()].fetch_add(1, Ordering::Relaxed);
    }
}
