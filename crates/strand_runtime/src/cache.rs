//! Process-wide memo table for pure node results.
//!
//! Least-recently-used eviction over a slab of entries threaded on an
//! intrusive doubly linked list. Slots are keyed by the 64-bit fingerprint
//! digest; the full fingerprint is kept in the entry and checked on read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use strand_core::{FastHashMap, Value, fast_map_with_capacity};
use tracing::debug;

use crate::errors::CacheInconsistency;
use crate::fingerprint::Fingerprint;

const NIL: usize = usize::MAX;

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub value: Value,
    pub hits: u64,
    /// Insertion sequence number; lower is older.
    pub created: u64,
}

/// Result of a cache read.
#[derive(Debug)]
pub enum Lookup {
    Hit(Value),
    Miss,
    /// The slot belongs to another fingerprint; evaluate uncached.
    Bypass(CacheInconsistency),
}

struct Slot {
    digest: u64,
    entry: CacheEntry,
    prev: usize,
    next: usize,
}

struct Lru {
    map: FastHashMap<u64, usize>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    /// Most recently used.
    head: usize,
    /// Least recently used.
    tail: usize,
    capacity: usize,
    next_seq: u64,
}

impl Lru {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            map: fast_map_with_capacity(capacity.min(1024)),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
            next_seq: 0,
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }
        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn evict_lru(&mut self) -> Option<(Fingerprint, u64)> {
        let idx = self.tail;
        if idx == NIL {
            return None;
        }
        self.unlink(idx);
        let digest = self.slots[idx].digest;
        self.map.remove(&digest);
        self.free.push(idx);
        let entry = &self.slots[idx].entry;
        Some((entry.fingerprint.clone(), entry.hits))
    }

    fn get(&mut self, key: &Fingerprint) -> Lookup {
        let digest = key.digest();
        let Some(&idx) = self.map.get(&digest) else {
            return Lookup::Miss;
        };
        let found = &self.slots[idx].entry.fingerprint;
        if found != key {
            return Lookup::Bypass(CacheInconsistency {
                digest,
                expected: key.clone(),
                found: found.clone(),
            });
        }
        self.touch(idx);
        let entry = &mut self.slots[idx].entry;
        entry.hits += 1;
        Lookup::Hit(entry.value.clone())
    }

    fn put(&mut self, key: Fingerprint, value: Value) {
        let digest = key.digest();
        let seq = self.next_seq;
        self.next_seq += 1;
        let entry = CacheEntry {
            fingerprint: key,
            value,
            hits: 0,
            created: seq,
        };
        if let Some(&idx) = self.map.get(&digest) {
            self.slots[idx].entry = entry;
            self.touch(idx);
            return;
        }
        while self.len() >= self.capacity {
            if let Some((evicted, hits)) = self.evict_lru() {
                debug!(target: "strand::cache", %evicted, hits, "evicted entry");
            } else {
                break;
            }
        }
        let slot = Slot {
            digest,
            entry,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        self.map.insert(digest, idx);
        self.push_front(idx);
    }

    fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }
}

/// Bounded, thread-safe result cache shared by every execution of a runtime.
pub struct ExecutionCache {
    inner: Mutex<Lru>,
    generation: AtomicU64,
}

impl ExecutionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru::new(capacity)),
            generation: AtomicU64::new(0),
        }
    }

    // Entries are plain values; a panic elsewhere cannot leave one half-written.
    fn lru(&self) -> MutexGuard<'_, Lru> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lookup(&self, key: &Fingerprint) -> Lookup {
        self.lru().get(key)
    }

    pub fn get(&self, key: &Fingerprint) -> Option<Value> {
        match self.lookup(key) {
            Lookup::Hit(v) => Some(v),
            Lookup::Miss | Lookup::Bypass(_) => None,
        }
    }

    pub fn put(&self, key: Fingerprint, value: Value) {
        self.lru().put(key, value);
    }

    /// Store `value` only if no `invalidate_all` happened since `generation`
    /// was read. Returns whether the value was stored.
    pub fn put_if_current(&self, key: Fingerprint, value: Value, generation: u64) -> bool {
        let mut lru = self.lru();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        lru.put(key, value);
        true
    }

    /// Drop every entry. Called when shared state the fingerprints cannot
    /// observe has changed.
    pub fn invalidate_all(&self) {
        let mut lru = self.lru();
        let dropped = lru.len();
        lru.clear();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(target: "strand::cache", dropped, generation, "cache invalidated");
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn resize(&self, capacity: usize) {
        let mut lru = self.lru();
        lru.capacity = capacity.max(1);
        while lru.len() > lru.capacity {
            lru.evict_lru();
        }
    }

    pub fn len(&self) -> usize {
        self.lru().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lru().capacity
    }

    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.entry(key).is_some()
    }

    /// Copy of the entry for `key`, without affecting recency.
    pub fn entry(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let lru = self.lru();
        let idx = *lru.map.get(&key.digest())?;
        let entry = &lru.slots[idx].entry;
        (entry.fingerprint == *key).then(|| entry.clone())
    }

    pub fn hits(&self, key: &Fingerprint) -> Option<u64> {
        self.entry(key).map(|e| e.hits)
    }

    #[cfg(test)]
    pub(crate) fn plant(&self, digest: u64, entry: CacheEntry) {
        let mut lru = self.lru();
        let idx = lru.slots.len();
        lru.slots.push(Slot {
            digest,
            entry,
            prev: NIL,
            next: NIL,
        });
        lru.map.insert(digest, idx);
        lru.push_front(idx);
    }
}
