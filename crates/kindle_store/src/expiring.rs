//! Bounded fact store with optional time-to-live.
//!
//! Values are held MessagePack-encoded, the way a networked cache would
//! hold them, so encode and decode failures surface as store errors.
//! When the store is full, the oldest unpinned fact is evicted. A fact older
//! than the TTL reads as absent and is dropped on the next access.
//!
//! Pinned facts are never evicted or expired. The engine pins the inputs of
//! every rule at the start of a run so that a rule's inputs cannot disappear
//! between the moment they are written and the moment the rule reads them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use kindle_foundation::{Error, Result, StoreFailure, Value};

use crate::FactStore;

// =============================================================================
// Entries
// =============================================================================

struct Entry {
    bytes: Vec<u8>,
    written: Instant,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Write sequence to fact name; the first key is the oldest write.
    order: BTreeMap<u64, String>,
    pinned: HashSet<String>,
    next_seq: u64,
}

impl Inner {
    fn is_expired(&self, name: &str, entry: &Entry, ttl: Option<Duration>, now: Instant) -> bool {
        match ttl {
            Some(ttl) => !self.pinned.contains(name) && now.duration_since(entry.written) >= ttl,
            None => false,
        }
    }

    fn remove(&mut self, name: &str) -> Option<Entry> {
        let entry = self.entries.remove(name)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    /// Drops every expired, unpinned entry. Returns how many were dropped.
    fn purge_expired(&mut self, ttl: Option<Duration>, now: Instant) -> usize {
        if ttl.is_none() {
            return 0;
        }
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(name, entry)| self.is_expired(name, entry, ttl, now))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &expired {
            self.remove(name);
        }
        expired.len()
    }

    /// Evicts the oldest unpinned entry.
    fn evict_oldest(&mut self) -> Option<String> {
        let victim = self
            .order
            .values()
            .find(|name| !self.pinned.contains(*name))
            .cloned()?;
        self.remove(&victim);
        Some(victim)
    }
}

// =============================================================================
// ExpiringStore
// =============================================================================

/// Capacity-bounded store with optional TTL and eviction pins.
pub struct ExpiringStore {
    capacity: usize,
    ttl: Option<Duration>,
    inner: Mutex<Inner>,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl ExpiringStore {
    /// Creates a store holding at most `capacity` facts.
    #[must_use]
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity,
            ttl,
            inner: Mutex::new(Inner::default()),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Returns how many facts were evicted to make room.
    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Returns how many facts were dropped for exceeding the TTL.
    #[must_use]
    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// Returns true if `name` is pinned.
    #[must_use]
    pub fn is_pinned(&self, name: &str) -> bool {
        self.inner.lock().pinned.contains(name)
    }

    fn encode(name: &str, value: &Value) -> Result<Vec<u8>> {
        rmp_serde::to_vec(value)
            .map_err(|e| Error::store(StoreFailure::Encode(format!("{name}: {e}"))))
    }

    fn decode(name: &str, bytes: &[u8]) -> Result<Value> {
        rmp_serde::from_slice(bytes)
            .map_err(|e| Error::store(StoreFailure::Decode(format!("{name}: {e}"))))
    }
}

impl FactStore for ExpiringStore {
    fn set(&self, name: &str, value: Value) -> Result<()> {
        let bytes = Self::encode(name, &value)?;
        let now = Instant::now();
        let mut inner = self.inner.lock();

        // An overwrite reuses its own slot; a new fact needs room first, so a
        // failed write leaves every existing value in place.
        if inner.remove(name).is_none() {
            if inner.entries.len() >= self.capacity {
                let expired = inner.purge_expired(self.ttl, now);
                self.expirations.fetch_add(expired as u64, Ordering::Relaxed);
            }
            while inner.entries.len() >= self.capacity {
                let Some(victim) = inner.evict_oldest() else {
                    return Err(Error::store(StoreFailure::CapacityExhausted {
                        capacity: self.capacity,
                        fact: name.to_string(),
                    }));
                };
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(fact = %victim, capacity = self.capacity, "evicted fact");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, name.to_string());
        inner.entries.insert(
            name.to_string(),
            Entry {
                bytes,
                written: now,
                seq,
            },
        );
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Value>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(name) {
            None => return Ok(None),
            Some(entry) => inner.is_expired(name, entry, self.ttl, now),
        };
        if expired {
            inner.remove(name);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(fact = %name, "fact expired");
            return Ok(None);
        }
        match inner.entries.get(name) {
            Some(entry) => Self::decode(name, &entry.bytes).map(Some),
            None => Ok(None),
        }
    }

    fn snapshot(&self) -> Result<BTreeMap<String, Value>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let expired = inner.purge_expired(self.ttl, now);
        self.expirations.fetch_add(expired as u64, Ordering::Relaxed);
        inner
            .entries
            .iter()
            .map(|(name, entry)| Ok((name.clone(), Self::decode(name, &entry.bytes)?)))
            .collect()
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn pin(&self, name: &str) {
        self.inner.lock().pinned.insert(name.to_string());
    }

    fn unpin_all(&self) {
        self.inner.lock().pinned.clear();
    }
}

impl std::fmt::Debug for ExpiringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .field("evictions", &self.evictions())
            .finish_non_exhaustive()
    }
}
