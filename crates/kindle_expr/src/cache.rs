//! Bounded cache of compiled expressions.
//!
//! Entries are keyed by the BLAKE3 hash of the expression source, so rules
//! with identical guard or value text share one compiled form. The cache is
//! an ordinary object: an engine owns one, or several engines share one the
//! caller passes in. Nothing is process-global.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use kindle_foundation::Result;

use crate::{ExprHash, Expression};

/// Default number of compiled expressions retained.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Counters describing cache effectiveness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that compiled the source.
    pub misses: u64,
    /// Entries dropped to respect the capacity.
    pub evictions: u64,
    /// Entries currently cached.
    pub len: usize,
}

#[derive(Default)]
struct Entries {
    by_hash: HashMap<ExprHash, Arc<Expression>>,
    /// Insertion order; the front is evicted first.
    order: VecDeque<ExprHash>,
}

/// Bounded, thread-safe cache of compiled expressions.
pub struct ExpressionCache {
    capacity: usize,
    entries: Mutex<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ExpressionCache {
    /// Creates a cache holding at most `capacity` expressions.
    ///
    /// A capacity of zero disables caching; every lookup compiles.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the compiled form of `source`, compiling it on a miss.
    ///
    /// Compilation happens outside the cache lock. Failed compilations are
    /// not cached.
    ///
    /// # Errors
    /// Returns the parse error if `source` does not compile.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Expression>> {
        let hash = ExprHash::of(source);
        if let Some(found) = self.entries.lock().by_hash.get(&hash) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(found));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = Arc::new(Expression::compile(source)?);
        if self.capacity == 0 {
            return Ok(compiled);
        }

        let mut entries = self.entries.lock();
        if let Some(raced) = entries.by_hash.get(&hash) {
            return Ok(Arc::clone(raced));
        }
        while entries.order.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.by_hash.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(expression = %oldest, "evicted compiled expression");
        }
        entries.order.push_back(hash);
        entries.by_hash.insert(hash, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Returns true if `source` is currently cached.
    #[must_use]
    pub fn contains(&self, source: &str) -> bool {
        self.entries
            .lock()
            .by_hash
            .contains_key(&ExprHash::of(source))
    }

    /// Returns the number of cached expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().by_hash.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached expression. Counters are kept.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.by_hash.clear();
        entries.order.clear();
    }

    /// Returns a snapshot of the cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
