//! Fact store capability and backends for Kindle.
//!
//! This crate provides:
//! - [`FactStore`] - The working-memory contract the engine schedules against
//! - [`MemoryStore`] - Unbounded, non-expiring store (the default)
//! - [`ExpiringStore`] - Capacity and TTL bounded store with eviction pins
//! - [`StoreConfig`] - Construction-time choice between the two
//!
//! A fact is present only when a lookup succeeds. Expired or evicted facts
//! are absent, never "present by error".

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod expiring;
pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use kindle_foundation::{Result, Value};

pub use expiring::ExpiringStore;
pub use memory::MemoryStore;

/// Working memory: the current value of every known fact.
///
/// Implementations are internally synchronized; every method takes `&self`
/// and may be called from many workers at once. Errors returned here are
/// backend failures and abort the run that hit them.
pub trait FactStore: Send + Sync {
    /// Binds `name` to `value`, replacing any previous value.
    ///
    /// # Errors
    /// Returns a store error if the backend cannot hold the value.
    fn set(&self, name: &str, value: Value) -> Result<()>;

    /// Returns the value bound to `name`, or `None` if absent.
    ///
    /// # Errors
    /// Returns a store error if the backend cannot produce the value.
    fn get(&self, name: &str) -> Result<Option<Value>>;

    /// Returns true if `name` is currently bound.
    ///
    /// # Errors
    /// Returns a store error if the backend lookup fails.
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)?.is_some())
    }

    /// Returns every live fact, sorted by name.
    ///
    /// # Errors
    /// Returns a store error if any value cannot be read back.
    fn snapshot(&self) -> Result<BTreeMap<String, Value>>;

    /// Returns the number of stored facts (including any not yet expired
    /// on read).
    fn len(&self) -> usize;

    /// Returns true if no facts are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exempts `name` from eviction and expiry until [`FactStore::unpin_all`].
    ///
    /// Stores that never evict ignore this.
    fn pin(&self, _name: &str) {}

    /// Releases every pin.
    fn unpin_all(&self) {}
}

/// Which fact store a run uses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Unbounded, non-expiring map.
    #[default]
    Memory,
    /// Bounded store with optional time-to-live.
    Expiring {
        /// Maximum number of facts held.
        capacity: usize,
        /// Facts older than this read as absent.
        ttl: Option<Duration>,
        /// Pin every fact a rule depends on for the duration of a run.
        ///
        /// Turning this off lets a pending rule's input be evicted before
        /// the rule reads it, so the rule silently never fires.
        protect_pending: bool,
    },
}

impl StoreConfig {
    /// Creates an expiring configuration that protects pending inputs.
    #[must_use]
    pub fn expiring(capacity: usize, ttl: Option<Duration>) -> Self {
        Self::Expiring {
            capacity,
            ttl,
            protect_pending: true,
        }
    }

    /// Returns true if the engine should pin rule inputs.
    #[must_use]
    pub fn protects_pending(&self) -> bool {
        match self {
            Self::Memory => false,
            Self::Expiring {
                protect_pending, ..
            } => *protect_pending,
        }
    }

    /// Builds a fresh, empty store.
    #[must_use]
    pub fn build(&self) -> Arc<dyn FactStore> {
        match self {
            Self::Memory => Arc::new(MemoryStore::new()),
            Self::Expiring { capacity, ttl, .. } => Arc::new(ExpiringStore::new(*capacity, *ttl)),
        }
    }
}
