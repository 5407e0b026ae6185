//! Unbounded in-memory fact store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use kindle_foundation::{Result, Value};

use crate::FactStore;

/// Plain map of fact name to value behind a reader-writer lock.
///
/// Never evicts and never fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    facts: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `facts`.
    #[must_use]
    pub fn with_facts<I, K>(facts: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            facts: RwLock::new(facts.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl FactStore for MemoryStore {
    fn set(&self, name: &str, value: Value) -> Result<()> {
        self.facts.write().insert(name.to_string(), value);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.facts.read().get(name).cloned())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.facts.read().contains_key(name))
    }

    fn snapshot(&self) -> Result<BTreeMap<String, Value>> {
        Ok(self
            .facts
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn len(&self) -> usize {
        self.facts.read().len()
    }
}
