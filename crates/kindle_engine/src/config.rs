//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use kindle_expr::DEFAULT_CACHE_CAPACITY;
use kindle_store::StoreConfig;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 4;

/// Default queue slots per worker.
pub const DEFAULT_QUEUE_MULTIPLIER: usize = 10;

/// Default name of the fact `run()` returns.
pub const DEFAULT_TERMINAL_FACT: &str = "result_end";

/// Settings for an [`Engine`](crate::Engine).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Dispatch queue capacity is `workers * queue_multiplier`.
    pub queue_multiplier: usize,
    /// Fact whose value `run()` returns.
    pub terminal_fact: String,
    /// Fail the run if any rule expression does not compile.
    pub strict: bool,
    /// Abort the run if it has not reached quiescence by then.
    pub timeout: Option<Duration>,
    /// Capacity of the engine-owned expression cache.
    pub cache_capacity: usize,
    /// Which fact store each run uses.
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_multiplier: DEFAULT_QUEUE_MULTIPLIER,
            terminal_fact: DEFAULT_TERMINAL_FACT.to_string(),
            strict: false,
            timeout: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            store: StoreConfig::Memory,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker count (at least 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets the queue slots per worker (at least 1).
    #[must_use]
    pub fn with_queue_multiplier(mut self, multiplier: usize) -> Self {
        self.queue_multiplier = multiplier.max(1);
        self
    }

    /// Sets the terminal fact name.
    #[must_use]
    pub fn with_terminal_fact(mut self, name: impl Into<String>) -> Self {
        self.terminal_fact = name.into();
        self
    }

    /// Enables or disables strict compilation.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the run deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the expression cache capacity.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the fact store.
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Worker count after clamping.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    /// Dispatch queue capacity after clamping.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.worker_count()
            .saturating_mul(self.queue_multiplier.max(1))
    }
}
