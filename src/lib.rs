//! Kindle - Concurrent forward-chaining rule engine
//!
//! This crate re-exports all layers of the Kindle system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: kindle_engine     - Rules, agenda, worker pool, quiescence
//! Layer 2: kindle_store      - Fact stores (memory, expiring)
//! Layer 1: kindle_expr       - Guard/value expressions, functions, cache
//! Layer 0: kindle_foundation - Core types (Value, Type, Error)
//! ```

pub use kindle_engine as engine;
pub use kindle_expr as expr;
pub use kindle_foundation as foundation;
pub use kindle_store as store;

pub use kindle_engine::{Engine, EngineConfig, Rule, RuleBook, RunOutcome};
pub use kindle_foundation::{Error, ErrorKind, Result, Value};
