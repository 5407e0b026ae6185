//! Dependency-driven rule scheduling for Kindle.
//!
//! This crate provides:
//! - [`Rule`], [`RuleSet`], [`RuleBook`] - Rule model and definition loading
//! - [`DependencyIndex`] - Fact name to the rules waiting on it
//! - [`DispatchQueue`] - Bounded queue feeding the workers
//! - [`Quiescence`] - Outstanding-work termination detector
//! - [`Engine`] - Runs rules over facts to a fixed point
//!
//! A run copies the initial facts into a fresh store, offers each one to
//! the agenda, and lets a fixed pool of workers fire every rule whose
//! inputs are all present and whose guard holds. Each rule fires at most
//! once per run. The run ends when no dispatched work is outstanding.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod agenda;
pub mod config;
pub mod engine;
pub mod index;
pub mod outcome;
mod pool;
pub mod queue;
pub mod quiescence;
pub mod rule;

pub use config::{DEFAULT_QUEUE_MULTIPLIER, DEFAULT_TERMINAL_FACT, DEFAULT_WORKERS, EngineConfig};
pub use engine::Engine;
pub use index::DependencyIndex;
pub use outcome::{Firing, FiringStatus, RunOutcome, RunStats};
pub use queue::{DispatchQueue, PushError};
pub use quiescence::{Quiescence, Settled};
pub use rule::{CompiledRule, Producer, Rule, RuleBook, RuleBuilder, RuleDef, RuleId, RuleSet};
