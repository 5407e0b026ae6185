//! Integration tests for Layer 3: Engine
//!
//! Tests for the documented scenarios, firing guarantees under concurrency,
//! failure handling, store interaction, and rule definition loading.

mod failures;
mod scenarios;
mod stores;
