//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, Type, Error, and serialized forms.

mod errors;
mod serde_forms;
mod values;
