//! Integration tests for Layer 2: Fact Stores
//!
//! Tests for the memory and expiring stores behind the `FactStore` trait.

mod expiring;
