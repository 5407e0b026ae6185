//! Runs over the expiring store

use std::time::Duration;

use kindle_engine::{Engine, EngineConfig, Rule};
use kindle_foundation::{ErrorKind, StoreFailure, Value};
use kindle_store::StoreConfig;

use crate::support::{init_tracing, rule};

/// `b` copies `a`; `c` needs both, so `a` must survive the write of `b`.
fn hazard_rules() -> Vec<Rule> {
    vec![
        Rule::builder("b")
            .with_inputs(["a"])
            .with_passthrough("a")
            .build()
            .unwrap(),
        rule("c", &["a", "b"], "", "a + b"),
    ]
}

fn engine_with(store: StoreConfig) -> Engine {
    init_tracing();
    let mut engine = Engine::new(EngineConfig::new().with_workers(2).with_store(store));
    engine.set_facts([("a", Value::Int(1))]);
    engine.set_rules(hazard_rules());
    engine
}

#[test]
fn unprotected_eviction_loses_pending_input() {
    let store = StoreConfig::Expiring {
        capacity: 1,
        ttl: None,
        protect_pending: false,
    };
    let outcome = engine_with(store).run_detailed().unwrap();
    assert_eq!(outcome.fact("b"), Some(&Value::Int(1)));
    assert_eq!(outcome.fact("a"), None);
    assert_eq!(outcome.fact("c"), None);
}

#[test]
fn protected_inputs_survive_eviction_pressure() {
    let outcome = engine_with(StoreConfig::expiring(3, None))
        .run_detailed()
        .unwrap();
    assert_eq!(outcome.fact("c"), Some(&Value::Int(2)));
    assert_eq!(outcome.stats.completed, 2);
}

#[test]
fn protected_inputs_ignore_ttl() {
    let outcome = engine_with(StoreConfig::expiring(8, Some(Duration::ZERO)))
        .run_detailed()
        .unwrap();
    assert_eq!(outcome.stats.completed, 2);
    assert_eq!(outcome.fact("a"), Some(&Value::Int(1)));
    assert_eq!(outcome.fact("b"), Some(&Value::Int(1)));
    // Nothing pins `c`, so it has already expired.
    assert_eq!(outcome.fact("c"), None);
}

#[test]
fn exhausted_capacity_is_fatal() {
    let err = engine_with(StoreConfig::expiring(2, None))
        .run_detailed()
        .unwrap_err();
    assert!(err.is_fatal());
    match err.kind {
        ErrorKind::Store(StoreFailure::CapacityExhausted { capacity, fact }) => {
            assert_eq!(capacity, 2);
            assert_eq!(fact, "c");
        }
        other => panic!("expected capacity failure, got {other:?}"),
    }
}

#[test]
fn compound_values_round_trip_through_encoded_store() {
    let mut engine = Engine::new(EngineConfig::new().with_store(StoreConfig::expiring(16, None)));
    engine.set_facts([("items", Value::from(vec![Value::Int(3), Value::Int(9)]))]);
    engine.set_rules([Rule::builder("copy")
        .with_inputs(["items"])
        .with_passthrough("items")
        .build()
        .unwrap()]);
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("copy"), outcome.fact("items"));
}
