//! Integration tests for the capacity and TTL bounded store

use std::time::Duration;

use kindle_foundation::{ErrorKind, StoreFailure, Value};
use kindle_store::{ExpiringStore, FactStore, StoreConfig};

#[test]
fn eviction_makes_a_fact_absent() {
    let store = ExpiringStore::new(1, None);
    store.set("a", Value::Int(1)).unwrap();
    store.set("b", Value::Int(2)).unwrap();
    assert!(!store.exists("a").unwrap());
    assert_eq!(store.get("a").unwrap(), None);
    assert_eq!(store.evictions(), 1);
}

#[test]
fn pins_protect_until_released() {
    let store = ExpiringStore::new(2, Some(Duration::ZERO));
    store.pin("a");
    store.set("a", Value::Int(1)).unwrap();
    assert_eq!(store.get("a").unwrap(), Some(Value::Int(1)));

    store.unpin_all();
    assert_eq!(store.get("a").unwrap(), None);
}

#[test]
fn fully_pinned_store_reports_capacity() {
    let store = StoreConfig::expiring(2, None).build();
    store.pin("a");
    store.pin("b");
    store.set("a", Value::Int(1)).unwrap();
    store.set("b", Value::Int(2)).unwrap();
    let err = store.set("c", Value::Int(3)).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::Store(StoreFailure::CapacityExhausted { ref fact, .. }) if fact == "c"
    ));
}

#[test]
fn compound_values_round_trip_through_encoding() {
    let store = ExpiringStore::new(4, None);
    let value = Value::from(vec![Value::from("x"), Value::Float(0.25), Value::Nil]);
    store.set("list", value.clone()).unwrap();
    assert_eq!(store.get("list").unwrap(), Some(value));
}

#[test]
fn config_round_trips_through_json() {
    let config = StoreConfig::Expiring {
        capacity: 16,
        ttl: Some(Duration::from_secs(30)),
        protect_pending: false,
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: StoreConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert!(!back.protects_pending());
}
