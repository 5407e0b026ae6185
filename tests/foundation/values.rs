//! Integration tests for Value and Type
//!
//! Tests truthiness, conversions, equality, ordering and display.

use std::collections::HashSet;
use std::sync::Arc;

use kindle_foundation::{FactList, FactMap, Type, Value};
use proptest::prelude::*;

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn from_primitives() {
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(7i32), Value::Int(7));
    assert_eq!(Value::from(7i64), Value::Int(7));
    assert_eq!(Value::from(0.5), Value::Float(0.5));
    assert_eq!(Value::from("hi").as_str(), Some("hi"));
    assert_eq!(Value::from(String::from("hi")).as_str(), Some("hi"));
}

#[test]
fn from_option_maps_none_to_nil() {
    assert_eq!(Value::from(None::<i64>), Value::Nil);
    assert_eq!(Value::from(Some(3i64)), Value::Int(3));
}

#[test]
fn from_vec_builds_list() {
    let list = Value::from(vec![1i64, 2, 3]);
    assert_eq!(list.value_type(), Type::List);
    assert_eq!(list.as_list().map(FactList::len), Some(3));
}

// =============================================================================
// Truthiness and Types
// =============================================================================

#[test]
fn only_nil_and_false_are_falsy() {
    assert!(!Value::Nil.is_truthy());
    assert!(!Value::Bool(false).is_truthy());
    assert!(Value::Int(0).is_truthy());
    assert!(Value::from("").is_truthy());
}

#[test]
fn numeric_type_acceptance() {
    assert!(Type::Number.accepts(&Type::Int));
    assert!(Type::Number.accepts(&Type::Float));
    assert!(Type::Float.accepts(&Type::Int));
    assert!(!Type::Int.accepts(&Type::Float));
    assert!(Type::Any.accepts(&Type::Map));
    assert!(!Type::String.accepts(&Type::Nil));
}

// =============================================================================
// Equality, Ordering, Display
// =============================================================================

#[test]
fn int_and_float_are_distinct_values() {
    assert_ne!(Value::Int(1), Value::Float(1.0));
    let set: HashSet<Value> = [Value::Int(1), Value::Float(1.0)].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn cross_numeric_ordering() {
    assert!(Value::Int(1) < Value::Float(1.5));
    assert!(Value::Float(2.5) > Value::Int(2));
    assert_eq!(Value::Int(1).partial_cmp(&Value::from("a")), None);
}

#[test]
fn display_nested() {
    let map: FactMap = [(Arc::<str>::from("k"), Value::Int(1))].into_iter().collect();
    let value = Value::from(vec![Value::Int(1), Value::Map(map)]);
    assert_eq!(value.to_string(), "[1, {k: 1}]");
}

proptest! {
    #[test]
    fn int_equality_matches_i64(a in any::<i64>(), b in any::<i64>()) {
        prop_assert_eq!(Value::Int(a) == Value::Int(b), a == b);
        prop_assert_eq!(Value::Int(a).partial_cmp(&Value::Int(b)), Some(a.cmp(&b)));
    }

    #[test]
    fn strings_display_verbatim(s in "[a-z ]{0,16}") {
        prop_assert_eq!(Value::from(s.as_str()).to_string(), s);
    }
}
