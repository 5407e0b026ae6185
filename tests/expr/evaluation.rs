//! Integration tests for expression evaluation

use std::collections::HashMap;

use kindle_expr::{Expression, FunctionRegistry, NoBindings};
use kindle_foundation::{Error, ErrorKind, Result, Value};
use proptest::prelude::*;

fn facts(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn eval(source: &str, bindings: &HashMap<String, Value>) -> Result<Value> {
    Expression::compile(source)?.evaluate(bindings, &FunctionRegistry::with_builtins())
}

// =============================================================================
// Guards
// =============================================================================

#[test]
fn positive_guard() {
    let bindings = facts(&[("a", Value::Int(2)), ("b", Value::Int(3))]);
    let guard = Expression::compile("a > 0 && b > 0").unwrap();
    assert!(guard.evaluate_bool(&bindings, &FunctionRegistry::new()).unwrap());

    let bindings = facts(&[("a", Value::Int(-1)), ("b", Value::Int(3))]);
    assert!(!guard.evaluate_bool(&bindings, &FunctionRegistry::new()).unwrap());
}

#[test]
fn short_circuit_skips_unbound_rhs() {
    let bindings = facts(&[("a", Value::Int(-1))]);
    assert_eq!(eval("a > 0 && missing > 0", &bindings).unwrap(), Value::Bool(false));
    assert_eq!(eval("a < 0 || missing > 0", &bindings).unwrap(), Value::Bool(true));
}

#[test]
fn non_boolean_guard_is_type_mismatch() {
    let guard = Expression::compile("1 + 1").unwrap();
    let err = guard.evaluate_bool(&NoBindings, &FunctionRegistry::new()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
}

// =============================================================================
// Values
// =============================================================================

#[test]
fn arithmetic_and_strings() {
    let bindings = facts(&[("a", Value::Int(3)), ("name", Value::from("kin"))]);
    assert_eq!(eval("a * 2 + 1", &bindings).unwrap(), Value::Int(7));
    assert_eq!(eval("a / 2", &bindings).unwrap(), Value::Int(1));
    assert_eq!(eval("a / 2.0", &bindings).unwrap(), Value::Float(1.5));
    assert_eq!(eval("a % 2", &bindings).unwrap(), Value::Int(1));
    assert_eq!(eval("-a", &bindings).unwrap(), Value::Int(-3));
    assert_eq!(eval("name + 'dle'", &bindings).unwrap(), Value::from("kindle"));
    assert_eq!(eval("a == 3.0", &bindings).unwrap(), Value::Bool(true));
}

#[test]
fn arithmetic_failures_are_rule_local() {
    let bindings = facts(&[("a", Value::Int(i64::MAX))]);
    let div = eval("a / 0", &bindings).unwrap_err();
    let over = eval("a + 1", &bindings).unwrap_err();
    assert!(matches!(div.kind, ErrorKind::DivisionByZero));
    assert!(matches!(over.kind, ErrorKind::Overflow));
    assert!(!div.is_fatal());
    assert!(!over.is_fatal());
}

#[test]
fn unbound_identifier_is_undefined_symbol() {
    let err = eval("a + 1", &facts(&[])).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UndefinedSymbol(ref name) if name == "a"));
}

// =============================================================================
// Functions
// =============================================================================

#[test]
fn builtins_are_callable() {
    let bindings = facts(&[("xs", Value::from(vec![1i64, 2, 3])), ("n", Value::Int(-4))]);
    assert_eq!(eval("len(xs)", &bindings).unwrap(), Value::Int(3));
    assert_eq!(eval("abs(n)", &bindings).unwrap(), Value::Int(4));
    assert_eq!(eval("max(n, 2, 1)", &bindings).unwrap(), Value::Int(2));
    assert_eq!(eval("coalesce(nil, n)", &bindings).unwrap(), Value::Int(-4));
}

#[test]
fn custom_functions_extend_registry() {
    let mut functions = FunctionRegistry::with_builtins();
    functions.register("double", |args: &[Value]| match args {
        [Value::Int(n)] => Ok(Value::Int(n * 2)),
        _ => Err(Error::arity_mismatch("1 int", args.len())),
    });
    let expr = Expression::compile("double(a) + 1").unwrap();
    let bindings = facts(&[("a", Value::Int(20))]);
    assert_eq!(expr.evaluate(&bindings, &functions).unwrap(), Value::Int(41));
}

#[test]
fn unknown_function_is_reported() {
    let err = eval("nope(1)", &facts(&[])).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownFunction(_)));
}

proptest! {
    #[test]
    fn addition_matches_checked_add(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let bindings = facts(&[("a", Value::Int(a)), ("b", Value::Int(b))]);
        prop_assert_eq!(eval("a + b", &bindings).unwrap(), Value::Int(a + b));
    }

    #[test]
    fn comparison_matches_i64(a in any::<i64>(), b in any::<i64>()) {
        let bindings = facts(&[("a", Value::Int(a)), ("b", Value::Int(b))]);
        prop_assert_eq!(eval("a < b", &bindings).unwrap(), Value::Bool(a < b));
    }
}
