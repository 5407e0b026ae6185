//! Integration tests for Error types
//!
//! Tests error construction, display, context, and fatal classification.

use std::time::Duration;

use kindle_foundation::{Error, ErrorContext, ErrorKind, StoreFailure, Type};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_type_mismatch() {
    let err = Error::type_mismatch(Type::Bool, Type::Int);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    let msg = format!("{err}");
    assert!(msg.contains("bool"));
    assert!(msg.contains("int"));
}

#[test]
fn error_undefined_symbol() {
    let err = Error::undefined_symbol("limit");
    assert!(matches!(err.kind, ErrorKind::UndefinedSymbol(_)));
    assert!(err.to_string().contains("limit"));
}

#[test]
fn error_parse_position() {
    let err = Error::parse("expected expression", 1, 4, "a >");
    assert!(err.is_parse_error());
    assert!(err.to_string().contains("1:4"));
}

#[test]
fn error_timeout() {
    let err = Error::timeout(Duration::from_millis(250));
    assert!(matches!(err.kind, ErrorKind::Timeout(d) if d == Duration::from_millis(250)));
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn context_display_joins_parts() {
    let ctx = ErrorContext::new()
        .with_rule("a1b2")
        .with_fact("sum")
        .with_expression("a + b");
    assert_eq!(ctx.to_string(), "in rule a1b2, fact sum, expression `a + b`");
}

#[test]
fn in_rule_adds_to_existing_context() {
    let err = Error::new(ErrorKind::DivisionByZero)
        .with_context(ErrorContext::new().with_expression("a / 0"))
        .in_rule("ffee");
    let ctx = err.context.unwrap();
    assert_eq!(ctx.rule.as_deref(), Some("ffee"));
    assert_eq!(ctx.expression.as_deref(), Some("a / 0"));
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn rule_local_errors_are_not_fatal() {
    for err in [
        Error::undefined_symbol("x"),
        Error::unknown_function("f"),
        Error::arity_mismatch("2", 1),
        Error::new(ErrorKind::DivisionByZero),
        Error::new(ErrorKind::Overflow),
        Error::invalid_rule("empty output"),
    ] {
        assert!(!err.is_fatal(), "{err} should be rule-local");
    }
}

#[test]
fn backend_errors_are_fatal() {
    let exhausted = StoreFailure::CapacityExhausted {
        capacity: 4,
        fact: "x".into(),
    };
    assert!(Error::store(exhausted).is_fatal());
    assert!(Error::store(StoreFailure::Decode("bad".into())).is_fatal());
    assert!(Error::internal("worker").is_fatal());
}
