//! Integration tests for lexing and parsing

use kindle_expr::{BinaryOp, Expr, Lexer, TokenKind, parse};
use kindle_foundation::ErrorKind;

#[test]
fn lexes_dotted_identifiers() {
    let kinds: Vec<_> = Lexer::tokenize_all("order.total >= 10")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert!(matches!(&kinds[0], TokenKind::Ident(_)));
    assert!(matches!(&kinds[1], TokenKind::GtEq));
    assert!(matches!(&kinds[2], TokenKind::Int(_)));
    assert!(matches!(kinds.last(), Some(TokenKind::Eof)));
}

#[test]
fn precedence_binds_multiplication_tighter() {
    let expr = parse("a + b * c").unwrap();
    let Expr::Binary { op, rhs, .. } = expr else {
        panic!("expected binary expression");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn and_binds_tighter_than_or() {
    let expr = parse("a || b && c").unwrap();
    assert!(matches!(expr, Expr::Binary { op: BinaryOp::Or, .. }));
}

#[test]
fn parse_errors_carry_position() {
    let err = parse("a > ").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ParseError { line: 1, .. }));
}

#[test]
fn single_ampersand_is_rejected() {
    assert!(parse("a & b").is_err());
}

#[test]
fn empty_source_is_rejected() {
    assert!(parse("   ").is_err());
}

#[test]
fn identifiers_are_collected() {
    let expr = parse("max(a, b.c) > limit && !flag").unwrap();
    let names: Vec<_> = expr.identifiers().into_iter().collect();
    assert_eq!(names, vec!["a", "b.c", "flag", "limit"]);
}
