//! Guard and value expression language for Kindle rules.
//!
//! This crate provides:
//! - [`Lexer`] and [`Parser`] - Source text to [`Expr`]
//! - [`Expression`] - A compiled, content-addressed expression
//! - [`Evaluator`] and [`Bindings`] - Evaluation against fact bindings
//! - [`FunctionRegistry`] - Named functions callable from expressions
//! - [`ExpressionCache`] - Bounded cache of compiled expressions
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use kindle_expr::{Expression, FunctionRegistry};
//! use kindle_foundation::Value;
//!
//! let guard = Expression::compile("a > 0 && b > 0").unwrap();
//! let facts = HashMap::from([
//!     ("a".to_string(), Value::Int(2)),
//!     ("b".to_string(), Value::Int(3)),
//! ]);
//! assert!(guard.evaluate_bool(&facts, &FunctionRegistry::new()).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ast;
pub mod cache;
pub mod eval;
pub mod function;
pub mod lexer;
pub mod parser;
pub mod token;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use cache::{CacheStats, DEFAULT_CACHE_CAPACITY, ExpressionCache};
pub use eval::{Bindings, Evaluator, NoBindings};
pub use function::{Function, FunctionRegistry};
pub use lexer::Lexer;
pub use parser::{Parser, parse};
pub use token::{Span, Token, TokenKind};

use kindle_foundation::{ErrorContext, Result, Value};

/// BLAKE3 hash of an expression's source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprHash(blake3::Hash);

impl ExprHash {
    /// Hashes expression source.
    #[must_use]
    pub fn of(source: &str) -> Self {
        Self(blake3::hash(source.as_bytes()))
    }

    /// Returns the raw hash bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ExprHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_hex()[..16])
    }
}

impl fmt::Debug for ExprHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprHash({self})")
    }
}

/// A parsed expression ready for repeated evaluation.
#[derive(Clone)]
pub struct Expression {
    source: Arc<str>,
    hash: ExprHash,
    ast: Expr,
    identifiers: BTreeSet<String>,
}

impl Expression {
    /// Parses `source` into an expression.
    ///
    /// # Errors
    /// Returns a parse error annotated with the source text.
    pub fn compile(source: &str) -> Result<Self> {
        let ast = parse(source)
            .map_err(|e| e.with_context(ErrorContext::new().with_expression(source)))?;
        let identifiers = ast.identifiers();
        Ok(Self {
            source: source.into(),
            hash: ExprHash::of(source),
            ast,
            identifiers,
        })
    }

    /// Returns the source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the content hash.
    #[must_use]
    pub fn hash(&self) -> ExprHash {
        self.hash
    }

    /// Returns the parsed tree.
    #[must_use]
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Returns the fact names the expression reads.
    #[must_use]
    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }

    /// Evaluates the expression to a value.
    ///
    /// # Errors
    /// Returns any evaluation error; see [`Evaluator::eval`].
    pub fn evaluate(&self, bindings: &dyn Bindings, functions: &FunctionRegistry) -> Result<Value> {
        Evaluator::new(bindings, functions).eval(&self.ast)
    }

    /// Evaluates the expression as a boolean condition.
    ///
    /// # Errors
    /// Returns a type mismatch if the result is not a boolean, or any
    /// evaluation error.
    pub fn evaluate_bool(
        &self,
        bindings: &dyn Bindings,
        functions: &FunctionRegistry,
    ) -> Result<bool> {
        Evaluator::new(bindings, functions).eval_bool(&self.ast)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}
