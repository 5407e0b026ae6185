//! Error types for the Kindle system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::Type;

/// The main error type for Kindle operations.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Records the rule involved, keeping any existing context.
    #[must_use]
    pub fn in_rule(mut self, rule: impl Into<String>) -> Self {
        self.context = Some(self.context.take().unwrap_or_default().with_rule(rule));
        self
    }

    /// Records the fact involved, keeping any existing context.
    #[must_use]
    pub fn at_fact(mut self, fact: impl Into<String>) -> Self {
        self.context = Some(self.context.take().unwrap_or_default().with_fact(fact));
        self
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an undefined symbol error (a fact the expression needs is unbound).
    #[must_use]
    pub fn undefined_symbol(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UndefinedSymbol(name.into()))
    }

    /// Creates an unknown function error.
    #[must_use]
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownFunction(name.into()))
    }

    /// Creates an arity mismatch error.
    #[must_use]
    pub fn arity_mismatch(expected: impl Into<String>, actual: usize) -> Self {
        Self::new(ErrorKind::ArityMismatch {
            expected: expected.into(),
            actual,
        })
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(
        message: impl Into<String>,
        line: u32,
        column: u32,
        context: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::ParseError {
            message: message.into(),
            line,
            column,
            context: context.into(),
        })
    }

    /// Creates an invalid rule error.
    #[must_use]
    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRule(message.into()))
    }

    /// Creates a fact store backend error.
    #[must_use]
    pub fn store(failure: StoreFailure) -> Self {
        Self::new(ErrorKind::Store(failure))
    }

    /// Creates a run timeout error.
    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self::new(ErrorKind::Timeout(after))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns true if this error must abort a whole run.
    ///
    /// Expression failures are rule-local: the rule produces nothing and
    /// the run continues. Store, timeout and internal failures are not.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Store(_) | ErrorKind::Timeout(_) | ErrorKind::Internal(_)
        )
    }

    /// Returns true if this is a parse (compile) error.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self.kind, ErrorKind::ParseError { .. })
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Clone, Debug, Error)]
pub enum ErrorKind {
    /// Type mismatch during runtime type checking.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// Identifier has no binding in the fact store.
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),

    /// Function name is not registered.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments to function.
    #[error("arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch {
        /// Description of expected arity.
        expected: String,
        /// Actual number of arguments.
        actual: usize,
    },

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed.
    #[error("integer overflow")]
    Overflow,

    /// Expression source could not be parsed.
    #[error("parse error at {line}:{column}: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Line number (1-indexed).
        line: u32,
        /// Column number (1-indexed).
        column: u32,
        /// The source line where the error occurred.
        context: String,
    },

    /// Rule definition is malformed.
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// The fact store backend failed.
    #[error("fact store failure: {0}")]
    Store(StoreFailure),

    /// Run did not reach quiescence before its deadline.
    #[error("run timed out after {0:?}")]
    Timeout(Duration),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failures reported by a fact store backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreFailure {
    /// Every entry is pinned and the store is full.
    CapacityExhausted {
        /// The configured capacity.
        capacity: usize,
        /// The fact that could not be stored.
        fact: String,
    },
    /// A value could not be encoded for storage.
    Encode(String),
    /// A stored value could not be decoded.
    Decode(String),
}

impl fmt::Display for StoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExhausted { capacity, fact } => {
                write!(f, "capacity ({capacity}) exhausted storing {fact}")
            }
            Self::Encode(msg) => write!(f, "encode failed: {msg}"),
            Self::Decode(msg) => write!(f, "decode failed: {msg}"),
        }
    }
}

/// Context about where an error occurred.
#[derive(Clone, Debug, Default)]
pub struct ErrorContext {
    /// Rule being evaluated.
    pub rule: Option<String>,
    /// Fact being read or written.
    pub fact: Option<String>,
    /// Expression source being compiled or evaluated.
    pub expression: Option<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the fact.
    #[must_use]
    pub fn with_fact(mut self, fact: impl Into<String>) -> Self {
        self.fact = Some(fact.into());
        self
    }

    /// Sets the expression source.
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(rule) = &self.rule {
            write!(f, "in rule {rule}")?;
            sep = ", ";
        }
        if let Some(fact) = &self.fact {
            write!(f, "{sep}fact {fact}")?;
            sep = ", ";
        }
        if let Some(expr) = &self.expression {
            write!(f, "{sep}expression `{expr}`")?;
        }
        Ok(())
    }
}
