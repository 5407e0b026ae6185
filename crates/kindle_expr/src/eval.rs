//! Tree-walking evaluator for rule expressions.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use kindle_foundation::{Error, ErrorKind, Result, Type, Value};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::function::FunctionRegistry;

/// Source of fact bindings for an evaluation.
///
/// Implemented by fact stores so guards see live working memory, and by
/// plain maps for tests and one-off evaluation.
pub trait Bindings {
    /// Returns the current value of a fact, or `None` if it is absent.
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl<S: BuildHasher> Bindings for HashMap<String, Value, S> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Bindings for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Bindings with no facts at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBindings;

impl Bindings for NoBindings {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Evaluates expressions against a set of bindings and functions.
pub struct Evaluator<'a> {
    bindings: &'a dyn Bindings,
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator.
    #[must_use]
    pub fn new(bindings: &'a dyn Bindings, functions: &'a FunctionRegistry) -> Self {
        Self {
            bindings,
            functions,
        }
    }

    /// Evaluates an expression to a value.
    ///
    /// # Errors
    /// Returns an error for unbound identifiers, unknown functions, type
    /// mismatches, division by zero and integer overflow.
    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value, _) => Ok(value.clone()),
            Expr::Ident(name, _) => self
                .bindings
                .lookup(name)
                .ok_or_else(|| Error::undefined_symbol(name.as_str())),
            Expr::Unary { op, operand, .. } => {
                let value = self.eval(operand)?;
                unary(*op, &value)
            }
            Expr::Binary { op, lhs, rhs, .. } => match op {
                BinaryOp::And => {
                    if !self.eval_bool(lhs)? {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.eval_bool(rhs)?))
                }
                BinaryOp::Or => {
                    if self.eval_bool(lhs)? {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.eval_bool(rhs)?))
                }
                _ => {
                    let l = self.eval(lhs)?;
                    let r = self.eval(rhs)?;
                    binary(*op, &l, &r)
                }
            },
            Expr::Call { name, args, .. } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                self.functions.call(name, &values)
            }
        }
    }

    /// Evaluates an expression that must produce a boolean.
    ///
    /// # Errors
    /// Returns a type mismatch if the result is not a boolean, or any error
    /// from [`Evaluator::eval`].
    pub fn eval_bool(&self, expr: &Expr) -> Result<bool> {
        let value = self.eval(expr)?;
        value
            .as_bool()
            .ok_or_else(|| Error::type_mismatch(Type::Bool, value.value_type()))
    }
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, other) => Err(Error::type_mismatch(Type::Bool, other.value_type())),
        (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Neg, other) => Err(Error::type_mismatch(Type::Number, other.value_type())),
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(l, r))),
        BinaryOp::NotEq => Ok(Value::Bool(!loose_eq(l, r))),
        BinaryOp::Lt => compare(l, r).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::LtEq => compare(l, r).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare(l, r).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::GtEq => compare(l, r).map(|o| Value::Bool(o != Ordering::Less)),
        BinaryOp::Add => add(l, r),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arithmetic(op, l, r),
        BinaryOp::And | BinaryOp::Or => Err(Error::internal(format!(
            "{op} must be evaluated with short-circuiting"
        ))),
    }
}

/// Equality that treats `1 == 1.0` as true.
fn loose_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            l.partial_cmp(r) == Some(Ordering::Equal)
        }
        _ => l == r,
    }
}

fn compare(l: &Value, r: &Value) -> Result<Ordering> {
    l.partial_cmp(r).ok_or_else(|| {
        let expected = if l.value_type().is_numeric() {
            Type::Number
        } else {
            l.value_type()
        };
        Error::type_mismatch(expected, r.value_type())
    })
}

fn add(l: &Value, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::String(a), Value::String(b)) => Ok(Value::from(format!("{a}{b}"))),
        (Value::String(_), other) => Err(Error::type_mismatch(Type::String, other.value_type())),
        _ => arithmetic(BinaryOp::Add, l, r),
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        _ => {
            let a = l
                .as_number()
                .ok_or_else(|| Error::type_mismatch(Type::Number, l.value_type()))?;
            let b = r
                .as_number()
                .ok_or_else(|| Error::type_mismatch(Type::Number, r.value_type()))?;
            float_arithmetic(op, a, b)
        }
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
        return Err(Error::new(ErrorKind::DivisionByZero));
    }
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Rem => a.checked_rem(b),
        _ => return Err(Error::internal(format!("{op} is not arithmetic"))),
    };
    result.map(Value::Int).ok_or_else(overflow)
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value> {
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
        return Err(Error::new(ErrorKind::DivisionByZero));
    }
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        _ => return Err(Error::internal(format!("{op} is not arithmetic"))),
    };
    Ok(Value::Float(result))
}

fn overflow() -> Error {
    Error::new(ErrorKind::Overflow)
}
