//! Named functions callable from rule expressions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kindle_foundation::{Error, Result, Type, Value};

/// A function callable as `name(args...)` from a rule expression.
///
/// Functions must be pure and bounded: workers call them concurrently and
/// never time them out.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Registry of named functions shared by every rule in a run.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<Arc<str>, Function>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the builtin functions (`abs`, `min`, `max`,
    /// `len`, `str`, `coalesce`).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("abs", builtins::abs);
        registry.register("min", builtins::min);
        registry.register("max", builtins::max);
        registry.register("len", builtins::len);
        registry.register("str", builtins::to_str);
        registry.register("coalesce", builtins::coalesce);
        registry
    }

    /// Registers a function, replacing any function with the same name.
    ///
    /// Functions called from a rule guard run while readiness decisions are
    /// serialized, so they must be cheap.
    pub fn register<F>(&mut self, name: impl Into<Arc<str>>, func: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(func));
    }

    /// Registers an already shared function.
    pub fn insert(&mut self, name: impl Into<Arc<str>>, func: Function) {
        self.functions.insert(name.into(), func);
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Calls a function by name.
    ///
    /// # Errors
    /// Returns `UnknownFunction` if no function has this name, or whatever
    /// the function itself returns.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let func = self
            .functions
            .get(name)
            .ok_or_else(|| Error::unknown_function(name))?;
        func(args)
    }

    /// Returns true if a function with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if no functions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

impl<K, F> FromIterator<(K, F)> for FunctionRegistry
where
    K: Into<Arc<str>>,
    F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, F)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (name, func) in iter {
            registry.register(name, func);
        }
        registry
    }
}

mod builtins {
    use kindle_foundation::ErrorKind;

    use super::{Error, Result, Type, Value};

    fn exact<const N: usize>(args: &[Value]) -> Result<&[Value; N]> {
        args.try_into()
            .map_err(|_| Error::arity_mismatch(N.to_string(), args.len()))
    }

    fn number(value: &Value) -> Result<f64> {
        value
            .as_number()
            .ok_or_else(|| Error::type_mismatch(Type::Number, value.value_type()))
    }

    pub(super) fn abs(args: &[Value]) -> Result<Value> {
        let [value] = exact::<1>(args)?;
        match value {
            Value::Int(n) => n
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| Error::new(ErrorKind::Overflow)),
            Value::Float(n) => Ok(Value::Float(n.abs())),
            other => Err(Error::type_mismatch(Type::Number, other.value_type())),
        }
    }

    /// Picks the extreme argument; ties keep the first.
    fn extreme(args: &[Value], want_max: bool) -> Result<Value> {
        let Some((first, rest)) = args.split_first() else {
            return Err(Error::arity_mismatch("at least 1", 0));
        };
        number(first)?;
        let mut best = first;
        for candidate in rest {
            let better = if want_max {
                number(candidate)? > number(best)?
            } else {
                number(candidate)? < number(best)?
            };
            if better {
                best = candidate;
            }
        }
        Ok(best.clone())
    }

    pub(super) fn min(args: &[Value]) -> Result<Value> {
        extreme(args, false)
    }

    pub(super) fn max(args: &[Value]) -> Result<Value> {
        extreme(args, true)
    }

    pub(super) fn len(args: &[Value]) -> Result<Value> {
        let [value] = exact::<1>(args)?;
        let n = match value {
            Value::String(s) => s.chars().count(),
            Value::List(v) => v.len(),
            Value::Map(m) => m.len(),
            other => return Err(Error::type_mismatch(Type::List, other.value_type())),
        };
        i64::try_from(n)
            .map(Value::Int)
            .map_err(|_| Error::new(ErrorKind::Overflow))
    }

    pub(super) fn to_str(args: &[Value]) -> Result<Value> {
        let [value] = exact::<1>(args)?;
        Ok(Value::from(value.to_string()))
    }

    pub(super) fn coalesce(args: &[Value]) -> Result<Value> {
        Ok(args
            .iter()
            .find(|v| !v.is_nil())
            .cloned()
            .unwrap_or(Value::Nil))
    }
}
