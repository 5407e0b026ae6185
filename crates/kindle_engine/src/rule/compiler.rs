//! Rule compilation.
//!
//! Turns the expression sources of a [`Rule`] into cached [`Expression`]s
//! once per run, so workers only evaluate.

use std::collections::BTreeSet;
use std::sync::Arc;

use kindle_expr::{Bindings, Expression, ExpressionCache, FunctionRegistry};
use kindle_foundation::{Error, Result, Value};

use super::{Producer, Rule};

/// A rule with its guard and value expressions compiled.
#[derive(Clone, Debug)]
pub struct CompiledRule {
    rule: Arc<Rule>,
    guard: Option<Arc<Expression>>,
    value: Option<Arc<Expression>>,
}

impl CompiledRule {
    /// Compiles `rule` through `cache`.
    ///
    /// # Errors
    /// Returns the parse error of the guard or value expression, tagged with
    /// the rule id.
    pub fn compile(rule: Arc<Rule>, cache: &ExpressionCache) -> Result<Self> {
        let tag = |e: Error| e.in_rule(rule.id().to_string());
        let guard = match rule.guard() {
            Some(source) => Some(cache.get_or_compile(source).map_err(tag)?),
            None => None,
        };
        let value = match rule.producer() {
            Producer::Expression(source) => Some(cache.get_or_compile(source).map_err(tag)?),
            _ => None,
        };
        Ok(Self { rule, guard, value })
    }

    /// Returns the source rule.
    #[must_use]
    pub fn rule(&self) -> &Arc<Rule> {
        &self.rule
    }

    /// Returns true if the rule has a guard.
    #[must_use]
    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    /// Every fact the rule may read: inputs, expression identifiers, call
    /// arguments and passthrough sources.
    #[must_use]
    pub fn referenced_facts(&self) -> BTreeSet<String> {
        let mut facts: BTreeSet<String> = self.rule.inputs().iter().cloned().collect();
        for expr in self.guard.iter().chain(self.value.iter()) {
            facts.extend(expr.identifiers().iter().cloned());
        }
        match self.rule.producer() {
            Producer::Call { args, .. } => facts.extend(args.iter().cloned()),
            Producer::Passthrough(param) => {
                facts.insert(param.clone());
            }
            Producer::Expression(_) | Producer::Constant(_) => {}
        }
        facts
    }

    /// Evaluates the guard. A rule without a guard always passes.
    ///
    /// # Errors
    /// Returns any evaluation error, or a type mismatch if the guard is not
    /// boolean.
    pub fn check_guard(&self, bindings: &dyn Bindings, functions: &FunctionRegistry) -> Result<bool> {
        match &self.guard {
            Some(guard) => guard.evaluate_bool(bindings, functions),
            None => Ok(true),
        }
    }

    /// Computes the output value.
    ///
    /// # Errors
    /// Returns any evaluation or function error, or `UndefinedSymbol` if a
    /// fact the producer reads is absent.
    pub fn produce(&self, bindings: &dyn Bindings, functions: &FunctionRegistry) -> Result<Value> {
        let fact = |name: &str| {
            bindings
                .lookup(name)
                .ok_or_else(|| Error::undefined_symbol(name))
        };
        match self.rule.producer() {
            Producer::Expression(source) => match &self.value {
                Some(expr) => expr.evaluate(bindings, functions),
                None => Err(Error::internal(format!(
                    "value expression `{source}` was not compiled"
                ))),
            },
            Producer::Constant(value) => Ok(value.clone()),
            Producer::Call { function, args } => {
                let args = args.iter().map(|a| fact(a)).collect::<Result<Vec<_>>>()?;
                functions.call(function, &args)
            }
            Producer::Passthrough(param) => fact(param),
        }
    }
}
