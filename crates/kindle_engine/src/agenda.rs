//! The agenda: decides when a rule is ready and marks it fired.
//!
//! Every readiness decision happens inside one critical section, which owns
//! the dependency index and the fired-set. Inside it the agenda reads the
//! fact store, so the lock order is always agenda, then store.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use kindle_expr::{Bindings, FunctionRegistry};
use kindle_foundation::{Error, Result, Value};
use kindle_store::FactStore;

use crate::index::DependencyIndex;
use crate::outcome::Recorder;
use crate::quiescence::Quiescence;
use crate::rule::{CompiledRule, RuleId};

// =============================================================================
// Store Bindings
// =============================================================================

/// Expression bindings read straight from the fact store.
///
/// A store failure reads as an unbound name; the failure itself is kept so
/// the caller can treat it as fatal instead of as a rule-local error.
pub(crate) struct StoreBindings<'a> {
    store: &'a dyn FactStore,
    error: RefCell<Option<Error>>,
}

impl<'a> StoreBindings<'a> {
    pub(crate) fn new(store: &'a dyn FactStore) -> Self {
        Self {
            store,
            error: RefCell::new(None),
        }
    }

    /// Returns the first store failure seen, if any.
    pub(crate) fn take_error(&self) -> Option<Error> {
        self.error.borrow_mut().take()
    }
}

impl Bindings for StoreBindings<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        match self.store.get(name) {
            Ok(value) => value,
            Err(err) => {
                let mut slot = self.error.borrow_mut();
                if slot.is_none() {
                    *slot = Some(err.at_fact(name));
                }
                None
            }
        }
    }
}

// =============================================================================
// Agenda
// =============================================================================

struct AgendaState {
    index: DependencyIndex,
    fired: HashSet<RuleId>,
}

/// Readiness tracking for one run.
pub(crate) struct Agenda {
    rules: Arc<[CompiledRule]>,
    store: Arc<dyn FactStore>,
    functions: Arc<FunctionRegistry>,
    state: Mutex<AgendaState>,
}

impl Agenda {
    pub(crate) fn new(
        rules: Arc<[CompiledRule]>,
        store: Arc<dyn FactStore>,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        let index = DependencyIndex::build(rules.iter().map(|c| c.rule().as_ref()));
        Self {
            rules,
            store,
            functions,
            state: Mutex::new(AgendaState {
                index,
                fired: HashSet::new(),
            }),
        }
    }

    /// Consumes the bucket for `fact` and returns the positions of the
    /// rules that became ready.
    ///
    /// Returned rules are already in the fired-set and already counted as
    /// outstanding work; the caller must dispatch each exactly once. A rule
    /// whose guard fails to evaluate is marked fired and recorded as failed
    /// so it is never retried.
    ///
    /// # Errors
    /// Returns a store error if an input or guard lookup fails. The run
    /// must abort.
    pub(crate) fn on_fact_ready(
        &self,
        fact: &str,
        quiescence: &Quiescence,
        recorder: &Recorder,
    ) -> Result<Vec<usize>> {
        let mut state = self.state.lock();
        let Some(bucket) = state.index.take(fact) else {
            return Ok(Vec::new());
        };
        tracing::trace!(fact = %fact, candidates = bucket.len(), "consumed index bucket");

        let mut ready = Vec::new();
        for position in bucket {
            let compiled = &self.rules[position];
            let rule = compiled.rule();
            if state.fired.contains(&rule.id()) {
                continue;
            }
            if !self.inputs_present(compiled)? {
                continue;
            }

            let bindings = StoreBindings::new(self.store.as_ref());
            let verdict = compiled.check_guard(&bindings, &self.functions);
            if let Some(err) = bindings.take_error() {
                return Err(err.in_rule(rule.id().to_string()));
            }
            match verdict {
                Ok(true) => {
                    state.fired.insert(rule.id());
                    ready.push(position);
                }
                Ok(false) => {}
                Err(err) => {
                    let err = err.in_rule(rule.id().to_string());
                    tracing::warn!(rule = %rule.id(), output = %rule.output(), error = %err, "guard failed");
                    state.fired.insert(rule.id());
                    recorder.failed(rule.id(), rule.output(), &err);
                }
            }
        }

        quiescence.begin(ready.len());
        recorder.dispatched(ready.len());
        Ok(ready)
    }

    fn inputs_present(&self, compiled: &CompiledRule) -> Result<bool> {
        for input in compiled.rule().inputs() {
            if !self.store.exists(input).map_err(|e| e.at_fact(input.as_str()))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Returns the compiled rule at `position`.
    pub(crate) fn rule(&self, position: usize) -> &CompiledRule {
        &self.rules[position]
    }

    /// Returns the fact store.
    pub(crate) fn store(&self) -> &dyn FactStore {
        self.store.as_ref()
    }

    /// Returns the function registry.
    pub(crate) fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    #[cfg(test)]
    fn fired_count(&self) -> usize {
        self.state.lock().fired.len()
    }
}
