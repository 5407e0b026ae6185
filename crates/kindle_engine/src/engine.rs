//! The engine: owns facts, rules and functions, and runs them to a fixed
//! point.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use kindle_expr::{ExpressionCache, FunctionRegistry};
use kindle_foundation::{Error, Result, Value};
use kindle_store::FactStore;

use crate::agenda::Agenda;
use crate::config::EngineConfig;
use crate::outcome::RunOutcome;
use crate::pool::{RunState, WorkerPool};
use crate::quiescence::Settled;
use crate::rule::{CompiledRule, Rule, RuleSet};

/// Forward-chaining rule engine.
///
/// Configure it with [`Engine::set_facts`], [`Engine::set_rules`] and
/// [`Engine::set_functions`], then call [`Engine::run`]. Each run works on a
/// fresh store seeded with the initial facts, so an engine can run many
/// times and the inputs are never mutated.
///
/// # Example
///
/// ```
/// use kindle_engine::{Engine, Rule};
/// use kindle_foundation::Value;
///
/// let mut engine = Engine::default();
/// engine.set_facts([("a", Value::Int(2)), ("b", Value::Int(3))]);
/// engine.set_rules([Rule::builder("result_end")
///     .with_inputs(["a", "b"])
///     .with_guard("a > 0 && b > 0")
///     .with_value("a + b")
///     .build()
///     .unwrap()]);
/// assert_eq!(engine.run().unwrap(), Some(Value::Int(5)));
/// ```
pub struct Engine {
    config: EngineConfig,
    facts: BTreeMap<String, Value>,
    rules: Arc<RuleSet>,
    functions: Arc<FunctionRegistry>,
    cache: Arc<ExpressionCache>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Creates an engine that owns its expression cache.
    ///
    /// The function registry starts with the builtins.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let cache = Arc::new(ExpressionCache::new(config.cache_capacity));
        Self::with_cache(config, cache)
    }

    /// Creates an engine that compiles through a shared cache.
    #[must_use]
    pub fn with_cache(config: EngineConfig, cache: Arc<ExpressionCache>) -> Self {
        Self {
            config,
            facts: BTreeMap::new(),
            rules: Arc::new(RuleSet::new()),
            functions: Arc::new(FunctionRegistry::with_builtins()),
            cache,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the expression cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<ExpressionCache> {
        &self.cache
    }

    /// Replaces the initial facts.
    pub fn set_facts<I, K>(&mut self, facts: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.facts = facts.into_iter().map(|(k, v)| (k.into(), v)).collect();
    }

    /// Returns the initial facts.
    #[must_use]
    pub fn facts(&self) -> &BTreeMap<String, Value> {
        &self.facts
    }

    /// Replaces the rules. Identical rules collapse into one.
    pub fn set_rules<I>(&mut self, rules: I)
    where
        I: IntoIterator<Item = Rule>,
    {
        self.rules = Arc::new(rules.into_iter().collect());
    }

    /// Replaces the rules with a shared rule set.
    pub fn set_rule_set(&mut self, rules: Arc<RuleSet>) {
        self.rules = rules;
    }

    /// Returns the rule set.
    #[must_use]
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// Replaces the function registry.
    pub fn set_functions(&mut self, functions: FunctionRegistry) {
        self.functions = Arc::new(functions);
    }

    /// Returns the function registry.
    #[must_use]
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Runs to a fixed point and returns the terminal fact's value.
    ///
    /// `Ok(None)` means the run finished without deriving the terminal
    /// fact.
    ///
    /// # Errors
    /// See [`Engine::run_detailed`].
    pub fn run(&self) -> Result<Option<Value>> {
        self.run_detailed().map(|outcome| outcome.terminal)
    }

    /// Runs to a fixed point and returns the final state with diagnostics.
    ///
    /// # Errors
    /// Returns a parse error in strict mode if any rule does not compile, a
    /// store error if the backend fails, a timeout error if the deadline
    /// passes, or an internal error if a worker cannot be started or
    /// panics.
    pub fn run_detailed(&self) -> Result<RunOutcome> {
        let started = Instant::now();
        let deadline = self.config.timeout.map(|timeout| started + timeout);

        let compiled = self.compile()?;
        let store = self.config.store.build();
        if self.config.store.protects_pending() {
            for rule in &compiled.rules {
                for fact in rule.referenced_facts() {
                    store.pin(&fact);
                }
            }
        }
        let result = self
            .execute(compiled, Arc::clone(&store), deadline)
            .and_then(|outcome| Ok((outcome, store.snapshot()?)));
        store.unpin_all();
        let (mut outcome, facts) = result?;

        outcome.facts = facts;
        outcome.terminal = outcome.facts.get(&self.config.terminal_fact).cloned();
        tracing::info!(
            rules = self.rules.len(),
            dispatched = outcome.stats.dispatched,
            completed = outcome.stats.completed,
            failed = outcome.stats.failed,
            rejected = outcome.stats.rejected,
            facts = outcome.facts.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "run complete"
        );
        Ok(outcome)
    }

    /// Compiles every rule. Rejected rules are returned as diagnostics.
    fn compile(&self) -> Result<Compiled> {
        let mut rules = Vec::with_capacity(self.rules.len());
        let mut rejected = Vec::new();
        for rule in self.rules.iter() {
            match CompiledRule::compile(Arc::clone(rule), &self.cache) {
                Ok(compiled) => rules.push(compiled),
                Err(err) if self.config.strict => return Err(err),
                Err(err) => {
                    tracing::warn!(rule = %rule.id(), output = %rule.output(), error = %err, "rule rejected");
                    rejected.push((Arc::clone(rule), err));
                }
            }
        }
        Ok(Compiled { rules, rejected })
    }

    fn execute(
        &self,
        compiled: Compiled,
        store: Arc<dyn FactStore>,
        deadline: Option<Instant>,
    ) -> Result<RunOutcome> {
        for (name, value) in &self.facts {
            store.set(name, value.clone())?;
        }

        let agenda = Agenda::new(compiled.rules.into(), store, Arc::clone(&self.functions));
        let mut state = RunState::new(agenda, self.config.queue_capacity());
        if let (Some(deadline), Some(timeout)) = (deadline, self.config.timeout) {
            state = state.with_timeout(deadline, timeout);
        }
        let run = Arc::new(state);
        for (rule, err) in &compiled.rejected {
            run.recorder.rejected(rule.id(), rule.output(), err);
        }
        let pool = WorkerPool::spawn(self.config.worker_count(), &run)?;
        tracing::debug!(
            workers = pool.len(),
            queue = run.queue.capacity(),
            facts = self.facts.len(),
            "run started"
        );

        // The seed token keeps the count above zero until every initial
        // fact has been offered to the agenda.
        run.quiescence.begin(1);
        let seeded = panic::catch_unwind(AssertUnwindSafe(|| {
            for name in self.facts.keys() {
                run.seed(name)?;
            }
            Ok::<(), Error>(())
        }));
        match seeded {
            Ok(Ok(())) => {}
            Ok(Err(err)) => run.abort(err),
            Err(_) => run.abort(Error::internal("panic while seeding the agenda")),
        }
        run.quiescence.finish();

        let settled = run.quiescence.wait(deadline);
        run.queue.close();
        pool.join();

        if let Some(err) = run.take_fatal() {
            return Err(err);
        }
        if settled == Settled::TimedOut {
            let timeout = self.config.timeout.unwrap_or_default();
            tracing::warn!(timeout_ms = timeout.as_millis(), outstanding = run.quiescence.outstanding(), "run timed out");
            return Err(Error::timeout(timeout));
        }

        let run = Arc::into_inner(run)
            .ok_or_else(|| Error::internal("run state still shared after workers joined"))?;
        let (stats, firings) = run.recorder.finish();
        Ok(RunOutcome {
            facts: BTreeMap::new(),
            terminal: None,
            stats,
            firings,
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("facts", &self.facts.len())
            .field("rules", &self.rules.len())
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

struct Compiled {
    rules: Vec<CompiledRule>,
    rejected: Vec<(Arc<Rule>, Error)>,
}
