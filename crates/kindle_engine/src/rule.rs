//! Rules, rule sets, and serialized rule definitions.
//!
//! A rule names the facts it waits for, an optional guard, and the one fact
//! it writes. Its id is the BLAKE3 hash of that content, so two definitions
//! that say the same thing collapse into one rule.

pub mod compiler;

pub use compiler::CompiledRule;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use kindle_foundation::{Error, Result, Value};

// =============================================================================
// Rule Id
// =============================================================================

/// Content-addressed rule identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId([u8; 32]);

impl RuleId {
    fn of(inputs: &[String], guard: Option<&str>, output: &str, producer: &Producer) -> Self {
        fn field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }

        // Input order carries no meaning.
        let mut sorted: Vec<&str> = inputs.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&(sorted.len() as u64).to_le_bytes());
        for input in sorted {
            field(&mut hasher, input.as_bytes());
        }
        match guard {
            Some(guard) => {
                hasher.update(&[1]);
                field(&mut hasher, guard.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        field(&mut hasher, output.as_bytes());
        match producer {
            Producer::Expression(source) => {
                hasher.update(b"e");
                field(&mut hasher, source.as_bytes());
            }
            Producer::Constant(value) => {
                hasher.update(b"k");
                field(&mut hasher, format!("{value:?}").as_bytes());
            }
            Producer::Call { function, args } => {
                hasher.update(b"c");
                field(&mut hasher, function.as_bytes());
                hasher.update(&(args.len() as u64).to_le_bytes());
                for arg in args {
                    field(&mut hasher, arg.as_bytes());
                }
            }
            Producer::Passthrough(param) => {
                hasher.update(b"p");
                field(&mut hasher, param.as_bytes());
            }
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Returns the raw id bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..6] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleId({self})")
    }
}

// =============================================================================
// Producer
// =============================================================================

/// How a rule computes its output value.
#[derive(Clone, Debug, PartialEq)]
pub enum Producer {
    /// Evaluate an expression against the current facts.
    Expression(String),
    /// Always write this value.
    Constant(Value),
    /// Call a registered function with the named facts as arguments.
    Call {
        /// Function name.
        function: String,
        /// Fact names passed positionally.
        args: Vec<String>,
    },
    /// Copy another fact's value.
    Passthrough(String),
}

// =============================================================================
// Rule
// =============================================================================

/// An immutable rule.
#[derive(Clone, PartialEq)]
pub struct Rule {
    id: RuleId,
    inputs: Vec<String>,
    guard: Option<String>,
    output: String,
    producer: Producer,
}

impl Rule {
    /// Starts a rule that writes `output`.
    #[must_use]
    pub fn builder(output: impl Into<String>) -> RuleBuilder {
        RuleBuilder {
            inputs: Vec::new(),
            guard: None,
            output: output.into(),
            producer: None,
        }
    }

    /// Returns the content id.
    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Returns the input fact names, deduplicated in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Returns the guard source, if any.
    #[must_use]
    pub fn guard(&self) -> Option<&str> {
        self.guard.as_deref()
    }

    /// Returns the output fact name.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the output producer.
    #[must_use]
    pub fn producer(&self) -> &Producer {
        &self.producer
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("inputs", &self.inputs)
            .field("guard", &self.guard)
            .field("output", &self.output)
            .field("producer", &self.producer)
            .finish()
    }
}

/// Builder for [`Rule`].
#[derive(Clone, Debug)]
#[must_use]
pub struct RuleBuilder {
    inputs: Vec<String>,
    guard: Option<String>,
    output: String,
    producer: Option<Producer>,
}

impl RuleBuilder {
    /// Adds input fact names. Repeats are dropped.
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for input in inputs {
            let input = input.into();
            if !self.inputs.contains(&input) {
                self.inputs.push(input);
            }
        }
        self
    }

    /// Sets the guard. Blank source means no guard.
    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        let guard = guard.into();
        self.guard = if guard.trim().is_empty() {
            None
        } else {
            Some(guard)
        };
        self
    }

    /// Produces the output by evaluating `source`.
    pub fn with_value(mut self, source: impl Into<String>) -> Self {
        self.producer = Some(Producer::Expression(source.into()));
        self
    }

    /// Produces a constant output.
    pub fn with_constant(mut self, value: impl Into<Value>) -> Self {
        self.producer = Some(Producer::Constant(value.into()));
        self
    }

    /// Produces the output by calling `function` on the named facts.
    pub fn with_call<I, S>(mut self, function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.producer = Some(Producer::Call {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Copies the value of fact `param`.
    pub fn with_passthrough(mut self, param: impl Into<String>) -> Self {
        self.producer = Some(Producer::Passthrough(param.into()));
        self
    }

    /// Validates and builds the rule.
    ///
    /// # Errors
    /// Returns `InvalidRule` if the output name is blank, an input name is
    /// blank, or no producer was set.
    pub fn build(self) -> Result<Rule> {
        if self.output.trim().is_empty() {
            return Err(Error::invalid_rule("output fact name is empty"));
        }
        if self.inputs.iter().any(|input| input.trim().is_empty()) {
            return Err(Error::invalid_rule(format!(
                "rule for {} has an empty input name",
                self.output
            )));
        }
        let Some(producer) = self.producer else {
            return Err(Error::invalid_rule(format!(
                "rule for {} has no producer",
                self.output
            )));
        };
        let id = RuleId::of(&self.inputs, self.guard.as_deref(), &self.output, &producer);
        Ok(Rule {
            id,
            inputs: self.inputs,
            guard: self.guard,
            output: self.output,
            producer,
        })
    }
}

// =============================================================================
// Rule Set
// =============================================================================

/// An immutable-per-run collection of unique rules.
///
/// Rules are deduplicated by id; the first registration wins. A rule set is
/// cheap to share across runs and engines.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<Arc<Rule>>,
    ids: HashSet<RuleId>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. Returns false if an identical rule is already present.
    pub fn insert(&mut self, rule: Rule) -> bool {
        if !self.ids.insert(rule.id()) {
            tracing::debug!(rule = %rule.id(), output = %rule.output(), "dropped duplicate rule");
            return false;
        }
        self.rules.push(Arc::new(rule));
        true
    }

    /// Returns true if a rule with this id is present.
    #[must_use]
    pub fn contains(&self, id: RuleId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns the rule at `index` (registration order).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Rule>> {
        self.rules.get(index)
    }

    /// Iterates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.iter()
    }

    /// Returns the number of unique rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut set = Self::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

impl Extend<Rule> for RuleSet {
    fn extend<I: IntoIterator<Item = Rule>>(&mut self, iter: I) {
        for rule in iter {
            self.insert(rule);
        }
    }
}

// =============================================================================
// Rule Definitions
// =============================================================================

/// A serialized rule record: `{ "output", "input", "rule", "value" }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDef {
    /// Output fact name.
    pub output: String,
    /// Input fact names.
    pub input: Vec<String>,
    /// Guard expression source; blank means no guard.
    pub rule: String,
    /// Value expression source.
    pub value: String,
}

impl RuleDef {
    /// Converts the record to a rule.
    ///
    /// # Errors
    /// Returns `InvalidRule` if the output or value is blank.
    pub fn to_rule(&self) -> Result<Rule> {
        if self.value.trim().is_empty() {
            return Err(Error::invalid_rule(format!(
                "rule for {} has no value expression",
                self.output
            )));
        }
        Rule::builder(self.output.clone())
            .with_inputs(self.input.iter().cloned())
            .with_guard(self.rule.clone())
            .with_value(self.value.clone())
            .build()
    }
}

/// A document of rule records: `{ "data": [ ... ] }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBook {
    /// The rule records.
    pub data: Vec<RuleDef>,
}

impl RuleBook {
    /// Converts every record to a rule.
    ///
    /// # Errors
    /// Returns the first record's conversion error.
    pub fn to_rules(&self) -> Result<Vec<Rule>> {
        self.data.iter().map(RuleDef::to_rule).collect()
    }
}
