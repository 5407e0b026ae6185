//! Reverse-dependency index: fact name to the rules waiting on it.

use std::collections::HashMap;

use crate::rule::Rule;

/// Maps each fact name to the positions of the rules that declare it as an
/// input. Built once per run; a bucket is removed once it has been consumed.
#[derive(Clone, Debug, Default)]
pub struct DependencyIndex {
    buckets: HashMap<String, Vec<usize>>,
}

impl DependencyIndex {
    /// Builds the index over `rules`, keyed by each rule's position.
    ///
    /// Buckets list rules in position order without repeats.
    #[must_use]
    pub fn build<'a, I>(rules: I) -> Self
    where
        I: IntoIterator<Item = &'a Rule>,
    {
        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, rule) in rules.into_iter().enumerate() {
            for input in rule.inputs() {
                buckets.entry(input.clone()).or_default().push(position);
            }
        }
        Self { buckets }
    }

    /// Returns the rules waiting on `fact` without consuming the bucket.
    #[must_use]
    pub fn candidates(&self, fact: &str) -> &[usize] {
        self.buckets.get(fact).map_or(&[], Vec::as_slice)
    }

    /// Removes and returns the bucket for `fact`.
    pub fn take(&mut self, fact: &str) -> Option<Vec<usize>> {
        self.buckets.remove(fact)
    }

    /// Iterates the fact names that still have a bucket.
    pub fn facts(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Returns the number of unconsumed buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns true if every bucket has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
