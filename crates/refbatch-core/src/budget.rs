//! Length-budgeted batch partitioning.
//!
//! Keys are packed greedily, in the order they are pushed, into batches
//! whose encoded length stays within [`BatchBudget::max_len`]. The encoded
//! length of a key is its byte length plus a fixed per-parameter overhead
//! that stands in for the `uri=` / `&` query-string framing.
//!
//! A key whose cost alone exceeds the budget still gets a batch of its own;
//! the partitioner never drops a key and never splits one.

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Default maximum encoded length of one batch (approximate URL limit).
pub const DEFAULT_MAX_LEN: usize = 4096;

/// Default serialization cost added to every key.
pub const DEFAULT_KEY_OVERHEAD: usize = 5;

/// Size budget for a single lookup batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchBudget {
    /// Maximum summed cost of the keys in one batch.
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    /// Fixed cost added to each key's length.
    #[serde(default = "default_key_overhead")]
    pub per_key_overhead: usize,
}

fn default_max_len() -> usize {
    DEFAULT_MAX_LEN
}

fn default_key_overhead() -> usize {
    DEFAULT_KEY_OVERHEAD
}

impl Default for BatchBudget {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            per_key_overhead: DEFAULT_KEY_OVERHEAD,
        }
    }
}

impl BatchBudget {
    pub fn new(max_len: usize, per_key_overhead: usize) -> Result<Self, ResolveError> {
        let budget = Self {
            max_len,
            per_key_overhead,
        };
        budget.validate()?;
        Ok(budget)
    }

    /// Reject budgets that cannot hold anything.
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.max_len == 0 {
            return Err(ResolveError::Config("batch max_len must be > 0".into()));
        }
        Ok(())
    }

    /// Encoded cost of a single key. Saturates at `usize::MAX`.
    pub fn cost(&self, key: &str) -> usize {
        key.len().saturating_add(self.per_key_overhead)
    }

    /// Encoded length of a whole batch.
    pub fn encoded_len<S: AsRef<str>>(&self, batch: &[S]) -> usize {
        batch
            .iter()
            .fold(0usize, |acc, k| acc.saturating_add(self.cost(k.as_ref())))
    }

    /// Partition `keys` into budget-bounded batches, preserving order.
    ///
    /// Keys are not deduplicated here; see [`crate::BatchResolver::plan`].
    pub fn partition<I, S>(&self, keys: I) -> Vec<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut partitioner = Partitioner::new(*self);
        for key in keys {
            partitioner.push(key.into());
        }
        partitioner.finish()
    }
}

/// Incremental greedy partitioner.
#[derive(Debug)]
pub struct Partitioner {
    budget: BatchBudget,
    batches: Vec<Vec<String>>,
    current: Vec<String>,
    running: usize,
}

impl Partitioner {
    pub fn new(budget: BatchBudget) -> Self {
        Self {
            budget,
            batches: Vec::new(),
            current: Vec::new(),
            running: 0,
        }
    }

    /// Append `key`, closing the current batch first if it would overflow.
    pub fn push(&mut self, key: String) {
        let cost = self.budget.cost(&key);
        if !self.current.is_empty() && self.running.saturating_add(cost) > self.budget.max_len {
            self.batches.push(std::mem::take(&mut self.current));
            self.running = 0;
        }
        self.running = self.running.saturating_add(cost);
        self.current.push(key);
    }

    /// Number of keys pushed so far.
    pub fn key_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum::<usize>() + self.current.len()
    }

    pub fn finish(mut self) -> Vec<Vec<String>> {
        if !self.current.is_empty() {
            self.batches.push(self.current);
        }
        self.batches
    }
}
