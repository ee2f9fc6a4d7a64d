//! Batch result.

use crate::error::Failure;
use crate::types::AttemptOutcome;
use std::time::Duration;

/// Outcome of a batch, index-aligned with the submitted specs.
///
/// Slot `i` holds the terminal outcome of spec `i` no matter which item
/// finished first. Failures are recorded in place and also listed separately.
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
    items: Vec<AttemptOutcome<T>>,
    failed: Vec<usize>,
    execution_time: Duration,
    rounds: Option<usize>,
}

impl<T> BatchResult<T> {
    pub(crate) fn new(
        items: Vec<AttemptOutcome<T>>,
        execution_time: Duration,
        rounds: Option<usize>,
    ) -> Self {
        let failed = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.is_err().then_some(i))
            .collect();
        Self {
            items,
            failed,
            execution_time,
            rounds,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AttemptOutcome<T>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttemptOutcome<T>> {
        self.items.iter()
    }

    pub fn success_count(&self) -> usize {
        self.items.len() - self.failed.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Ascending indices of items that ended in a failure.
    pub fn failed_indices(&self) -> &[usize] {
        &self.failed
    }

    /// Aggregate failure list as `(index, failure)` pairs.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &Failure)> + '_ {
        self.failed.iter().filter_map(|&i| match &self.items[i] {
            Err(f) => Some((i, f)),
            Ok(_) => None,
        })
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn success_rate(&self) -> f64 {
        if self.items.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.items.len() as f64
        }
    }

    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    /// Number of groups dispatched in grouped mode; `None` for the pooled mode.
    pub fn rounds(&self) -> Option<usize> {
        self.rounds
    }

    pub fn into_results(self) -> Vec<AttemptOutcome<T>> {
        self.items
    }
}

impl<T> IntoIterator for BatchResult<T> {
    type Item = AttemptOutcome<T>;
    type IntoIter = std::vec::IntoIter<AttemptOutcome<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a BatchResult<T> {
    type Item = &'a AttemptOutcome<T>;
    type IntoIter = std::slice::Iter<'a, AttemptOutcome<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
