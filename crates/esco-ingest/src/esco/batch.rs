//! Fixed-size batching of skill URIs for bulk detail requests

use crate::config::MAX_BATCH_SIZE;

/// Buffers identifiers and releases them in batches of at most `capacity`
///
/// One accumulator serves a single `narrowerSkill` list, so a batch never mixes
/// leaves from different branches.
#[derive(Debug)]
pub struct BatchAccumulator<T = String> {
    capacity: usize,
    pending: Vec<T>,
}

impl<T> BatchAccumulator<T> {
    /// `capacity` is clamped to `1..=MAX_BATCH_SIZE`
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BATCH_SIZE);
        Self {
            capacity,
            pending: Vec::with_capacity(capacity),
        }
    }

    /// Append `item`; returns the full batch once `capacity` is reached
    pub fn add(&mut self, item: T) -> Option<Vec<T>> {
        self.pending.push(item);

        if self.pending.len() >= self.capacity {
            Some(std::mem::replace(&mut self.pending, Vec::with_capacity(self.capacity)))
        } else {
            None
        }
    }

    /// Drain whatever is left, `None` when nothing is pending
    pub fn flush_remaining(&mut self) -> Option<Vec<T>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
