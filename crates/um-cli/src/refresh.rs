//! Latest-wins refresh coordination.
//!
//! A watcher that recomputes a projection on every log change can have
//! several recomputations in flight when events arrive faster than a
//! recomputation finishes. [`LatestSlot`] keeps only the newest result:
//! each recomputation takes a generation number up front, and a publish
//! carrying a stale generation is discarded instead of overwriting a
//! fresher value.

use std::sync::{Mutex, PoisonError};

/// A single-value slot where only the newest generation may publish.
pub struct LatestSlot<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    next_generation: u64,
    published: u64,
    value: Option<T>,
}

impl<T> LatestSlot<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_generation: 1,
                published: 0,
                value: None,
            }),
        }
    }

    /// Claims a generation number for a recomputation about to start.
    ///
    /// Generations are handed out in increasing order, so a recomputation
    /// started later always outranks one started earlier.
    pub fn begin(&self) -> u64 {
        let mut inner = self.lock();
        let generation = inner.next_generation;
        inner.next_generation += 1;
        generation
    }

    /// Publishes a result computed under `generation`.
    ///
    /// Returns `false` when a newer generation has already published; the
    /// value is dropped in that case.
    pub fn publish(&self, generation: u64, value: T) -> bool {
        let mut inner = self.lock();
        if generation < inner.published {
            tracing::debug!(generation, published = inner.published, "stale result dropped");
            return false;
        }
        inner.published = generation;
        inner.value = Some(value);
        true
    }

    /// Removes and returns the latest published value, if any.
    pub fn take(&self) -> Option<T> {
        self.lock().value.take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
