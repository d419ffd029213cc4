//! Single-writer hand-off point for the live index.
//!
//! Readers take an `Arc` snapshot and search it without holding any lock. A
//! rebuild constructs the replacement completely before swapping it in; a
//! failed rebuild leaves the current index in place. Readers that took a
//! snapshot before the swap finish against the old index.

use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use docqa_core::error::Result;

use crate::index::VectorIndex;

pub struct IndexSlot {
    current: RwLock<Arc<VectorIndex>>,
}

impl IndexSlot {
    pub fn new(index: VectorIndex) -> Self {
        Self { current: RwLock::new(Arc::new(index)) }
    }

    pub fn current(&self) -> Arc<VectorIndex> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swaps in `index`, returning the previous one.
    pub fn replace(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let next = Arc::new(index);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, next);
        info!(entries = guard.len(), previous_entries = previous.len(), "swapped live index");
        previous
    }

    /// Runs `build` outside the lock and swaps in its result on success.
    pub fn rebuild_with<F>(&self, build: F) -> Result<Arc<VectorIndex>>
    where
        F: FnOnce() -> Result<VectorIndex>,
    {
        let index = build()?;
        self.replace(index);
        Ok(self.current())
    }
}
