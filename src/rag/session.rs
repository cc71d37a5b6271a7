use std::sync::{Arc, RwLock};

use super::index::VectorIndex;

/// Caller-owned handle to the active index of the current session.
///
/// Queries take an `Arc` snapshot under a short read lock and run against
/// an immutable index; `install` is the single swap point, so an in-flight
/// query sees either the old index in full or the new one in full, never a
/// partially built one. A failed rebuild never reaches `install` and leaves
/// the previous index untouched.
#[derive(Default)]
pub struct IndexHandle {
    active: RwLock<Option<Arc<VectorIndex>>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// The currently active index, if any.
    pub fn snapshot(&self) -> Option<Arc<VectorIndex>> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Atomically replace the active index with a freshly built one.
    pub fn install(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let index = Arc::new(index);
        let mut guard = match self.active.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Arc::clone(&index));
        index
    }

    /// Drop the active index, ending the session.
    pub fn clear(&self) {
        let mut guard = match self.active.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }

    pub fn is_active(&self) -> bool {
        self.snapshot().is_some()
    }
}
