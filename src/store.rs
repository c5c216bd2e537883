//! In-memory catalog store.
//!
//! Holds the current set of resolved items keyed by id. Readers take a
//! snapshot (an `Arc` clone) and never block a load; a load builds the new
//! map off to the side and swaps it in with [`CatalogStore::replace_all`].
//! A reader therefore sees either the whole old catalog or the whole new one.

use crate::types::ResolvedItem;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub type Snapshot = Arc<BTreeMap<String, ResolvedItem>>;

#[derive(Debug, Default)]
pub struct CatalogStore {
    items: RwLock<Snapshot>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a complete new catalog.
    pub fn replace_all(&self, items: BTreeMap<String, ResolvedItem>) {
        let next = Arc::new(items);
        match self.items.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// The current catalog. Cheap; holds the lock only for the clone.
    pub fn snapshot(&self) -> Snapshot {
        match self.items.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Every item, ordered by id.
    pub fn list_all(&self) -> Vec<ResolvedItem> {
        self.snapshot().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.snapshot().len()
    }
}
