//! Shared, replaceable catalog for long-running processes.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use pricing_core::{DefinitionError, Definitions};

use crate::catalog::Catalog;

/// Holds the current catalog behind a read-mostly lock.
///
/// Runs take a [`snapshot`](Self::snapshot) and evaluate against it without
/// holding the lock, so a concurrent [`replace`](Self::replace) never
/// changes definitions under a running evaluation.
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Returns the catalog in effect right now.
    pub fn snapshot(&self) -> Arc<Catalog> {
        // A poisoned lock still holds a complete catalog.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Validates `defs` and swaps the result in. On error the current
    /// catalog stays in place.
    pub fn replace(&self, defs: Definitions) -> Result<Arc<Catalog>, DefinitionError> {
        let next = Arc::new(Catalog::new(defs)?);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&next);
        debug!("catalog replaced");
        Ok(next)
    }
}
