//! Reference-counted handles on opened physical indexes.
//!
//! An `IndexHandle` is the only resource shared between the alias
//! table, cached sessions and live cursors. Cloning a handle acquires
//! a reference and dropping it releases one; the engine's `close` runs
//! exactly once, when the last reference goes away. A `WeakIndexHandle`
//! observes a handle without keeping the index open.

use crate::core::error::Result;
use crate::core::search::QueryPlan;
use crate::core::storage::engine::{IndexStore, PhysicalIndex};
use crate::core::types::{DocKey, FieldSelector, ScoredDoc, StoredDocument};
use std::fmt;
use std::sync::{Arc, Weak};

struct HandleInner {
    index: Box<dyn PhysicalIndex>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        tracing::debug!("Closing physical index '{}'", self.index.location());
        self.index.close();
    }
}

/// Shared handle on one opened physical index
#[derive(Clone)]
pub struct IndexHandle {
    inner: Arc<HandleInner>,
}

impl IndexHandle {
    /// Open `location` through `store` with a reference count of one
    pub fn open(store: &dyn IndexStore, location: &str) -> Result<Self> {
        let index = store.open(location)?;
        tracing::debug!("Opened physical index '{}'", location);
        Ok(Self::from_index(index))
    }

    pub fn from_index(index: Box<dyn PhysicalIndex>) -> Self {
        Self {
            inner: Arc::new(HandleInner { index }),
        }
    }

    pub fn location(&self) -> &str {
        self.inner.index.location()
    }

    /// Number of live references, including this one
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether two handles share the same opened index
    pub fn same_index(&self, other: &IndexHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn search(&self, plan: &QueryPlan) -> Result<Vec<ScoredDoc>> {
        self.inner.index.search(plan)
    }

    pub fn fetch_fields(&self, doc: DocKey, selector: &FieldSelector) -> Result<StoredDocument> {
        self.inner.index.fetch_fields(doc, selector)
    }

    pub fn doc_count(&self) -> u64 {
        self.inner.index.doc_count()
    }

    pub fn downgrade(&self) -> WeakIndexHandle {
        WeakIndexHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning reference to an `IndexHandle`
#[derive(Clone)]
pub struct WeakIndexHandle {
    inner: Weak<HandleInner>,
}

impl WeakIndexHandle {
    /// Whether any `IndexHandle` still keeps the index open
    pub fn is_open(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("location", &self.location())
            .field("refs", &self.ref_count())
            .finish()
    }
}
