//! Lazy, randomly indexable view over a session's hits.
//!
//! Building a cursor costs nothing; stored fields are fetched from the
//! physical index only when a position is read. The cursor shares the
//! session, and through it the session's handles, so the indexes it
//! reads from stay open until the cursor is dropped.

use crate::core::error::{IndexError, Result};
use crate::core::search::session::SearchSession;
use crate::core::types::{FieldSelector, ResultItem};
use std::sync::Arc;

/// Result cursor for one request
#[derive(Debug, Clone)]
pub struct ResultCursor {
    session: Arc<SearchSession>,
    selector: FieldSelector,
}

impl ResultCursor {
    pub fn new(session: Arc<SearchSession>, selector: FieldSelector) -> Self {
        Self { session, selector }
    }

    /// Number of hits
    pub fn size(&self) -> usize {
        self.session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.is_empty()
    }

    pub fn session(&self) -> &Arc<SearchSession> {
        &self.session
    }

    pub fn selector(&self) -> &FieldSelector {
        &self.selector
    }

    /// Materialize the item at position `i`
    pub fn get(&self, i: usize) -> Result<ResultItem> {
        let size = self.size();
        if i >= size {
            return Err(IndexError::OutOfRange { index: i, size });
        }
        if !self.session.is_live() {
            return Err(IndexError::StaleSession(format!(
                "session {} was invalidated",
                self.session.fingerprint()
            )));
        }

        let hit = &self.session.hits()[i];
        let handle = self.session.handles().get(hit.index).ok_or_else(|| {
            IndexError::SearchFailed(format!("hit {i} refers to unknown index {}", hit.index))
        })?;
        let stored = handle.fetch_fields(hit.doc, &self.selector)?;

        Ok(ResultItem {
            score: self.session.normalized_score(hit),
            identifier: stored.identifier,
            fields: stored.fields,
            xml: if self.selector.payload {
                stored.payload
            } else {
                None
            },
        })
    }

    pub fn query_duration_millis(&self) -> u64 {
        self.session.query_duration_millis()
    }

    /// Items in order, each fetched when the iterator reaches it
    pub fn iter(&self) -> impl Iterator<Item = Result<ResultItem>> + '_ {
        (0..self.size()).map(move |i| self.get(i))
    }

    /// Up to `count` items starting at `offset`.
    ///
    /// An offset equal to the size yields an empty page; anything past
    /// it is out of range.
    pub fn page(&self, offset: usize, count: usize) -> Result<Vec<ResultItem>> {
        let size = self.size();
        if offset > size {
            return Err(IndexError::OutOfRange {
                index: offset,
                size,
            });
        }
        let end = offset.saturating_add(count).min(size);
        (offset..end).map(|i| self.get(i)).collect()
    }
}
