//! Request-serving entry point.
//!
//! Validates and normalizes a query plan, finds or creates the session
//! for it through the cache and hands back a cursor. Every search also
//! sweeps expired sessions out of the cache.

use crate::core::config::FieldRegistry;
use crate::core::error::{IndexError, Result};
use crate::core::search::cache::SessionCache;
use crate::core::search::cursor::ResultCursor;
use crate::core::search::query::QueryPlan;
use crate::core::search::session::SearchSession;
use crate::core::storage::AliasTable;
use crate::core::types::{FieldSelector, SearchPage};
use std::sync::Arc;

/// Search service shared by all request workers
pub struct SearchService {
    aliases: Arc<AliasTable>,
    cache: Arc<SessionCache>,
    fields: Arc<FieldRegistry>,
    default_page_size: usize,
    max_page_size: usize,
}

impl SearchService {
    pub fn new(
        aliases: Arc<AliasTable>,
        cache: Arc<SessionCache>,
        fields: Arc<FieldRegistry>,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Self {
        Self {
            aliases,
            cache,
            fields,
            default_page_size,
            max_page_size,
        }
    }

    /// Run `plan` against `target` and return a cursor over the hits
    pub fn search(
        &self,
        target: &str,
        plan: &QueryPlan,
        selector: FieldSelector,
    ) -> Result<ResultCursor> {
        plan.validate(&self.fields)?;
        // Unknown targets fail before touching the cache
        self.aliases.resolve(target)?;
        self.cache.cleanup();

        let plan = plan.normalized();
        let fingerprint = plan.fingerprint(target);

        let execute = || {
            self.cache.get_or_create(&fingerprint, || {
                let entry = self.aliases.resolve(target)?;
                SearchSession::execute(fingerprint.clone(), &plan, &entry)
            })
        };

        let mut session = execute()?;
        if !session.is_live() {
            // Invalidated between lookup and return
            tracing::debug!("Session {} went stale, re-executing", fingerprint);
            session = execute()?;
            if !session.is_live() {
                return Err(IndexError::StaleSession(format!(
                    "target '{target}' changed twice while executing {fingerprint}"
                )));
            }
        }

        Ok(ResultCursor::new(session, selector))
    }

    /// Wall time the session's query took
    pub fn query_time_millis(&self, session: &SearchSession) -> u64 {
        session.query_duration_millis()
    }

    /// One page of results.
    ///
    /// `count` defaults to the configured page size and is capped at
    /// the maximum. A page that hits a stale session is re-executed
    /// once against the current alias.
    pub fn page(
        &self,
        target: &str,
        plan: &QueryPlan,
        selector: &FieldSelector,
        offset: usize,
        count: Option<usize>,
    ) -> Result<SearchPage> {
        let count = match count {
            Some(0) => {
                return Err(IndexError::InvalidQuery(
                    "Page size must be at least 1".to_string(),
                ))
            }
            Some(n) => n.min(self.max_page_size),
            None => self.default_page_size,
        };

        let attempt = || -> Result<SearchPage> {
            let cursor = self.search(target, plan, selector.clone())?;
            let items = cursor.page(offset, count)?;
            Ok(SearchPage {
                target: target.to_string(),
                total: cursor.size(),
                offset,
                items,
                query_time_ms: cursor.query_duration_millis(),
            })
        };

        match attempt() {
            Err(e) if e.is_retryable() => {
                tracing::debug!("Retrying page of '{}' after: {}", target, e);
                attempt()
            }
            result => result,
        }
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }
}
