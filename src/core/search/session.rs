//! Executed searches.
//!
//! A `SearchSession` holds the complete, immutable hit list of one
//! query against one alias entry, plus clones of the handles the query
//! ran on. Those clones keep the physical indexes open for as long as
//! the session (or a cursor on it) is alive, even after the target has
//! been repointed.

use crate::core::error::Result;
use crate::core::search::query::{QueryFingerprint, QueryPlan};
use crate::core::storage::{AliasEntry, IndexHandle};
use crate::core::types::Hit;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

/// One executed query and its hit set
pub struct SearchSession {
    fingerprint: QueryFingerprint,
    hits: Vec<Hit>,
    handles: Vec<IndexHandle>,
    max_score: f32,
    created_at: Instant,
    last_access: Mutex<Instant>,
    query_duration: Duration,
    live: AtomicBool,
}

impl SearchSession {
    /// Run `plan` on every handle of `entry` and merge the hits
    pub fn execute(
        fingerprint: QueryFingerprint,
        plan: &QueryPlan,
        entry: &AliasEntry,
    ) -> Result<Self> {
        let start = Instant::now();
        let handles: Vec<IndexHandle> = entry.handles().to_vec();

        let mut hits = Vec::new();
        for (index, handle) in handles.iter().enumerate() {
            for scored in handle.search(plan)? {
                hits.push(Hit {
                    index,
                    doc: scored.doc,
                    score: scored.score,
                    sort_key: scored.sort_key,
                });
            }
        }

        let reverse = plan.sort.as_ref().map(|s| s.reverse).unwrap_or(false);
        hits.sort_by(|a, b| compare_hits(a, b, reverse));

        let max_score = hits.iter().map(|h| h.score).fold(0.0_f32, f32::max);
        let query_duration = start.elapsed();

        tracing::debug!(
            "Executed {} on [{}]: {} hit(s) in {}ms",
            fingerprint,
            entry.locations().join(", "),
            hits.len(),
            query_duration.as_millis()
        );

        let now = Instant::now();
        Ok(Self {
            fingerprint,
            hits,
            handles,
            max_score,
            created_at: now,
            last_access: Mutex::new(now),
            query_duration,
            live: AtomicBool::new(true),
        })
    }

    pub fn fingerprint(&self) -> &QueryFingerprint {
        &self.fingerprint
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Handles the query ran against, in hit `index` order
    pub fn handles(&self) -> &[IndexHandle] {
        &self.handles
    }

    pub fn max_score(&self) -> f32 {
        self.max_score
    }

    /// Score of `hit` relative to the best hit
    pub fn normalized_score(&self, hit: &Hit) -> f32 {
        if self.max_score > 0.0 {
            hit.score / self.max_score
        } else {
            1.0
        }
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Record an access (cache hit)
    pub fn touch(&self) {
        *self.last_access.lock() = Instant::now();
    }

    pub fn last_access(&self) -> Instant {
        *self.last_access.lock()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(AtomicOrdering::SeqCst)
    }

    /// Mark the session stale; cursors on it stop fetching
    pub fn invalidate(&self) {
        self.live.store(false, AtomicOrdering::SeqCst);
    }

    /// Not accessed for longer than `max_age`
    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.last_access().elapsed() > max_age
    }

    pub fn query_duration(&self) -> Duration {
        self.query_duration
    }

    pub fn query_duration_millis(&self) -> u64 {
        self.query_duration.as_millis() as u64
    }
}

impl fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSession")
            .field("fingerprint", &self.fingerprint.to_string())
            .field("hits", &self.hits.len())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Sort key first (missing keys last), then score, then position
fn compare_hits(a: &Hit, b: &Hit, reverse: bool) -> Ordering {
    let by_key = match (&a.sort_key, &b.sort_key) {
        (Some(x), Some(y)) => {
            let ord = x.sort_cmp(y);
            if reverse {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_key
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| (a.index, a.doc).cmp(&(b.index, b.doc)))
}
