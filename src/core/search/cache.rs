//! Bounded cache of search sessions.
//!
//! Sessions are keyed by query fingerprint and evicted least recently
//! used first once the cache holds more than `capacity` entries.
//! Recency is a monotonic access tick: `recency` maps tick to
//! fingerprint, so the oldest entry is always the first key.
//!
//! Concurrent misses on the same fingerprint are collapsed into one
//! execution: the first caller runs the executor, later callers block
//! on a per-fingerprint cell and share its result. Callers with
//! different fingerprints only contend on the short state lock.
//!
//! Every session the cache hands out is also tracked weakly under its
//! target, so invalidating a target reaches sessions that were evicted,
//! expired or never cached but are still read through a cursor.

use crate::core::error::{IndexError, Result};
use crate::core::search::query::QueryFingerprint;
use crate::core::search::session::SearchSession;
use crate::core::storage::AliasListener;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

type FlightResult = std::result::Result<Arc<SearchSession>, String>;
type Flight = Arc<OnceCell<FlightResult>>;

struct CacheEntry {
    session: Arc<SearchSession>,
    tick: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryFingerprint, CacheEntry>,
    recency: BTreeMap<u64, QueryFingerprint>,
    inflight: HashMap<QueryFingerprint, Flight>,
    /// Sessions handed out per target, cached or not
    tracked: HashMap<String, Vec<Weak<SearchSession>>>,
    /// Bumped on every invalidation of a target
    generations: HashMap<String, u64>,
    tick: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn generation(&self, target: &str) -> u64 {
        self.generations.get(target).copied().unwrap_or(0)
    }

    fn track(&mut self, session: &Arc<SearchSession>) {
        let tracked = self
            .tracked
            .entry(session.fingerprint().target().to_string())
            .or_default();
        tracked.retain(|weak| weak.strong_count() > 0);
        tracked.push(Arc::downgrade(session));
    }

    fn remove(&mut self, fingerprint: &QueryFingerprint) -> Option<Arc<SearchSession>> {
        let entry = self.entries.remove(fingerprint)?;
        self.recency.remove(&entry.tick);
        Some(entry.session)
    }

    /// Usable cached session, bumped to most recently used
    fn lookup(
        &mut self,
        fingerprint: &QueryFingerprint,
        max_age: Duration,
        released: &mut Vec<Arc<SearchSession>>,
    ) -> Option<Arc<SearchSession>> {
        let usable = {
            let entry = self.entries.get(fingerprint)?;
            entry.session.is_live() && !entry.session.is_expired(max_age)
        };
        if !usable {
            tracing::debug!("Dropping stale or expired session {}", fingerprint);
            released.extend(self.remove(fingerprint));
            return None;
        }

        let tick = self.next_tick();
        let entry = self.entries.get_mut(fingerprint)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        self.recency.insert(tick, fingerprint.clone());
        entry.session.touch();
        Some(Arc::clone(&entry.session))
    }

    fn insert(
        &mut self,
        fingerprint: QueryFingerprint,
        session: Arc<SearchSession>,
        capacity: usize,
        released: &mut Vec<Arc<SearchSession>>,
    ) {
        released.extend(self.remove(&fingerprint));
        let tick = self.next_tick();
        self.recency.insert(tick, fingerprint.clone());
        self.entries.insert(fingerprint, CacheEntry { session, tick });

        while self.entries.len() > capacity {
            let Some((_, victim)) = self.recency.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&victim) {
                tracing::debug!("Evicting session {}", victim);
                released.push(entry.session);
            }
        }
    }
}

/// Fails waiters if the leader unwinds before publishing a result
struct FlightGuard<'a> {
    cache: &'a SessionCache,
    fingerprint: &'a QueryFingerprint,
    flight: &'a Flight,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.state.lock().inflight.remove(self.fingerprint);
            let _ = self
                .flight
                .set(Err("search execution was abandoned".to_string()));
        }
    }
}

/// LRU cache of search sessions with single-flight misses
pub struct SessionCache {
    capacity: usize,
    max_age: Duration,
    state: Mutex<CacheState>,
}

impl SessionCache {
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            max_age,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Return the cached session for `fingerprint`, or run `executor`
    /// and cache its result.
    ///
    /// A failed execution is returned to every caller waiting on it and
    /// nothing is cached. A session whose target was invalidated while
    /// the executor ran is returned already stale and is not cached.
    pub fn get_or_create<F>(
        &self,
        fingerprint: &QueryFingerprint,
        executor: F,
    ) -> Result<Arc<SearchSession>>
    where
        F: FnOnce() -> Result<SearchSession>,
    {
        let mut released = Vec::new();
        let mut state = self.state.lock();

        if let Some(session) = state.lookup(fingerprint, self.max_age, &mut released) {
            drop(state);
            tracing::debug!("Session cache hit for {}", fingerprint);
            return Ok(session);
        }

        if let Some(flight) = state.inflight.get(fingerprint).cloned() {
            drop(state);
            drop(released);
            tracing::debug!("Waiting for in-flight search {}", fingerprint);
            return match flight.wait() {
                Ok(session) => Ok(Arc::clone(session)),
                Err(message) => Err(IndexError::SearchFailed(message.clone())),
            };
        }

        let flight: Flight = Arc::new(OnceCell::new());
        state
            .inflight
            .insert(fingerprint.clone(), Arc::clone(&flight));
        let generation = state.generation(fingerprint.target());
        drop(state);
        drop(released);

        let mut guard = FlightGuard {
            cache: self,
            fingerprint,
            flight: &flight,
            armed: true,
        };

        let result = executor().map(Arc::new);

        let mut released = Vec::new();
        {
            let mut state = self.state.lock();
            state.inflight.remove(fingerprint);
            if let Ok(session) = &result {
                state.track(session);
                if state.generation(fingerprint.target()) == generation {
                    state.insert(
                        fingerprint.clone(),
                        Arc::clone(session),
                        self.capacity,
                        &mut released,
                    );
                    tracing::debug!(
                        "Cached session {} ({} hit(s))",
                        fingerprint,
                        session.len()
                    );
                } else {
                    tracing::debug!(
                        "Target '{}' changed during execution, not caching {}",
                        fingerprint.target(),
                        fingerprint
                    );
                    session.invalidate();
                }
            }
        }
        guard.armed = false;

        let shared = match &result {
            Ok(session) => Ok(Arc::clone(session)),
            Err(e) => Err(e.to_string()),
        };
        let _ = flight.set(shared);

        drop(released);
        result
    }

    /// Mark every session of `target` stale and drop the cached ones.
    ///
    /// Sessions still held outside the cache go stale too. Returns the
    /// number of sessions invalidated.
    pub fn invalidate(&self, target: &str) -> usize {
        let (stale, dropped) = {
            let mut state = self.state.lock();
            *state.generations.entry(target.to_string()).or_insert(0) += 1;
            let victims: Vec<QueryFingerprint> = state
                .entries
                .keys()
                .filter(|fp| fp.target() == target)
                .cloned()
                .collect();
            let dropped: Vec<Arc<SearchSession>> =
                victims.iter().filter_map(|fp| state.remove(fp)).collect();
            let stale: Vec<Arc<SearchSession>> = state
                .tracked
                .remove(target)
                .unwrap_or_default()
                .iter()
                .filter_map(Weak::upgrade)
                .filter(|session| session.is_live())
                .collect();
            (stale, dropped)
        };

        for session in &stale {
            session.invalidate();
        }
        if !stale.is_empty() {
            tracing::info!(
                "Invalidated {} session(s) of target '{}' ({} cached)",
                stale.len(),
                target,
                dropped.len()
            );
        }
        drop(dropped);
        stale.len()
    }

    /// Drop every expired session. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        let removed: Vec<Arc<SearchSession>> = {
            let mut state = self.state.lock();
            let expired: Vec<QueryFingerprint> = state
                .entries
                .iter()
                .filter(|(_, e)| e.session.is_expired(self.max_age))
                .map(|(fp, _)| fp.clone())
                .collect();
            expired.iter().filter_map(|fp| state.remove(fp)).collect()
        };
        if !removed.is_empty() {
            tracing::debug!("Cleaned up {} expired session(s)", removed.len());
        }
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, fingerprint: &QueryFingerprint) -> bool {
        self.state.lock().entries.contains_key(fingerprint)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl AliasListener for SessionCache {
    fn alias_swapped(&self, target: &str) {
        self.invalidate(target);
    }
}
