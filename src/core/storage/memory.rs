//! In-memory index store.
//!
//! Keeps documents as plain stored values grouped into segments and
//! matches query plans by simple token comparison. Nothing in the
//! server or CLI opens it; it exists for the test suite, which relies
//! on its hooks to damage segments, fail opens and count
//! open/close/search calls.

use crate::core::config::{coerce, FieldDataType, FieldRegistry};
use crate::core::error::{IndexError, Result};
use crate::core::search::query::convert_bound;
use crate::core::search::{QueryClause, QueryPlan, RangeClause};
use crate::core::storage::checkpoint::HarvestCheckpoint;
use crate::core::storage::engine::{IndexStore, PhysicalIndex};
use crate::core::types::{
    BuildStats, DocKey, FieldSelector, FieldValue, IntegrityReport, MetadataRecord, RepairOutcome,
    ScoredDoc, StoredDocument, FIELD_CONTENT, FIELD_IDENTIFIER,
};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
struct MemorySegment {
    docs: Vec<StoredDocument>,
    damaged: bool,
}

#[derive(Debug, Default)]
struct LocationState {
    segments: Vec<MemorySegment>,
    checkpoint: Option<HarvestCheckpoint>,
    unreadable: bool,
    fail_open: bool,
    opens: usize,
    closes: usize,
    searches: usize,
}

#[derive(Default)]
struct StoreState {
    locations: HashMap<String, LocationState>,
    search_delay: Option<Duration>,
}

/// Index store keeping everything in process memory
#[derive(Clone)]
pub struct MemoryStore {
    fields: Arc<FieldRegistry>,
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new(fields: Arc<FieldRegistry>) -> Self {
        Self {
            fields,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    /// Add `records` as a new segment of an existing (or new) index
    pub fn append(&self, location: &str, records: &[MetadataRecord]) -> Result<()> {
        let docs = records.iter().map(|r| self.to_stored(r).0).collect();
        let mut state = self.state.lock();
        state
            .locations
            .entry(location.to_string())
            .or_default()
            .segments
            .push(MemorySegment {
                docs,
                damaged: false,
            });
        Ok(())
    }

    /// Mark one segment as unreadable
    pub fn corrupt_segment(&self, location: &str, segment: usize) {
        let mut state = self.state.lock();
        if let Some(seg) = state
            .locations
            .get_mut(location)
            .and_then(|l| l.segments.get_mut(segment))
        {
            seg.damaged = true;
        }
    }

    /// Make the whole index unreadable so it can neither be opened
    /// nor repaired
    pub fn make_unreadable(&self, location: &str) {
        let mut state = self.state.lock();
        state.locations.entry(location.to_string()).or_default().unreadable = true;
    }

    /// Make subsequent opens of `location` fail
    pub fn set_fail_open(&self, location: &str, fail: bool) {
        let mut state = self.state.lock();
        state.locations.entry(location.to_string()).or_default().fail_open = fail;
    }

    /// Sleep this long inside every search
    pub fn set_search_delay(&self, delay: Option<Duration>) {
        self.state.lock().search_delay = delay;
    }

    pub fn open_count(&self, location: &str) -> usize {
        self.with_location(location, |l| l.opens)
    }

    pub fn close_count(&self, location: &str) -> usize {
        self.with_location(location, |l| l.closes)
    }

    pub fn search_count(&self, location: &str) -> usize {
        self.with_location(location, |l| l.searches)
    }

    /// Opened and not yet closed instances of `location`
    pub fn live_count(&self, location: &str) -> usize {
        self.with_location(location, |l| l.opens - l.closes)
    }

    pub fn segment_count(&self, location: &str) -> usize {
        self.with_location(location, |l| l.segments.len())
    }

    fn with_location<T: Default>(&self, location: &str, f: impl FnOnce(&LocationState) -> T) -> T {
        self.state.lock().locations.get(location).map(f).unwrap_or_default()
    }

    fn to_stored(&self, record: &MetadataRecord) -> (StoredDocument, usize) {
        let (fields, skipped) = self.fields.normalize(record);
        (
            StoredDocument {
                identifier: record.identifier.clone(),
                payload: record.xml.clone(),
                fields,
            },
            skipped,
        )
    }
}

impl IndexStore for MemoryStore {
    fn open(&self, location: &str) -> Result<Box<dyn PhysicalIndex>> {
        let mut state = self.state.lock();
        let loc = state
            .locations
            .get_mut(location)
            .ok_or_else(|| IndexError::open_failed(location, "no such index"))?;
        if loc.unreadable {
            return Err(IndexError::open_failed(location, "index files unreadable"));
        }
        if loc.fail_open {
            return Err(IndexError::open_failed(location, "open refused"));
        }
        loc.opens += 1;

        Ok(Box::new(MemoryIndex {
            location: location.to_string(),
            segments: loc.segments.clone(),
            fields: Arc::clone(&self.fields),
            store: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }

    fn exists(&self, location: &str) -> bool {
        self.state.lock().locations.contains_key(location)
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.state.lock().locations.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn check_integrity(&self, location: &str) -> IntegrityReport {
        let state = self.state.lock();
        let Some(loc) = state.locations.get(location) else {
            return IntegrityReport::unopenable(location, "no index at this location");
        };
        if loc.unreadable {
            return IntegrityReport::unopenable(location, "index files unreadable");
        }

        let doc_count = loc.segments.iter().map(|s| s.docs.len() as u64).sum();
        let mut report = IntegrityReport::clean(location, doc_count);
        for (i, segment) in loc.segments.iter().enumerate() {
            if segment.damaged {
                report.clean = false;
                report.repairable = true;
                report.problems.push(format!("segment {i} cannot be read"));
                report.damaged_segments.push(format!("segment-{i}"));
                report.docs_at_risk += segment.docs.len() as u64;
            }
        }
        report
    }

    fn repair(&self, location: &str, report: &IntegrityReport) -> Result<RepairOutcome> {
        let mut state = self.state.lock();
        let loc = state
            .locations
            .get_mut(location)
            .filter(|l| !l.unreadable)
            .ok_or_else(|| IndexError::RepairFailed {
                location: location.to_string(),
                message: "index cannot be opened".to_string(),
            })?;

        let before = loc.segments.len();
        let lost: u64 = loc
            .segments
            .iter()
            .filter(|s| s.damaged)
            .map(|s| s.docs.len() as u64)
            .sum();
        loc.segments.retain(|s| !s.damaged);
        let kept = loc.segments.iter().map(|s| s.docs.len() as u64).sum();

        tracing::debug!(
            "Memory repair of '{}' dropped {} segment(s) (report listed {})",
            location,
            before - loc.segments.len(),
            report.damaged_segments.len()
        );

        Ok(RepairOutcome {
            location: location.to_string(),
            segments_dropped: before - loc.segments.len(),
            docs_lost: lost,
            docs_kept: kept,
            checkpoint_cleared: false,
        })
    }

    fn build(&self, location: &str, records: &[MetadataRecord]) -> Result<BuildStats> {
        let start = Instant::now();
        let mut skipped = 0;
        let docs = records
            .iter()
            .map(|r| {
                let (doc, s) = self.to_stored(r);
                skipped += s;
                doc
            })
            .collect();

        let mut state = self.state.lock();
        let loc = state.locations.entry(location.to_string()).or_default();
        loc.segments = vec![MemorySegment {
            docs,
            damaged: false,
        }];
        loc.unreadable = false;
        loc.checkpoint = Some(HarvestCheckpoint::now());

        Ok(BuildStats {
            location: location.to_string(),
            records_indexed: records.len(),
            values_skipped: skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn read_checkpoint(&self, location: &str) -> Result<Option<HarvestCheckpoint>> {
        Ok(self
            .state
            .lock()
            .locations
            .get(location)
            .and_then(|l| l.checkpoint.clone()))
    }

    fn write_checkpoint(&self, location: &str, checkpoint: &HarvestCheckpoint) -> Result<()> {
        let mut state = self.state.lock();
        state
            .locations
            .entry(location.to_string())
            .or_default()
            .checkpoint = Some(checkpoint.clone());
        Ok(())
    }

    fn clear_checkpoint(&self, location: &str) -> Result<bool> {
        let mut state = self.state.lock();
        Ok(state
            .locations
            .get_mut(location)
            .and_then(|l| l.checkpoint.take())
            .is_some())
    }
}

/// Point-in-time view of one in-memory index
struct MemoryIndex {
    location: String,
    segments: Vec<MemorySegment>,
    fields: Arc<FieldRegistry>,
    store: Arc<Mutex<StoreState>>,
    closed: AtomicBool,
}

impl MemoryIndex {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(AtomicOrdering::SeqCst) {
            return Err(IndexError::StorageError(format!(
                "index '{}' is closed",
                self.location
            )));
        }
        Ok(())
    }

    fn clause_score(&self, doc: &StoredDocument, clause: &QueryClause) -> Option<f32> {
        let matcher = |term: &str| -> bool {
            if clause.field == FIELD_IDENTIFIER {
                return doc.identifier == term;
            }
            if clause.field == FIELD_CONTENT {
                let term = term.to_lowercase();
                return doc
                    .fields
                    .values()
                    .flatten()
                    .any(|v| tokenize(&v.as_text()).any(|t| t == term));
            }
            let datatype = self
                .fields
                .get(&clause.field)
                .map(|f| f.datatype)
                .unwrap_or(FieldDataType::Text);
            let values = doc.fields.get(&clause.field).map(Vec::as_slice).unwrap_or(&[]);
            match datatype {
                FieldDataType::Text => {
                    let term = term.to_lowercase();
                    values
                        .iter()
                        .any(|v| tokenize(&v.as_text()).any(|t| t == term))
                }
                _ => values.iter().any(|v| v.as_text() == term),
            }
        };

        let terms: Vec<&str> = clause.terms.split_whitespace().collect();
        let matched = terms.iter().filter(|t| matcher(**t)).count();
        let ok = if clause.any_of {
            matched > 0
        } else {
            matched == terms.len()
        };
        ok.then_some(matched as f32)
    }

    fn in_range(&self, doc: &StoredDocument, range: &RangeClause) -> Result<bool> {
        let datatype = self
            .fields
            .get(&range.field)
            .map(|f| f.datatype)
            .ok_or_else(|| IndexError::SearchFailed(format!("unknown field '{}'", range.field)))?;
        let min = convert_bound(&range.field, datatype, range.min.as_ref())?;
        let max = convert_bound(&range.field, datatype, range.max.as_ref())?;

        Ok(doc
            .fields
            .get(&range.field)
            .into_iter()
            .flatten()
            .filter_map(|v| coerce(datatype, v))
            .any(|v| {
                min.as_ref().map_or(true, |lo| v.sort_cmp(lo) != Ordering::Less)
                    && max.as_ref().map_or(true, |hi| v.sort_cmp(hi) != Ordering::Greater)
            }))
    }
}

impl PhysicalIndex for MemoryIndex {
    fn location(&self) -> &str {
        &self.location
    }

    fn search(&self, plan: &QueryPlan) -> Result<Vec<ScoredDoc>> {
        self.ensure_open()?;
        let delay = {
            let mut store = self.store.lock();
            if let Some(loc) = store.locations.get_mut(&self.location) {
                loc.searches += 1;
            }
            store.search_delay
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let plan = plan.normalized();
        let mut hits = Vec::new();
        for (seg_ord, segment) in self.segments.iter().enumerate() {
            if segment.damaged {
                return Err(IndexError::SearchFailed(format!(
                    "segment {seg_ord} of '{}' cannot be read",
                    self.location
                )));
            }
            'docs: for (doc_id, doc) in segment.docs.iter().enumerate() {
                let mut score = 0.0;
                for clause in &plan.clauses {
                    match self.clause_score(doc, clause) {
                        Some(s) => score += s,
                        None => continue 'docs,
                    }
                }
                for range in &plan.ranges {
                    if !self.in_range(doc, range)? {
                        continue 'docs;
                    }
                }
                let sort_key = plan
                    .sort
                    .as_ref()
                    .and_then(|s| first_value(doc, &s.field));
                hits.push(ScoredDoc {
                    doc: ((seg_ord as u64) << 32) | doc_id as u64,
                    score: score.max(1.0),
                    sort_key,
                });
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc.cmp(&b.doc)));
        Ok(hits)
    }

    fn fetch_fields(&self, doc: DocKey, selector: &FieldSelector) -> Result<StoredDocument> {
        self.ensure_open()?;
        let seg_ord = (doc >> 32) as usize;
        let doc_id = (doc & 0xFFFF_FFFF) as usize;
        let stored = self
            .segments
            .get(seg_ord)
            .and_then(|s| s.docs.get(doc_id))
            .ok_or_else(|| {
                IndexError::SearchFailed(format!("document {doc} not in '{}'", self.location))
            })?;

        Ok(StoredDocument {
            identifier: stored.identifier.clone(),
            payload: if selector.payload {
                stored.payload.clone()
            } else {
                None
            },
            fields: stored
                .fields
                .iter()
                .filter(|(name, _)| selector.wants(name))
                .map(|(name, values)| (name.clone(), values.clone()))
                .collect(),
        })
    }

    fn doc_count(&self) -> u64 {
        self.segments.iter().map(|s| s.docs.len() as u64).sum()
    }

    fn close(&self) {
        if self.closed.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        if let Some(loc) = self.store.lock().locations.get_mut(&self.location) {
            loc.closes += 1;
        }
    }
}

fn first_value(doc: &StoredDocument, field: &str) -> Option<FieldValue> {
    if field == FIELD_IDENTIFIER {
        return Some(FieldValue::Text(doc.identifier.clone()));
    }
    doc.fields.get(field).and_then(|v| v.first()).cloned()
}

/// Lowercased alphanumeric tokens
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
