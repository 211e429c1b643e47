//! Core data types for the metaportal core.
//!
//! This module defines the data structures shared by the engine
//! contract, the session cache and the administration surface:
//! records, stored values, hits, result items and integrity reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Name of the stored identifier field present in every physical index
pub const FIELD_IDENTIFIER: &str = "identifier";

/// Name of the stored raw payload (original XML) field
pub const FIELD_PAYLOAD: &str = "xml";

/// Name of the catch-all full-text field
pub const FIELD_CONTENT: &str = "content";

/// Field names that configured fields may not reuse
pub const RESERVED_FIELDS: [&str; 3] = [FIELD_IDENTIFIER, FIELD_PAYLOAD, FIELD_CONTENT];

/// Opaque per-index document key handed out by an engine.
///
/// Only meaningful to the physical index that produced it.
pub type DocKey = u64;

/// A single stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl FieldValue {
    /// Render the value as text (used for the catch-all content field)
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Date(d) => d.to_rfc3339(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    /// Total order used for sorting hits.
    ///
    /// Values of different kinds order as Number < Date < Text.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Number(_) => 0,
            FieldValue::Date(_) => 1,
            FieldValue::Text(_) => 2,
        }
    }
}

/// A normalized metadata record ready for indexing.
///
/// Produced by the harvesting and transformation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Unique record identifier
    pub identifier: String,

    /// Raw document payload (the harvested XML)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml: Option<String>,

    /// Field values keyed by configured field name
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<FieldValue>>,
}

impl MetadataRecord {
    /// Create a record with no fields
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            xml: None,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style helper to add one field value
    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.entry(name.to_string()).or_default().push(value);
        self
    }

    /// Builder-style helper to set the raw payload
    pub fn with_xml(mut self, xml: impl Into<String>) -> Self {
        self.xml = Some(xml.into());
        self
    }
}

/// Which stored fields a result item carries.
///
/// Built through `FieldRegistry::selector`, which rejects unknown and
/// non-stored fields. The identifier is always returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    pub fields: BTreeSet<String>,
    pub payload: bool,
}

impl FieldSelector {
    /// Selector returning only the identifier
    pub fn identifier_only() -> Self {
        Self::default()
    }

    pub fn wants(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

/// Stored content of one document as returned by an engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub identifier: String,
    pub payload: Option<String>,
    pub fields: BTreeMap<String, Vec<FieldValue>>,
}

/// One hit reported by a physical index
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub doc: DocKey,
    pub score: f32,
    /// First stored value of the sort field, if the query sorts
    pub sort_key: Option<FieldValue>,
}

/// One hit of a session, tagged with the index it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Position of the physical index in the session's handle list
    pub index: usize,
    pub doc: DocKey,
    pub score: f32,
    pub sort_key: Option<FieldValue>,
}

/// One materialized search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultItem {
    /// Score normalized by the session's best score (0.0 < score <= 1.0)
    pub score: f32,

    /// Record identifier
    pub identifier: String,

    /// Selected stored fields
    pub fields: BTreeMap<String, Vec<FieldValue>>,

    /// Raw payload, when the selector asked for it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml: Option<String>,
}

/// One page of results returned by the request-serving layer
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub target: String,
    pub total: usize,
    pub offset: usize,
    pub items: Vec<ResultItem>,
    pub query_time_ms: u64,
}

/// Outcome of an integrity check on one physical index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Physical index location checked
    pub location: String,

    /// No problems found
    pub clean: bool,

    /// A repair may be attempted
    pub repairable: bool,

    /// Human-readable problem descriptions
    pub problems: Vec<String>,

    /// Segments that cannot be read back
    pub damaged_segments: Vec<String>,

    /// Documents contained in damaged segments
    pub docs_at_risk: u64,

    /// Documents across all segments
    pub doc_count: u64,

    /// Bytes on disk, when the engine can tell
    #[serde(default)]
    pub size_bytes: u64,

    /// Check timestamp
    pub checked_at: DateTime<Utc>,
}

impl IntegrityReport {
    /// Report for an index that passed every check
    pub fn clean(location: &str, doc_count: u64) -> Self {
        Self {
            location: location.to_string(),
            clean: true,
            repairable: false,
            problems: Vec::new(),
            damaged_segments: Vec::new(),
            docs_at_risk: 0,
            doc_count,
            size_bytes: 0,
            checked_at: Utc::now(),
        }
    }

    /// Report for an index whose store could not be opened at all
    pub fn unopenable(location: &str, problem: impl Into<String>) -> Self {
        Self {
            location: location.to_string(),
            clean: false,
            repairable: false,
            problems: vec![problem.into()],
            damaged_segments: Vec::new(),
            docs_at_risk: 0,
            doc_count: 0,
            size_bytes: 0,
            checked_at: Utc::now(),
        }
    }

    /// One-line summary for operators
    pub fn summary(&self) -> String {
        if self.clean {
            format!(
                "Index '{}' is clean ({} documents).",
                self.location, self.doc_count
            )
        } else if self.repairable {
            format!(
                "Index '{}' is corrupt: {} problem(s), {} damaged segment(s), {} document(s) at risk.",
                self.location,
                self.problems.len(),
                self.damaged_segments.len(),
                self.docs_at_risk
            )
        } else {
            format!(
                "Index '{}' is corrupt and cannot be repaired: {}",
                self.location,
                self.problems.join("; ")
            )
        }
    }
}

/// Outcome of a repair on one physical index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub location: String,
    pub segments_dropped: usize,
    pub docs_lost: u64,
    pub docs_kept: u64,
    pub checkpoint_cleared: bool,
}

impl RepairOutcome {
    /// Outcome for a repair that had nothing to do
    pub fn unchanged(location: &str, docs_kept: u64) -> Self {
        Self {
            location: location.to_string(),
            segments_dropped: 0,
            docs_lost: 0,
            docs_kept,
            checkpoint_cleared: false,
        }
    }

    /// One-line summary for operators
    pub fn summary(&self) -> String {
        format!(
            "Index '{}' repaired: {} segment(s) dropped, {} document(s) lost, {} kept{}.",
            self.location,
            self.segments_dropped,
            self.docs_lost,
            self.docs_kept,
            if self.checkpoint_cleared {
                ", harvest checkpoint cleared"
            } else {
                ""
            }
        )
    }
}

/// Statistics from building a physical index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Physical index location written
    pub location: String,

    /// Records written
    pub records_indexed: usize,

    /// Field values dropped because they did not convert to the field type
    pub values_skipped: usize,

    /// Build duration in milliseconds
    pub duration_ms: u64,
}
