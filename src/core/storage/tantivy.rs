//! Tantivy-backed index store.
//!
//! Each physical index lives in its own directory under
//! `{index_dir}/indexes/{location}` together with its harvest
//! checkpoint. An opened index pins one searcher (manual reload
//! policy) so that the hit list of a session and every later stored
//! field fetch see the same point-in-time view.

use crate::core::config::{FieldDataType, FieldRegistry};
use crate::core::error::{IndexError, Result};
use crate::core::search::query::{convert_bound, escape_all_special};
use crate::core::search::{QueryClause, QueryPlan, RangeClause};
use crate::core::storage::checkpoint::{self, HarvestCheckpoint};
use crate::core::storage::engine::{IndexStore, PhysicalIndex};
use crate::core::types::{
    BuildStats, DocKey, FieldSelector, FieldValue, IntegrityReport, MetadataRecord, RepairOutcome,
    ScoredDoc, StoredDocument, FIELD_CONTENT, FIELD_IDENTIFIER, FIELD_PAYLOAD,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, EmptyQuery, Occur, Query, QueryParser, RangeQuery, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, OwnedValue, Schema, Value, FAST, INDEXED, STORED, STRING, TEXT,
};
use tantivy::{
    Directory, DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, Segment,
    SegmentReader, TantivyDocument, Term,
};
use walkdir::WalkDir;

/// Subdirectory of the storage root holding physical indexes
pub const INDEXES_DIR: &str = "indexes";

/// Writer heap size (50MB)
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Create the Tantivy schema for the configured fields
///
/// Fixed fields:
/// - identifier: record identifier (STRING | STORED)
/// - xml: raw payload (STORED)
/// - content: catch-all full text over every field value (TEXT)
///
/// Configured fields map string to STRING, text to TEXT, number to
/// an f64 field and datetime to a date field; numeric and date fields
/// are INDEXED | FAST for range queries. STORED follows the config.
pub fn create_schema(fields: &FieldRegistry) -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(FIELD_IDENTIFIER, STRING | STORED);
    builder.add_text_field(FIELD_PAYLOAD, STORED);
    builder.add_text_field(FIELD_CONTENT, TEXT);

    for field in fields.iter() {
        let name = field.name.as_str();
        match (field.datatype, field.stored) {
            (FieldDataType::String, true) => builder.add_text_field(name, STRING | STORED),
            (FieldDataType::String, false) => builder.add_text_field(name, STRING),
            (FieldDataType::Text, true) => builder.add_text_field(name, TEXT | STORED),
            (FieldDataType::Text, false) => builder.add_text_field(name, TEXT),
            (FieldDataType::Number, true) => builder.add_f64_field(name, INDEXED | FAST | STORED),
            (FieldDataType::Number, false) => builder.add_f64_field(name, INDEXED | FAST),
            (FieldDataType::DateTime, true) => {
                builder.add_date_field(name, INDEXED | FAST | STORED)
            }
            (FieldDataType::DateTime, false) => builder.add_date_field(name, INDEXED | FAST),
        };
    }

    builder.build()
}

/// Location names are plain directory names
pub fn validate_location(location: &str) -> Result<()> {
    let valid = !location.is_empty()
        && !location.starts_with('.')
        && location
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(IndexError::ConfigError(format!(
            "Invalid index location '{location}'"
        )))
    }
}

/// Schema fields resolved once per opened index
#[derive(Debug, Clone)]
struct SchemaFields {
    identifier: Field,
    payload: Field,
    content: Field,
    by_name: HashMap<String, (Field, FieldDataType)>,
}

impl SchemaFields {
    fn resolve(schema: &Schema, registry: &FieldRegistry) -> Result<Self> {
        let fixed = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| IndexError::StorageError(format!("Missing {name} field: {e}")))
        };

        let mut by_name = HashMap::new();
        for field in registry.iter() {
            match schema.get_field(&field.name) {
                Ok(f) => {
                    by_name.insert(field.name.clone(), (f, field.datatype));
                }
                Err(_) => tracing::debug!("Field '{}' not present in index schema", field.name),
            }
        }

        Ok(Self {
            identifier: fixed(FIELD_IDENTIFIER)?,
            payload: fixed(FIELD_PAYLOAD)?,
            content: fixed(FIELD_CONTENT)?,
            by_name,
        })
    }

    fn lookup(&self, name: &str) -> Result<(Field, FieldDataType)> {
        self.by_name.get(name).copied().ok_or_else(|| {
            IndexError::SearchFailed(format!("field '{name}' is not part of the index schema"))
        })
    }

    fn to_document(
        &self,
        registry: &FieldRegistry,
        record: &MetadataRecord,
    ) -> (TantivyDocument, usize) {
        let (values, skipped) = registry.normalize(record);
        let mut doc = TantivyDocument::default();

        doc.add_text(self.identifier, &record.identifier);
        if let Some(xml) = &record.xml {
            doc.add_text(self.payload, xml);
        }

        let mut content = Vec::new();
        for (name, vals) in &values {
            let Some(&(field, datatype)) = self.by_name.get(name) else {
                continue;
            };
            for value in vals {
                content.push(value.as_text());
                match (datatype, value) {
                    (FieldDataType::Number, FieldValue::Number(n)) => doc.add_f64(field, *n),
                    (FieldDataType::DateTime, FieldValue::Date(d)) => {
                        doc.add_date(field, to_tantivy_date(d))
                    }
                    (_, other) => doc.add_text(field, other.as_text()),
                }
            }
        }
        if !content.is_empty() {
            doc.add_text(self.content, content.join(" "));
        }

        (doc, skipped)
    }
}

/// Tantivy index store rooted at the configured storage directory
#[derive(Debug, Clone)]
pub struct TantivyStore {
    root: PathBuf,
    fields: Arc<FieldRegistry>,
}

impl TantivyStore {
    pub fn new(root: impl Into<PathBuf>, fields: Arc<FieldRegistry>) -> Self {
        Self {
            root: root.into(),
            fields,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a physical index
    pub fn index_dir(&self, location: &str) -> Result<PathBuf> {
        validate_location(location)?;
        Ok(self.root.join(INDEXES_DIR).join(location))
    }

    /// Commit `records` as an additional segment of an existing index
    pub fn append(&self, location: &str, records: &[MetadataRecord]) -> Result<usize> {
        let dir = self.index_dir(location)?;
        let index = Index::open_in_dir(&dir).map_err(|e| IndexError::open_failed(location, e))?;
        self.write_records(&index, records)
    }

    fn write_records(&self, index: &Index, records: &[MetadataRecord]) -> Result<usize> {
        let fields = SchemaFields::resolve(&index.schema(), &self.fields)?;

        let mut writer: IndexWriter = index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|e| IndexError::StorageError(format!("Failed to create writer: {e}")))?;

        let mut skipped = 0;
        for record in records {
            let (doc, s) = fields.to_document(&self.fields, record);
            skipped += s;
            writer
                .add_document(doc)
                .map_err(|e| IndexError::StorageError(format!("Failed to add document: {e}")))?;
        }

        writer
            .commit()
            .map_err(|e| IndexError::StorageError(format!("Failed to commit: {e}")))?;
        writer
            .wait_merging_threads()
            .map_err(|e| IndexError::StorageError(format!("Failed to finish merges: {e}")))?;

        Ok(skipped)
    }
}

impl IndexStore for TantivyStore {
    fn open(&self, location: &str) -> Result<Box<dyn PhysicalIndex>> {
        let dir = self.index_dir(location)?;
        if !dir.join("meta.json").exists() {
            return Err(IndexError::open_failed(location, "no index at this location"));
        }

        let index = Index::open_in_dir(&dir).map_err(|e| IndexError::open_failed(location, e))?;
        let fields = SchemaFields::resolve(&index.schema(), &self.fields)
            .map_err(|e| IndexError::open_failed(location, e))?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| IndexError::open_failed(location, e))?;
        let searcher = reader.searcher();
        let doc_count = searcher.num_docs();

        Ok(Box::new(TantivyPhysicalIndex {
            location: location.to_string(),
            doc_count,
            state: RwLock::new(Some(OpenIndex {
                index,
                _reader: reader,
                searcher,
                fields,
            })),
        }))
    }

    fn exists(&self, location: &str) -> bool {
        self.index_dir(location)
            .map(|dir| dir.join("meta.json").exists())
            .unwrap_or(false)
    }

    fn list(&self) -> Result<Vec<String>> {
        let dir = self.root.join(INDEXES_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().join("meta.json").exists() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn check_integrity(&self, location: &str) -> IntegrityReport {
        let dir = match self.index_dir(location) {
            Ok(dir) => dir,
            Err(e) => return IntegrityReport::unopenable(location, e.to_string()),
        };
        if !dir.join("meta.json").exists() {
            return IntegrityReport::unopenable(location, "meta.json is missing");
        }

        let index = match Index::open_in_dir(&dir) {
            Ok(index) => index,
            Err(e) => return IntegrityReport::unopenable(location, format!("cannot open: {e}")),
        };
        let segments = match index.searchable_segments() {
            Ok(segments) => segments,
            Err(e) => {
                return IntegrityReport::unopenable(location, format!("cannot list segments: {e}"))
            }
        };
        let damaged_files = match index.validate_checksum() {
            Ok(files) => files,
            Err(e) => {
                return IntegrityReport::unopenable(
                    location,
                    format!("checksum validation failed: {e}"),
                )
            }
        };

        let doc_count = segments.iter().map(|s| s.meta().num_docs() as u64).sum();
        let mut report = IntegrityReport::clean(location, doc_count);
        report.size_bytes = calculate_directory_size(&dir);
        let mut claimed = HashSet::new();

        for segment in &segments {
            let meta = segment.meta();
            let id = meta.id().uuid_string();
            let mut problems = Vec::new();

            for path in meta.list_files() {
                if damaged_files.contains(&path) {
                    problems.push(format!("checksum mismatch in {}", path.display()));
                    claimed.insert(path);
                }
            }
            if problems.is_empty() {
                if let Err(e) = read_segment(segment) {
                    problems.push(format!("segment {id} cannot be read: {e}"));
                }
            }

            if !problems.is_empty() {
                report.clean = false;
                report.repairable = true;
                report.problems.extend(problems);
                report.damaged_segments.push(id);
                report.docs_at_risk += meta.num_docs() as u64;
            }
        }

        for path in damaged_files.difference(&claimed) {
            tracing::debug!(
                "Ignoring damaged file {} outside the searchable segments of '{}'",
                path.display(),
                location
            );
        }

        report
    }

    fn repair(&self, location: &str, report: &IntegrityReport) -> Result<RepairOutcome> {
        let fail = |message: String| IndexError::RepairFailed {
            location: location.to_string(),
            message,
        };
        if !report.repairable {
            return Err(fail("index is not repairable".to_string()));
        }

        // The report may be stale; act on the current state
        let current = self.check_integrity(location);
        if current.clean {
            return Ok(RepairOutcome::unchanged(location, current.doc_count));
        }
        if !current.repairable {
            return Err(fail(current.problems.join("; ")));
        }

        let dir = self.index_dir(location)?;
        let index = Index::open_in_dir(&dir).map_err(|e| fail(format!("cannot open: {e}")))?;
        let mut metas = index
            .load_metas()
            .map_err(|e| fail(format!("cannot load index meta: {e}")))?;

        let damaged: HashSet<&str> = current.damaged_segments.iter().map(String::as_str).collect();
        let before = metas.segments.len();
        let docs_lost: u64 = metas
            .segments
            .iter()
            .filter(|m| damaged.contains(m.id().uuid_string().as_str()))
            .map(|m| m.num_docs() as u64)
            .sum();
        metas
            .segments
            .retain(|m| !damaged.contains(m.id().uuid_string().as_str()));
        let docs_kept = metas.segments.iter().map(|m| m.num_docs() as u64).sum();

        let mut json = serde_json::to_vec_pretty(&metas)?;
        json.push(b'\n');
        index
            .directory()
            .atomic_write(Path::new("meta.json"), &json)
            .map_err(|e| fail(format!("cannot write index meta: {e}")))?;

        let after = self.check_integrity(location);
        if !after.clean {
            return Err(fail(format!(
                "index still corrupt after dropping segments: {}",
                after.problems.join("; ")
            )));
        }

        Ok(RepairOutcome {
            location: location.to_string(),
            segments_dropped: before - metas.segments.len(),
            docs_lost,
            docs_kept,
            checkpoint_cleared: false,
        })
    }

    fn build(&self, location: &str, records: &[MetadataRecord]) -> Result<BuildStats> {
        let start = Instant::now();
        let dir = self.index_dir(location)?;

        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;

        let index = Index::create_in_dir(&dir, create_schema(&self.fields))
            .map_err(|e| IndexError::StorageError(format!("Failed to create index: {e}")))?;
        let skipped = self.write_records(&index, records)?;

        checkpoint::write(
            &dir,
            &HarvestCheckpoint {
                harvested_at: Utc::now(),
                marker: None,
            },
        )?;

        Ok(BuildStats {
            location: location.to_string(),
            records_indexed: records.len(),
            values_skipped: skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn read_checkpoint(&self, location: &str) -> Result<Option<HarvestCheckpoint>> {
        checkpoint::read(&self.index_dir(location)?)
    }

    fn write_checkpoint(&self, location: &str, checkpoint: &HarvestCheckpoint) -> Result<()> {
        let dir = self.index_dir(location)?;
        if !dir.exists() {
            return Err(IndexError::StorageError(format!(
                "No index directory for '{location}'"
            )));
        }
        checkpoint::write(&dir, checkpoint)
    }

    fn clear_checkpoint(&self, location: &str) -> Result<bool> {
        checkpoint::clear(&self.index_dir(location)?)
    }
}

/// Calculate total size of a directory recursively
fn calculate_directory_size(dir_path: &Path) -> u64 {
    WalkDir::new(dir_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Read back every live stored document of a segment
fn read_segment(segment: &Segment) -> tantivy::Result<()> {
    let reader = SegmentReader::open(segment)?;
    let store = reader.get_store_reader(0)?;
    for doc_id in reader.doc_ids_alive() {
        store.get::<TantivyDocument>(doc_id)?;
    }
    Ok(())
}

struct OpenIndex {
    index: Index,
    _reader: IndexReader,
    searcher: Searcher,
    fields: SchemaFields,
}

impl OpenIndex {
    fn build_query(&self, plan: &QueryPlan) -> Result<Box<dyn Query>> {
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for clause in &plan.clauses {
            subqueries.push((Occur::Must, self.clause_query(clause)?));
        }
        for range in &plan.ranges {
            subqueries.push((Occur::Must, self.range_query(range)?));
        }
        if subqueries.is_empty() {
            return Err(IndexError::InvalidQuery(
                "Query does not contain any constraints".to_string(),
            ));
        }
        Ok(Box::new(BooleanQuery::new(subqueries)))
    }

    fn clause_query(&self, clause: &QueryClause) -> Result<Box<dyn Query>> {
        let terms: Vec<&str> = clause.terms.split_whitespace().collect();

        if clause.field == FIELD_CONTENT {
            return self.text_query(self.fields.content, &terms, clause.any_of);
        }
        if clause.field == FIELD_IDENTIFIER {
            let queries = terms
                .iter()
                .map(|t| term_query(self.fields.identifier, t))
                .collect();
            return Ok(group(queries, clause.any_of));
        }

        let (field, datatype) = self.fields.lookup(&clause.field)?;
        let queries = match datatype {
            FieldDataType::Text => return self.text_query(field, &terms, clause.any_of),
            FieldDataType::String => terms.iter().map(|t| term_query(field, t)).collect(),
            FieldDataType::Number | FieldDataType::DateTime => terms
                .iter()
                .map(|t| exact_value_query(&clause.field, datatype, t))
                .collect(),
        };
        Ok(group(queries, clause.any_of))
    }

    fn text_query(&self, field: Field, terms: &[&str], any_of: bool) -> Result<Box<dyn Query>> {
        let mut parser = QueryParser::for_index(&self.index, vec![field]);
        if !any_of {
            parser.set_conjunction_by_default();
        }
        let escaped: Vec<String> = terms.iter().map(|t| escape_all_special(t)).collect();
        parser
            .parse_query(&escaped.join(" "))
            .map_err(|e| IndexError::InvalidQuery(format!("Failed to parse query: {e}")))
    }

    fn range_query(&self, range: &RangeClause) -> Result<Box<dyn Query>> {
        let (_, datatype) = self.fields.lookup(&range.field)?;
        let min = convert_bound(&range.field, datatype, range.min.as_ref())?;
        let max = convert_bound(&range.field, datatype, range.max.as_ref())?;

        match datatype {
            FieldDataType::Number => Ok(Box::new(RangeQuery::new_f64_bounds(
                range.field.clone(),
                f64_bound(min),
                f64_bound(max),
            ))),
            FieldDataType::DateTime => Ok(Box::new(RangeQuery::new_date_bounds(
                range.field.clone(),
                date_bound(min),
                date_bound(max),
            ))),
            _ => Err(IndexError::InvalidQuery(format!(
                "Field '{}' does not support range queries",
                range.field
            ))),
        }
    }

    fn fetch(&self, doc: DocKey) -> Result<TantivyDocument> {
        let address = decode_doc_key(doc);
        let readers = self.searcher.segment_readers();
        let in_range = readers
            .get(address.segment_ord as usize)
            .map(|r| address.doc_id < r.max_doc())
            .unwrap_or(false);
        if !in_range {
            return Err(IndexError::SearchFailed(format!(
                "document key {doc} is not part of this index"
            )));
        }
        self.searcher
            .doc::<TantivyDocument>(address)
            .map_err(|e| IndexError::SearchFailed(format!("Failed to retrieve document: {e}")))
    }

    fn first_value(&self, doc: &TantivyDocument, name: &str) -> Option<FieldValue> {
        if name == FIELD_IDENTIFIER {
            return doc
                .get_first(self.fields.identifier)
                .and_then(|v| v.as_str())
                .map(|s| FieldValue::Text(s.to_string()));
        }
        let (field, datatype) = self.fields.by_name.get(name).copied()?;
        doc.get_first(field)
            .and_then(|v| convert_stored(datatype, v))
    }
}

/// One opened physical index backed by Tantivy
pub struct TantivyPhysicalIndex {
    location: String,
    doc_count: u64,
    state: RwLock<Option<OpenIndex>>,
}

impl TantivyPhysicalIndex {
    fn closed_error(&self) -> IndexError {
        IndexError::StorageError(format!("index '{}' is closed", self.location))
    }
}

impl PhysicalIndex for TantivyPhysicalIndex {
    fn location(&self) -> &str {
        &self.location
    }

    fn search(&self, plan: &QueryPlan) -> Result<Vec<ScoredDoc>> {
        let guard = self.state.read();
        let open = guard.as_ref().ok_or_else(|| self.closed_error())?;

        let plan = plan.normalized();
        let query = open.build_query(&plan)?;
        let limit = (open.searcher.num_docs() as usize).max(1);

        let top_docs = open
            .searcher
            .search(&query, &TopDocs::with_limit(limit))
            .map_err(|e| IndexError::SearchFailed(format!("Search failed: {e}")))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc = encode_doc_key(address);
            let sort_key = match &plan.sort {
                Some(sort) => open.first_value(&open.fetch(doc)?, &sort.field),
                None => None,
            };
            hits.push(ScoredDoc {
                doc,
                score,
                sort_key,
            });
        }

        Ok(hits)
    }

    fn fetch_fields(&self, doc: DocKey, selector: &FieldSelector) -> Result<StoredDocument> {
        let guard = self.state.read();
        let open = guard.as_ref().ok_or_else(|| self.closed_error())?;
        let stored = open.fetch(doc)?;

        let identifier = stored
            .get_first(open.fields.identifier)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let payload = if selector.payload {
            stored
                .get_first(open.fields.payload)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        } else {
            None
        };

        let mut fields = std::collections::BTreeMap::new();
        for name in &selector.fields {
            let Some(&(field, datatype)) = open.fields.by_name.get(name) else {
                continue;
            };
            let values: Vec<FieldValue> = stored
                .get_all(field)
                .filter_map(|v| convert_stored(datatype, v))
                .collect();
            if !values.is_empty() {
                fields.insert(name.clone(), values);
            }
        }

        Ok(StoredDocument {
            identifier,
            payload,
            fields,
        })
    }

    fn doc_count(&self) -> u64 {
        self.doc_count
    }

    fn close(&self) {
        if self.state.write().take().is_some() {
            tracing::debug!("Released searcher of '{}'", self.location);
        }
    }
}

fn term_query(field: Field, text: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, text),
        IndexRecordOption::Basic,
    ))
}

/// Equality on a number or date field, as a closed range
fn exact_value_query(name: &str, datatype: FieldDataType, text: &str) -> Box<dyn Query> {
    let value = convert_bound(name, datatype, Some(&FieldValue::Text(text.to_string())))
        .ok()
        .flatten();
    match (datatype, value) {
        (FieldDataType::Number, Some(FieldValue::Number(n))) => Box::new(
            RangeQuery::new_f64_bounds(name.to_string(), Bound::Included(n), Bound::Included(n)),
        ),
        (FieldDataType::DateTime, Some(FieldValue::Date(d))) => {
            let d = to_tantivy_date(&d);
            Box::new(RangeQuery::new_date_bounds(
                name.to_string(),
                Bound::Included(d),
                Bound::Included(d),
            ))
        }
        _ => Box::new(EmptyQuery),
    }
}

/// Combine per-term queries: all must match, or any may
fn group(mut queries: Vec<Box<dyn Query>>, any_of: bool) -> Box<dyn Query> {
    if queries.len() == 1 {
        if let Some(single) = queries.pop() {
            return single;
        }
    }
    let occur = if any_of { Occur::Should } else { Occur::Must };
    Box::new(BooleanQuery::new(
        queries.into_iter().map(|q| (occur, q)).collect(),
    ))
}

fn f64_bound(value: Option<FieldValue>) -> Bound<f64> {
    match value {
        Some(FieldValue::Number(n)) => Bound::Included(n),
        _ => Bound::Unbounded,
    }
}

fn date_bound(value: Option<FieldValue>) -> Bound<tantivy::DateTime> {
    match value {
        Some(FieldValue::Date(d)) => Bound::Included(to_tantivy_date(&d)),
        _ => Bound::Unbounded,
    }
}

fn to_tantivy_date(d: &chrono::DateTime<Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_micros(d.timestamp_micros())
}

fn convert_stored(datatype: FieldDataType, value: &OwnedValue) -> Option<FieldValue> {
    match datatype {
        FieldDataType::String | FieldDataType::Text => {
            value.as_str().map(|s| FieldValue::Text(s.to_string()))
        }
        FieldDataType::Number => value.as_f64().map(FieldValue::Number),
        FieldDataType::DateTime => value
            .as_datetime()
            .and_then(|d| chrono::DateTime::from_timestamp_micros(d.into_timestamp_micros()))
            .map(FieldValue::Date),
    }
}

fn encode_doc_key(address: DocAddress) -> DocKey {
    ((address.segment_ord as u64) << 32) | address.doc_id as u64
}

fn decode_doc_key(doc: DocKey) -> DocAddress {
    DocAddress::new((doc >> 32) as u32, (doc & 0xFFFF_FFFF) as u32)
}
