//! Index store engine contract.
//!
//! The lifecycle layer treats the inverted-index store as opaque: it
//! opens physical indexes by location, runs query plans against them,
//! fetches stored fields for a document key, and checks or repairs
//! their on-disk state. `TantivyStore` and `MemoryStore` implement it.

use crate::core::error::Result;
use crate::core::search::QueryPlan;
use crate::core::storage::checkpoint::HarvestCheckpoint;
use crate::core::types::{
    BuildStats, DocKey, FieldSelector, IntegrityReport, MetadataRecord, RepairOutcome, ScoredDoc,
    StoredDocument,
};

/// Factory and maintenance operations over physical index locations
pub trait IndexStore: Send + Sync {
    /// Open a physical index for searching
    fn open(&self, location: &str) -> Result<Box<dyn PhysicalIndex>>;

    /// Whether a physical index exists at `location`
    fn exists(&self, location: &str) -> bool;

    /// Locations of all physical indexes in the store
    fn list(&self) -> Result<Vec<String>>;

    /// Read-only integrity check.
    ///
    /// Never fails: a store that cannot be opened produces a report
    /// with `clean == false` and `repairable == false`.
    fn check_integrity(&self, location: &str) -> IntegrityReport;

    /// Drop unrecoverable segments, keeping every readable document.
    ///
    /// Requires exclusive access to `location`.
    fn repair(&self, location: &str, report: &IntegrityReport) -> Result<RepairOutcome>;

    /// Write `records` into a fresh physical index at `location`,
    /// replacing any previous content
    fn build(&self, location: &str, records: &[MetadataRecord]) -> Result<BuildStats>;

    /// Harvest-resumption checkpoint of a physical index
    fn read_checkpoint(&self, location: &str) -> Result<Option<HarvestCheckpoint>>;

    fn write_checkpoint(&self, location: &str, checkpoint: &HarvestCheckpoint) -> Result<()>;

    /// Delete the checkpoint. Returns whether one existed.
    fn clear_checkpoint(&self, location: &str) -> Result<bool>;

    fn has_checkpoint(&self, location: &str) -> Result<bool> {
        Ok(self.read_checkpoint(location)?.is_some())
    }
}

/// One opened physical index
pub trait PhysicalIndex: Send + Sync {
    fn location(&self) -> &str;

    /// Execute a plan, returning hits in descending score order
    fn search(&self, plan: &QueryPlan) -> Result<Vec<ScoredDoc>>;

    /// Fetch stored values of one document
    fn fetch_fields(&self, doc: DocKey, selector: &FieldSelector) -> Result<StoredDocument>;

    fn doc_count(&self) -> u64;

    /// Release engine resources. Called exactly once by the owning handle.
    fn close(&self);
}
