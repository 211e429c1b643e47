//! Operations surface: reindex cutover and check/repair.
//!
//! Repair needs exclusive access to a physical index. Readers reach a
//! physical index only through handles the alias table opened, so an
//! index is free once no target points at it and every handle on it
//! has been released. Repair and rebuild are refused for any location
//! that is still aliased or still held by a session or cursor.

use crate::core::error::{IndexError, Result};
use crate::core::storage::{
    AliasTable, CheckOutcome, IndexIntegrityChecker, IndexStore, SwapOutcome,
};
use crate::core::types::{BuildStats, MetadataRecord};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Wildcard selecting every physical index in the store
pub const ALL_INDEXES: &str = "*";

/// Result of building a new physical index and switching to it
#[derive(Debug, Clone, Serialize)]
pub struct RebuildOutcome {
    pub build: BuildStats,
    pub swap: SwapOutcome,
}

impl RebuildOutcome {
    pub fn summary(&self) -> String {
        format!(
            "Built '{}' with {} record(s) in {}ms. {}",
            self.build.location,
            self.build.records_indexed,
            self.build.duration_ms,
            self.swap.summary()
        )
    }
}

/// Administrative operations
pub struct AdminService {
    store: Arc<dyn IndexStore>,
    aliases: Arc<AliasTable>,
    checker: IndexIntegrityChecker,
    alias_file: PathBuf,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn IndexStore>,
        aliases: Arc<AliasTable>,
        checker: IndexIntegrityChecker,
        alias_file: PathBuf,
    ) -> Self {
        Self {
            store,
            aliases,
            checker,
            alias_file,
        }
    }

    /// Point `target` at `locations` and persist the alias table
    pub fn trigger_reindex(&self, target: &str, locations: &[String]) -> Result<SwapOutcome> {
        let outcome = self.aliases.swap(target, locations)?;
        self.persist_aliases()?;
        Ok(outcome)
    }

    /// Check `location`, repairing it when `fix` is set.
    ///
    /// Fails with `IndexInUse` if a fix is requested for an index a
    /// target still points at or a reader still holds open.
    pub fn check_and_optionally_repair(&self, location: &str, fix: bool) -> Result<CheckOutcome> {
        if fix {
            self.ensure_unused(location, "repairing")?;
        }
        self.checker.check_and_optionally_repair(location, fix)
    }

    /// Check several locations; `*` expands to every index in the store
    pub fn check_all(
        &self,
        locations: &[String],
        fix: bool,
    ) -> Result<Vec<(String, Result<CheckOutcome>)>> {
        let locations = self.resolve_locations(locations)?;
        Ok(locations
            .into_iter()
            .map(|location| {
                let result = self.check_and_optionally_repair(&location, fix);
                (location, result)
            })
            .collect())
    }

    /// Expand `*` into the store's physical indexes
    pub fn resolve_locations(&self, locations: &[String]) -> Result<Vec<String>> {
        if locations.iter().any(|l| l == ALL_INDEXES) {
            return self.store.list();
        }
        Ok(locations.to_vec())
    }

    /// Build `records` into the alternate physical index of `target`
    /// and switch the target to it
    pub fn rebuild(&self, target: &str, records: &[MetadataRecord]) -> Result<RebuildOutcome> {
        let location = self.aliases.next_physical_name(target);
        self.ensure_unused(&location, "rebuilding")?;

        tracing::info!(
            "Rebuilding target '{}' into '{}' ({} record(s))",
            target,
            location,
            records.len()
        );
        let build = self.store.build(&location, records)?;
        let swap = self.trigger_reindex(target, &[location])?;
        Ok(RebuildOutcome { build, swap })
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn checker(&self) -> &IndexIntegrityChecker {
        &self.checker
    }

    fn ensure_unused(&self, location: &str, action: &str) -> Result<()> {
        if self.aliases.is_aliased(location) {
            return Err(IndexError::IndexInUse(format!(
                "'{location}' is served by a target; swap it out before {action}"
            )));
        }
        let open = self.aliases.open_handles(location);
        if open > 0 {
            return Err(IndexError::IndexInUse(format!(
                "'{location}' still has {open} open handle(s); retry once its readers finish"
            )));
        }
        Ok(())
    }

    fn persist_aliases(&self) -> Result<()> {
        self.aliases.snapshot().save(&self.alias_file)?;
        tracing::debug!("Saved alias table to {:?}", self.alias_file);
        Ok(())
    }
}
