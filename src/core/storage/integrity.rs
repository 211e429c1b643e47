//! Integrity checking and repair of physical indexes.
//!
//! A repair can drop documents, so the harvest checkpoint of the
//! repaired index is reset and the next harvest starts from scratch.
//! With `reset_checkpoint_on_repair = false` the checkpoint is only
//! reset when the repair actually lost documents.

use crate::core::error::{IndexError, Result};
use crate::core::storage::engine::IndexStore;
use crate::core::types::{IntegrityReport, RepairOutcome};
use serde::Serialize;
use std::sync::Arc;

/// Result of a check, plus the repair if one was attempted
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub report: IntegrityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<RepairOutcome>,
}

impl CheckOutcome {
    /// Clean, or successfully repaired
    pub fn is_healthy(&self) -> bool {
        self.report.clean || self.repair.is_some()
    }

    pub fn summary(&self) -> String {
        match &self.repair {
            Some(repair) => format!("{} {}", self.report.summary(), repair.summary()),
            None => self.report.summary(),
        }
    }
}

/// Checks physical indexes and repairs them on request
pub struct IndexIntegrityChecker {
    store: Arc<dyn IndexStore>,
    reset_checkpoint_on_repair: bool,
}

impl IndexIntegrityChecker {
    pub fn new(store: Arc<dyn IndexStore>, reset_checkpoint_on_repair: bool) -> Self {
        Self {
            store,
            reset_checkpoint_on_repair,
        }
    }

    /// Read-only check of `location`
    pub fn check(&self, location: &str) -> IntegrityReport {
        let report = self.store.check_integrity(location);
        if report.clean {
            tracing::info!("{}", report.summary());
        } else {
            for problem in &report.problems {
                tracing::warn!("Index '{}': {}", location, problem);
            }
            tracing::warn!("{}", report.summary());
        }
        report
    }

    /// Repair `location` according to `report`.
    ///
    /// The caller must hold exclusive access to the index.
    pub fn repair(&self, location: &str, report: &IntegrityReport) -> Result<RepairOutcome> {
        if report.clean {
            let outcome = RepairOutcome::unchanged(location, report.doc_count);
            tracing::info!("Index '{}' is clean, nothing to repair", location);
            return Ok(outcome);
        }
        if !report.repairable {
            return Err(IndexError::RepairFailed {
                location: location.to_string(),
                message: format!("index is not repairable: {}", report.problems.join("; ")),
            });
        }

        // Reset first: a repair that dies halfway must not leave a
        // checkpoint claiming documents that are gone
        let mut cleared = false;
        if self.reset_checkpoint_on_repair {
            cleared = self.store.clear_checkpoint(location)?;
        }

        let mut outcome = self.store.repair(location, report)?;

        if !self.reset_checkpoint_on_repair && outcome.docs_lost > 0 {
            cleared = self.store.clear_checkpoint(location)?;
        }
        outcome.checkpoint_cleared = cleared;

        tracing::info!("{}", outcome.summary());
        Ok(outcome)
    }

    /// Check `location` and, when `fix` is set and the report allows
    /// it, repair
    pub fn check_and_optionally_repair(&self, location: &str, fix: bool) -> Result<CheckOutcome> {
        let report = self.check(location);

        if report.clean || !fix {
            return Ok(CheckOutcome {
                report,
                repair: None,
            });
        }

        if !report.repairable {
            tracing::error!(
                "Index '{}' cannot be repaired, no fix attempted",
                location
            );
            return Ok(CheckOutcome {
                report,
                repair: None,
            });
        }

        let repair = self.repair(location, &report)?;
        Ok(CheckOutcome {
            report,
            repair: Some(repair),
        })
    }

    /// Run `check_and_optionally_repair` on every location in turn
    pub fn check_all(
        &self,
        locations: &[String],
        fix: bool,
    ) -> Vec<(String, Result<CheckOutcome>)> {
        locations
            .iter()
            .map(|location| {
                let result = self.check_and_optionally_repair(location, fix);
                if let Err(e) = &result {
                    tracing::error!("Failed to check index '{}': {}", location, e);
                }
                (location.clone(), result)
            })
            .collect()
    }
}
