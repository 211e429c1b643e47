//! Harvest-resumption checkpoints.
//!
//! Each physical index directory may carry a `lastharvested.json`
//! file recording when the harvester last completed. Incremental
//! harvesting resumes from it; deleting it forces a full re-harvest.

use crate::core::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// File name of the checkpoint inside a physical index directory
pub const CHECKPOINT_FILE: &str = "lastharvested.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestCheckpoint {
    /// When the last successful harvest finished
    pub harvested_at: DateTime<Utc>,

    /// Opaque resumption marker from the harvesting protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

impl HarvestCheckpoint {
    pub fn now() -> Self {
        Self {
            harvested_at: Utc::now(),
            marker: None,
        }
    }
}

/// Read the checkpoint in `dir`, if any
pub fn read(dir: &Path) -> Result<Option<HarvestCheckpoint>> {
    match fs::read_to_string(dir.join(CHECKPOINT_FILE)) {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn write(dir: &Path, checkpoint: &HarvestCheckpoint) -> Result<()> {
    let json = serde_json::to_string_pretty(checkpoint)?;
    fs::write(dir.join(CHECKPOINT_FILE), json)?;
    Ok(())
}

/// Delete the checkpoint in `dir`. Returns whether one existed.
pub fn clear(dir: &Path) -> Result<bool> {
    match fs::remove_file(dir.join(CHECKPOINT_FILE)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
