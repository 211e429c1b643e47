//! Logical target to physical index mapping.
//!
//! Readers resolve a target by cloning an `Arc` out of a read lock;
//! writers build a complete new map and publish it with a single
//! store, so no reader ever observes a half-applied swap. Writers are
//! serialized by a separate mutex and never block readers while they
//! open the new physical indexes.
//!
//! Every handle the table opens is also remembered weakly per location,
//! so callers can tell whether a physical index is still held by a
//! reader after it has been swapped out.

use crate::core::error::{IndexError, Result};
use crate::core::storage::engine::IndexStore;
use crate::core::storage::handle::{IndexHandle, WeakIndexHandle};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// File name of the persisted alias table inside the storage root
pub const ALIASES_FILE: &str = "aliases.json";

/// Current physical indexes of one logical target
#[derive(Debug)]
pub struct AliasEntry {
    target: String,
    handles: Vec<IndexHandle>,
    generation: u64,
}

impl AliasEntry {
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Handles in query order
    pub fn handles(&self) -> &[IndexHandle] {
        &self.handles
    }

    pub fn locations(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.location().to_string()).collect()
    }

    /// Table generation at which this entry was published
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Notified after a target has been repointed
pub trait AliasListener: Send + Sync {
    fn alias_swapped(&self, target: &str);
}

/// Result of a swap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapOutcome {
    pub target: String,
    pub previous: Vec<String>,
    pub current: Vec<String>,
    pub generation: u64,
}

impl SwapOutcome {
    pub fn summary(&self) -> String {
        if self.previous.is_empty() {
            format!(
                "Target '{}' now points to [{}].",
                self.target,
                self.current.join(", ")
            )
        } else {
            format!(
                "Target '{}' switched from [{}] to [{}].",
                self.target,
                self.previous.join(", "),
                self.current.join(", ")
            )
        }
    }
}

/// Persistable form of the alias table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasFile {
    pub targets: BTreeMap<String, Vec<String>>,
}

impl AliasFile {
    /// Load from `path`, or None if the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Write atomically through a temporary file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

type AliasMap = HashMap<String, Arc<AliasEntry>>;

/// Process-wide alias table
pub struct AliasTable {
    store: Arc<dyn IndexStore>,
    current: RwLock<Arc<AliasMap>>,
    writer: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn AliasListener>>>,
    opened: Mutex<HashMap<String, Vec<WeakIndexHandle>>>,
    generation: AtomicU64,
}

impl AliasTable {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            store,
            current: RwLock::new(Arc::new(HashMap::new())),
            writer: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            opened: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Register a listener called after every swap
    pub fn subscribe(&self, listener: Arc<dyn AliasListener>) {
        self.listeners.write().push(listener);
    }

    fn snapshot_map(&self) -> Arc<AliasMap> {
        Arc::clone(&self.current.read())
    }

    /// Current entry of `target`
    pub fn resolve(&self, target: &str) -> Result<Arc<AliasEntry>> {
        self.snapshot_map()
            .get(target)
            .cloned()
            .ok_or_else(|| IndexError::TargetNotFound(target.to_string()))
    }

    /// Repoint `target` to `locations`, opening each first.
    ///
    /// If any location fails to open the table is left unchanged and
    /// the error is returned. Handles of the previous entry are
    /// released after the new map is published.
    pub fn swap(&self, target: &str, locations: &[String]) -> Result<SwapOutcome> {
        if target.trim().is_empty() {
            return Err(IndexError::InvalidQuery(
                "Target id must not be empty".to_string(),
            ));
        }
        if locations.is_empty() {
            return Err(IndexError::InvalidQuery(format!(
                "Target '{target}' needs at least one physical index"
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = locations.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(IndexError::InvalidQuery(format!(
                "Physical index '{dup}' listed twice for target '{target}'"
            )));
        }

        let _writer = self.writer.lock();

        let mut handles = Vec::with_capacity(locations.len());
        for location in locations {
            handles.push(IndexHandle::open(self.store.as_ref(), location)?);
        }
        self.track(&handles);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = Arc::new(AliasEntry {
            target: target.to_string(),
            handles,
            generation,
        });

        let previous = {
            let mut current = self.current.write();
            let mut next: AliasMap = (**current).clone();
            let previous = next.insert(target.to_string(), entry);
            *current = Arc::new(next);
            previous
        };

        let outcome = SwapOutcome {
            target: target.to_string(),
            previous: previous.as_ref().map(|p| p.locations()).unwrap_or_default(),
            current: locations.to_vec(),
            generation,
        };

        for listener in self.listeners.read().iter() {
            listener.alias_swapped(target);
        }
        drop(previous);

        tracing::info!("{}", outcome.summary());
        Ok(outcome)
    }

    /// Known targets, sorted
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.snapshot_map().keys().cloned().collect();
        targets.sort();
        targets
    }

    /// Whether any target currently points at `location`
    pub fn is_aliased(&self, location: &str) -> bool {
        self.snapshot_map()
            .values()
            .any(|e| e.handles.iter().any(|h| h.location() == location))
    }

    /// Number of opened handles on `location` still held by anyone,
    /// whether or not a target points at it
    pub fn open_handles(&self, location: &str) -> usize {
        let mut opened = self.opened.lock();
        let Some(weak) = opened.get_mut(location) else {
            return 0;
        };
        weak.retain(WeakIndexHandle::is_open);
        let count = weak.len();
        if count == 0 {
            opened.remove(location);
        }
        count
    }

    fn track(&self, handles: &[IndexHandle]) {
        let mut opened = self.opened.lock();
        opened.retain(|_, weak| {
            weak.retain(WeakIndexHandle::is_open);
            !weak.is_empty()
        });
        for handle in handles {
            opened
                .entry(handle.location().to_string())
                .or_default()
                .push(handle.downgrade());
        }
    }

    /// Physical index name to build the next version of `target` into.
    ///
    /// Alternates between `{target}_v1` and `{target}_v2`.
    pub fn next_physical_name(&self, target: &str) -> String {
        let v1 = format!("{target}_v1");
        let serving_v1 = self
            .resolve(target)
            .map(|e| e.handles.iter().any(|h| h.location() == v1))
            .unwrap_or(false);
        if serving_v1 {
            format!("{target}_v2")
        } else {
            v1
        }
    }

    pub fn snapshot(&self) -> AliasFile {
        AliasFile {
            targets: self
                .snapshot_map()
                .iter()
                .map(|(target, entry)| (target.clone(), entry.locations()))
                .collect(),
        }
    }
}
