//! Storage layer: physical indexes and their lifecycle.
//!
//! # Architecture
//!
//! - **IndexStore / PhysicalIndex**: opaque engine contract
//! - **TantivyStore**: on-disk engine backed by Tantivy
//! - **MemoryStore**: in-process engine with fault hooks, used by the test suite
//! - **IndexHandle**: reference-counted opened index, closed once
//! - **AliasTable**: logical target to physical index mapping
//! - **IndexIntegrityChecker**: check and repair with checkpoint reset
//!
//! # Storage Structure
//!
//! ```text
//! {index_dir}/
//! ├── aliases.json               # Persisted alias table
//! └── indexes/
//!     ├── {target}_v1/
//!     │   ├── lastharvested.json # Harvest checkpoint
//!     │   ├── meta.json          # Tantivy index meta
//!     │   └── [segment files]
//!     └── {target}_v2/
//! ```

pub mod aliases;
pub mod checkpoint;
pub mod engine;
mod handle;
pub mod integrity;
pub mod memory;
pub mod tantivy;

pub use aliases::{AliasEntry, AliasFile, AliasListener, AliasTable, SwapOutcome, ALIASES_FILE};
pub use checkpoint::HarvestCheckpoint;
pub use engine::{IndexStore, PhysicalIndex};
pub use handle::{IndexHandle, WeakIndexHandle};
pub use integrity::{CheckOutcome, IndexIntegrityChecker};
pub use memory::MemoryStore;
pub use self::tantivy::TantivyStore;
