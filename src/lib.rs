//! metaportal - index lifecycle and query caching for a metadata portal
//!
//! Harvested metadata records live in physical inverted indexes (Tantivy).
//! Clients query stable logical target names; this crate keeps those
//! names pointing at the right physical indexes and serves paginated
//! results from a bounded cache of executed queries.
//!
//! # Architecture
//!
//! - **core**: Domain logic (protocol-agnostic)
//!   - config, error, types
//!   - storage (engine contract, Tantivy and in-memory engines,
//!     counted index handles, alias table, harvest checkpoints,
//!     integrity checking)
//!   - search (query plans, session cache, sessions, cursors)
//!   - admin (reindex cutover, check and repair)
//!   - services (unified service container)
//!
//! - **cli**: clap adapter (depends on core)
//!
//! # Key Features
//!
//! - Session cache with strict LRU eviction and single-flight misses
//! - Lazy cursors that fetch stored fields per requested position
//! - Zero-downtime alias cutover with copy-on-write publication
//! - Integrity check and repair that resets harvest checkpoints

// Core domain logic (protocol-agnostic)
pub mod core;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{IndexError, Result};
pub use core::services::Services;
pub use core::types::*;
