//! Core domain logic (protocol-agnostic)
//!
//! This module contains all business logic that is independent
//! of the command-line adapter.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Domain data structures
//! - **storage**: Engine contract, index handles, aliases, integrity
//! - **search**: Query plans, session cache, result cursors
//! - **admin**: Reindex cutover and check/repair operations
//! - **services**: Unified service container

pub mod admin;
pub mod config;
pub mod error;
pub mod search;
pub mod services;
pub mod storage;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{IndexError, Result};
pub use services::Services;
