//! Query execution and session caching.
//!
//! - **QueryPlan / QueryFingerprint**: normalized queries and cache keys
//! - **SearchSession**: one executed query's hit set
//! - **SessionCache**: bounded LRU of sessions, single-flight on misses
//! - **ResultCursor**: lazy item materialization over a session
//! - **SearchService**: request-serving entry point

mod cache;
mod cursor;
pub mod query;
mod service;
mod session;

pub use cache::SessionCache;
pub use cursor::ResultCursor;
pub use query::{QueryClause, QueryFingerprint, QueryPlan, RangeClause, SortSpec};
pub use service::SearchService;
pub use session::SearchSession;
