// Test helper functions

use metaportal::core::config::{Config, FieldRegistry};
use metaportal::core::error::Result;
use metaportal::core::search::{QueryFingerprint, QueryPlan, SearchSession};
use metaportal::core::services::Services;
use metaportal::core::storage::{AliasTable, MemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use super::fixtures::test_fields;

/// Create test services with temporary Tantivy storage
#[allow(dead_code)] // Used in integration tests
pub fn create_test_services() -> (Services, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.storage.index_dir = temp_dir.path().to_path_buf();
    config.fields = test_fields();

    let services = Services::new(config).expect("Failed to create services");
    (services, temp_dir)
}

/// Services over an in-memory store, with its hooks
#[allow(dead_code)] // Used in integration tests
pub struct MemoryFixture {
    pub store: MemoryStore,
    pub services: Services,
    _temp_dir: TempDir,
}

/// Create services over a `MemoryStore` with the given cache capacity
#[allow(dead_code)] // Used in integration tests
pub fn memory_services(capacity: usize) -> MemoryFixture {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.storage.index_dir = temp_dir.path().to_path_buf();
    config.cache.max_sessions = capacity;
    config.fields = test_fields();

    let fields = Arc::new(FieldRegistry::new(&config.fields).expect("Invalid test fields"));
    let store = MemoryStore::new(Arc::clone(&fields));
    let services = Services::with_store(config, fields, Arc::new(store.clone()))
        .expect("Failed to create services");

    MemoryFixture {
        store,
        services,
        _temp_dir: temp_dir,
    }
}

/// Owned location list
#[allow(dead_code)] // Used in integration tests
pub fn locations(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Executor that counts how often the cache actually runs a query
#[allow(dead_code)] // Used in integration tests
#[derive(Clone)]
pub struct CountingExecutor {
    pub aliases: Arc<AliasTable>,
    pub calls: Arc<AtomicUsize>,
}

#[allow(dead_code)] // Used in integration tests
impl CountingExecutor {
    pub fn new(aliases: Arc<AliasTable>) -> Self {
        Self {
            aliases,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn run(&self, fingerprint: &QueryFingerprint, plan: &QueryPlan) -> Result<SearchSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.aliases.resolve(fingerprint.target())?;
        SearchSession::execute(fingerprint.clone(), plan, &entry)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
