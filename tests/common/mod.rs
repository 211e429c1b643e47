// Common test utilities and fixtures

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items
// Note: These may appear unused in unit tests but are used in integration tests
#[allow(unused_imports)]
pub use fixtures::{record, sample_records, test_fields};
#[allow(unused_imports)]
pub use helpers::{
    create_test_services, locations, memory_services, CountingExecutor, MemoryFixture,
};
