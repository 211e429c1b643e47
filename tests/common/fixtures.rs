// Test fixtures for integration testing

use metaportal::core::config::{FieldConfig, FieldDataType};
use metaportal::core::types::{FieldValue, MetadataRecord};

/// Field layout used across the integration tests
#[allow(dead_code)] // Used in integration tests
pub fn test_fields() -> Vec<FieldConfig> {
    vec![
        FieldConfig::new("title", FieldDataType::Text, true),
        FieldConfig::new("creator", FieldDataType::String, true),
        FieldConfig::new("subject", FieldDataType::Text, true),
        FieldConfig::new("year", FieldDataType::Number, true),
        FieldConfig::new("notes", FieldDataType::Text, false),
    ]
}

/// One record with a title, creator and year
#[allow(dead_code)] // Used in integration tests
pub fn record(identifier: &str, title: &str, creator: &str, year: f64) -> MetadataRecord {
    MetadataRecord::new(identifier)
        .with_field("title", FieldValue::Text(title.to_string()))
        .with_field("creator", FieldValue::Text(creator.to_string()))
        .with_field("year", FieldValue::Number(year))
        .with_xml(format!("<record><id>{identifier}</id></record>"))
}

/// `n` records whose titles all contain "survey"
#[allow(dead_code)] // Used in integration tests
pub fn sample_records(prefix: &str, n: usize) -> Vec<MetadataRecord> {
    (0..n)
        .map(|i| {
            record(
                &format!("oai:{prefix}:{i}"),
                &format!("{prefix} survey {i}"),
                "Geological Office",
                1950.0 + i as f64,
            )
        })
        .collect()
}
