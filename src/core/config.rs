//! Configuration management for metaportal.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.
//! It also owns the field registry derived from the `[[fields]]`
//! section, which drives schema creation, value coercion and field
//! selector validation.

use crate::core::error::{IndexError, Result};
use crate::core::types::{FieldSelector, FieldValue, MetadataRecord, RESERVED_FIELDS};
use crate::core::xdg::XdgDirs;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory holding physical indexes and `aliases.json`
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

/// Session cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of cached search sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Seconds after the last access before a session expires
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Page size used when a request does not specify one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Largest page a request may ask for
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

/// Integrity check configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntegrityConfig {
    /// Delete the harvest checkpoint on every repair, not only when
    /// documents were lost
    #[serde(default = "default_reset_checkpoint")]
    pub reset_checkpoint_on_repair: bool,
}

/// Data type of a configured field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDataType {
    /// Untokenized, matched as a whole term
    String,
    /// Tokenized full text
    Text,
    /// Numeric, range-searchable
    Number,
    /// Timestamp, range-searchable
    DateTime,
}

/// One configured metadata field
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldConfig {
    pub name: String,

    #[serde(default = "default_datatype")]
    pub datatype: FieldDataType,

    /// Whether the value can be fetched back for result items
    #[serde(default = "default_stored")]
    pub stored: bool,

    /// Value indexed when a record carries no value for this field
    #[serde(default)]
    pub default: Option<String>,
}

/// One logical target and its initial physical indexes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetConfig {
    pub id: String,
    pub indexes: Vec<String>,
}

// Default value functions
fn default_index_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_sessions() -> usize {
    30
}

fn default_max_age_secs() -> u64 {
    300
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_size() -> usize {
    1000
}

fn default_reset_checkpoint() -> bool {
    true
}

fn default_datatype() -> FieldDataType {
    FieldDataType::Text
}

fn default_stored() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            reset_checkpoint_on_repair: default_reset_checkpoint(),
        }
    }
}

impl FieldConfig {
    /// Shorthand used by tests and fixtures
    pub fn new(name: &str, datatype: FieldDataType, stored: bool) -> Self {
        Self {
            name: name.to_string(),
            datatype,
            stored,
            default: None,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| IndexError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. METAPORTAL_CONFIG env var
    /// 2. XDG config file (~/.config/metaportal/config.toml)
    /// 3. ./metaportal.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("METAPORTAL_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("metaportal.toml").exists() {
                Self::from_file("metaportal.toml")?
            } else {
                Self::default()
            }
        };

        // Use the XDG data directory unless a storage root was given
        if env::var("METAPORTAL_INDEX_DIR").is_err()
            && config.storage.index_dir == default_index_dir()
        {
            config.storage.index_dir = xdg.storage_dir();
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        if let Ok(dir) = env::var("METAPORTAL_INDEX_DIR") {
            self.storage.index_dir = PathBuf::from(dir);
        }

        if let Ok(max) = env::var("METAPORTAL_CACHE_MAX_SESSIONS") {
            if let Ok(n) = max.parse() {
                self.cache.max_sessions = n;
            }
        }
        if let Ok(age) = env::var("METAPORTAL_CACHE_MAX_AGE_SECS") {
            if let Ok(secs) = age.parse() {
                self.cache.max_age_secs = secs;
            }
        }

        if let Ok(size) = env::var("METAPORTAL_DEFAULT_PAGE_SIZE") {
            if let Ok(n) = size.parse() {
                self.search.default_page_size = n;
            }
        }
        if let Ok(size) = env::var("METAPORTAL_MAX_PAGE_SIZE") {
            if let Ok(n) = size.parse() {
                self.search.max_page_size = n;
            }
        }

        if let Ok(reset) = env::var("METAPORTAL_RESET_CHECKPOINT_ON_REPAIR") {
            if let Ok(flag) = reset.parse() {
                self.integrity.reset_checkpoint_on_repair = flag;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_sessions == 0 {
            return Err(IndexError::ConfigError(
                "Cache max sessions must be non-zero".to_string(),
            ));
        }

        if self.cache.max_age_secs == 0 {
            return Err(IndexError::ConfigError(
                "Cache max age must be non-zero".to_string(),
            ));
        }

        if self.search.default_page_size == 0 {
            return Err(IndexError::ConfigError(
                "Default page size must be non-zero".to_string(),
            ));
        }

        if self.search.default_page_size > self.search.max_page_size {
            return Err(IndexError::ConfigError(
                "Default page size cannot exceed max page size".to_string(),
            ));
        }

        // Building the registry checks field names and defaults
        FieldRegistry::new(&self.fields)?;

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.id.trim().is_empty() {
                return Err(IndexError::ConfigError(
                    "Target id must not be empty".to_string(),
                ));
            }
            if !seen.insert(target.id.as_str()) {
                return Err(IndexError::ConfigError(format!(
                    "Duplicate target id '{}'",
                    target.id
                )));
            }
            if target.indexes.is_empty() {
                return Err(IndexError::ConfigError(format!(
                    "Target '{}' lists no physical indexes",
                    target.id
                )));
            }
        }

        Ok(())
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Index dir: {:?}", self.storage.index_dir);
        tracing::info!("  Cache max sessions: {}", self.cache.max_sessions);
        tracing::info!("  Cache max age: {}s", self.cache.max_age_secs);
        tracing::info!("  Default page size: {}", self.search.default_page_size);
        tracing::info!("  Max page size: {}", self.search.max_page_size);
        tracing::info!(
            "  Reset checkpoint on repair: {}",
            self.integrity.reset_checkpoint_on_repair
        );
        tracing::info!("  Fields: {}", self.fields.len());
        tracing::info!("  Targets: {}", self.targets.len());
    }
}

/// Lookup table over the configured fields
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: BTreeMap<String, FieldConfig>,
}

impl FieldRegistry {
    /// Build the registry, rejecting empty, duplicate or reserved names
    /// and defaults that do not convert to the field's type.
    pub fn new(fields: &[FieldConfig]) -> Result<Self> {
        let mut map = BTreeMap::new();
        for field in fields {
            if field.name.trim().is_empty() {
                return Err(IndexError::ConfigError(
                    "Field name must not be empty".to_string(),
                ));
            }
            if !field
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(IndexError::ConfigError(format!(
                    "Field name '{}' may only contain letters, digits and '_'",
                    field.name
                )));
            }
            if RESERVED_FIELDS.contains(&field.name.as_str()) {
                return Err(IndexError::ConfigError(format!(
                    "Field name '{}' is reserved",
                    field.name
                )));
            }
            if let Some(default) = &field.default {
                if coerce(field.datatype, &FieldValue::Text(default.clone())).is_none() {
                    return Err(IndexError::ConfigError(format!(
                        "Default '{}' of field '{}' is not a valid {:?}",
                        default, field.name, field.datatype
                    )));
                }
            }
            if map.insert(field.name.clone(), field.clone()).is_some() {
                return Err(IndexError::ConfigError(format!(
                    "Duplicate field '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { fields: map })
    }

    pub fn get(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldConfig> {
        self.fields.values()
    }

    /// Names of all configured fields, sorted
    pub fn names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Names of fields that can be returned in result items
    pub fn stored_names(&self) -> Vec<String> {
        self.fields
            .values()
            .filter(|f| f.stored)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Build a validated field selector.
    ///
    /// Unknown fields and fields that are not stored are rejected.
    pub fn selector<S: AsRef<str>>(&self, requested: &[S], payload: bool) -> Result<FieldSelector> {
        let mut fields = BTreeSet::new();
        for name in requested {
            let name = name.as_ref();
            match self.fields.get(name) {
                None => {
                    return Err(IndexError::InvalidQueryField {
                        field: name.to_string(),
                        message: "unknown field".to_string(),
                        valid_fields: self.stored_names(),
                        suggestion: None,
                    })
                }
                Some(f) if !f.stored => {
                    return Err(IndexError::InvalidQueryField {
                        field: name.to_string(),
                        message: "field is not stored".to_string(),
                        valid_fields: self.stored_names(),
                        suggestion: None,
                    })
                }
                Some(_) => {
                    fields.insert(name.to_string());
                }
            }
        }
        Ok(FieldSelector { fields, payload })
    }

    /// Selector over every stored field
    pub fn all_stored(&self, payload: bool) -> FieldSelector {
        FieldSelector {
            fields: self.stored_names().into_iter().collect(),
            payload,
        }
    }

    /// Convert a record's field values to the configured types.
    ///
    /// Unknown fields and values that do not convert are dropped with a
    /// warning; missing fields receive their configured default.
    /// Returns the normalized fields and the number of dropped values.
    pub fn normalize(&self, record: &MetadataRecord) -> (BTreeMap<String, Vec<FieldValue>>, usize) {
        let mut out = BTreeMap::new();
        let mut skipped = 0;

        for (name, values) in &record.fields {
            let Some(field) = self.fields.get(name) else {
                tracing::warn!(
                    "Record '{}': ignoring unknown field '{}'",
                    record.identifier,
                    name
                );
                skipped += values.len();
                continue;
            };
            let mut converted = Vec::with_capacity(values.len());
            for value in values {
                match coerce(field.datatype, value) {
                    Some(v) => converted.push(v),
                    None => {
                        tracing::warn!(
                            "Record '{}': value {:?} is not a valid {:?} for field '{}'",
                            record.identifier,
                            value,
                            field.datatype,
                            name
                        );
                        skipped += 1;
                    }
                }
            }
            if !converted.is_empty() {
                out.insert(name.clone(), converted);
            }
        }

        for field in self.fields.values() {
            if out.contains_key(&field.name) {
                continue;
            }
            if let Some(default) = &field.default {
                if let Some(v) = coerce(field.datatype, &FieldValue::Text(default.clone())) {
                    out.insert(field.name.clone(), vec![v]);
                }
            }
        }

        (out, skipped)
    }
}

/// Convert one value to a datatype, or None when it does not fit
pub fn coerce(datatype: FieldDataType, value: &FieldValue) -> Option<FieldValue> {
    match datatype {
        FieldDataType::String | FieldDataType::Text => Some(FieldValue::Text(value.as_text())),
        FieldDataType::Number => match value {
            FieldValue::Number(n) if n.is_finite() => Some(FieldValue::Number(*n)),
            FieldValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number),
            _ => None,
        },
        FieldDataType::DateTime => match value {
            FieldValue::Date(d) => Some(FieldValue::Date(*d)),
            FieldValue::Text(s) => parse_datetime(s).map(FieldValue::Date),
            _ => None,
        },
    }
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
