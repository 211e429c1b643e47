//! Unified service container for metaportal
//!
//! Provides shared access to all core services.

use crate::core::admin::AdminService;
use crate::core::config::{Config, FieldRegistry};
use crate::core::error::Result;
use crate::core::search::{SearchService, SessionCache};
use crate::core::storage::{
    AliasFile, AliasTable, IndexIntegrityChecker, IndexStore, TantivyStore, ALIASES_FILE,
};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

/// Unified services container
///
/// All adapters use this same struct for service access.
#[derive(Clone)]
pub struct Services {
    /// Application configuration
    pub config: Arc<Config>,

    /// Configured metadata fields
    pub fields: Arc<FieldRegistry>,

    /// Physical index engine
    pub store: Arc<dyn IndexStore>,

    /// Logical target to physical index mapping
    pub aliases: Arc<AliasTable>,

    /// Session cache shared by all searches
    pub cache: Arc<SessionCache>,

    /// Request-serving search entry point
    pub search: Arc<SearchService>,

    /// Reindex cutover and check/repair
    pub admin: Arc<AdminService>,
}

impl Services {
    /// Create services backed by a Tantivy store under the configured
    /// index directory
    pub fn new(config: Config) -> Result<Self> {
        let fields = Arc::new(FieldRegistry::new(&config.fields)?);
        fs::create_dir_all(&config.storage.index_dir)?;
        let store: Arc<dyn IndexStore> = Arc::new(TantivyStore::new(
            config.storage.index_dir.clone(),
            Arc::clone(&fields),
        ));
        Self::with_store(config, fields, store)
    }

    /// Create services over an existing store.
    ///
    /// The initial alias table comes from `aliases.json` in the index
    /// directory if present, otherwise from the configured targets.
    /// Targets whose indexes cannot be opened are skipped with a warning.
    pub fn with_store(
        config: Config,
        fields: Arc<FieldRegistry>,
        store: Arc<dyn IndexStore>,
    ) -> Result<Self> {
        let alias_file = config.storage.index_dir.join(ALIASES_FILE);

        let aliases = Arc::new(AliasTable::new(Arc::clone(&store)));
        let cache = Arc::new(SessionCache::new(
            config.cache.max_sessions,
            Duration::from_secs(config.cache.max_age_secs),
        ));
        aliases.subscribe(cache.clone());

        let initial = match AliasFile::load(&alias_file)? {
            Some(file) => {
                tracing::debug!("Loaded alias table from {:?}", alias_file);
                file.targets
            }
            None => config
                .targets
                .iter()
                .map(|t| (t.id.clone(), t.indexes.clone()))
                .collect::<BTreeMap<_, _>>(),
        };
        for (target, locations) in &initial {
            if let Err(e) = aliases.swap(target, locations) {
                tracing::warn!("Target '{}' not available: {}", target, e);
            }
        }

        let search = Arc::new(SearchService::new(
            Arc::clone(&aliases),
            Arc::clone(&cache),
            Arc::clone(&fields),
            config.search.default_page_size,
            config.search.max_page_size,
        ));

        let checker = IndexIntegrityChecker::new(
            Arc::clone(&store),
            config.integrity.reset_checkpoint_on_repair,
        );
        let admin = Arc::new(AdminService::new(
            Arc::clone(&store),
            Arc::clone(&aliases),
            checker,
            alias_file,
        ));

        Ok(Self {
            config: Arc::new(config),
            fields,
            store,
            aliases,
            cache,
            search,
            admin,
        })
    }
}
