//! Per-entity-type registration of sequence configuration and accessors.

use crate::error::{ConfigError, ConfigResult};
use crate::{JsonFieldAccessor, Record, SequenceAccessor, SequenceConfig};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Configuration and accessor bound to one entity type.
pub struct Registration<E> {
    pub config: SequenceConfig,
    pub accessor: Arc<dyn SequenceAccessor<E>>,
}

impl<E> Clone for Registration<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<E> fmt::Debug for Registration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Registry of sequenced entity types, populated once at startup.
#[derive(Debug)]
pub struct SequenceRegistry<E> {
    entries: HashMap<String, Registration<E>>,
}

impl<E> Default for SequenceRegistry<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<E> SequenceRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type. Each type may be registered only once.
    pub fn register(
        &mut self,
        entity_type: impl Into<String>,
        config: SequenceConfig,
        accessor: Arc<dyn SequenceAccessor<E>>,
    ) -> ConfigResult<()> {
        let entity_type = entity_type.into();
        if self.entries.contains_key(&entity_type) {
            return Err(ConfigError::DuplicateRegistration(entity_type));
        }
        self.entries
            .insert(entity_type, Registration { config, accessor });
        Ok(())
    }

    pub fn get(&self, entity_type: &str) -> ConfigResult<&Registration<E>> {
        self.entries
            .get(entity_type)
            .ok_or_else(|| ConfigError::UnknownEntityType(entity_type.to_string()))
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.entries.contains_key(entity_type)
    }

    /// Registered entity type names, sorted.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    entity: BTreeMap<String, Map<String, Value>>,
}

impl SequenceRegistry<Record> {
    /// Registers a [`Record`] type with a [`JsonFieldAccessor`] bound to the
    /// configured field name.
    pub fn register_record(
        &mut self,
        entity_type: impl Into<String>,
        config: SequenceConfig,
    ) -> ConfigResult<()> {
        let accessor = Arc::new(JsonFieldAccessor::for_config(&config));
        self.register(entity_type, config, accessor)
    }

    /// Builds a registry from a TOML document with one `[entity.<type>]`
    /// table of overrides per entity type.
    pub fn from_toml_str(doc: &str) -> ConfigResult<Self> {
        let file: RegistryFile = toml::from_str(doc)?;
        let mut registry = Self::new();
        for (entity_type, overrides) in file.entity {
            let config = SequenceConfig::resolve(&overrides)?;
            registry.register_record(entity_type, config)?;
        }
        Ok(registry)
    }

    /// Registration for the record's own entity type.
    pub fn for_record(&self, record: &Record) -> ConfigResult<&Registration<Record>> {
        self.get(&record.entity_type)
    }
}
