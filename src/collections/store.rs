//! Loading, caching and persisting collection documents.

use super::schema::{CollectionSchema, Schema};
use super::source::DocumentSource;
use crate::error::{Result, StoreError};
use crate::storage::KeyValueStorage;
use crate::types::Document;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default prefix of override keys.
pub const DEFAULT_KEY_PREFIX: &str = "swift_db_";

/// What happened to a saved document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Cached and written to the override storage.
    Persisted,

    /// Cached only; the override write failed for the given reason and the
    /// change will not survive a restart.
    CacheOnly(String),
}

impl SaveOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, SaveOutcome::Persisted)
    }
}

/// Owns the document cache for one database.
///
/// Reads prefer, in order: the cache, a persisted override, the bundled
/// document. Writes always update the cache and then try the override.
pub struct CollectionStore {
    schema: Schema,

    /// Bundled documents.
    source: Box<dyn DocumentSource>,

    /// Persistent storage for overrides.
    overrides: Arc<dyn KeyValueStorage>,

    key_prefix: String,

    /// Parsed documents by collection name.
    cache: Mutex<HashMap<String, Document>>,
}

impl CollectionStore {
    pub fn new(
        schema: Schema,
        source: Box<dyn DocumentSource>,
        overrides: Arc<dyn KeyValueStorage>,
    ) -> Self {
        Self {
            schema,
            source,
            overrides,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Storage key of a collection's override.
    pub fn override_key(&self, collection: &str) -> String {
        format!("{}{}", self.key_prefix, collection)
    }

    /// Load a collection's document, caching it on first access.
    pub fn load(&self, collection: &str) -> Result<Document> {
        self.read(collection, Document::clone)
    }

    /// Run `f` against the cached document without copying it.
    pub fn read<R>(&self, collection: &str, f: impl FnOnce(&Document) -> R) -> Result<R> {
        let schema = self.schema.get(collection)?;
        let mut cache = self.cache.lock();

        if let Some(document) = cache.get(collection) {
            debug!(collection, "cache hit");
            return Ok(f(document));
        }

        let document = self.load_uncached(schema)?;
        let result = f(&document);
        cache.insert(collection.to_string(), document);
        Ok(result)
    }

    fn load_uncached(&self, schema: &CollectionSchema) -> Result<Document> {
        let key = self.override_key(&schema.name);

        match self.overrides.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Document>(&raw) {
                Ok(document) => {
                    info!(collection = %schema.name, "loaded from override");
                    return Ok(document);
                }
                Err(e) => {
                    warn!(collection = %schema.name, error = %e, "corrupt override, falling back to bundled document");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(collection = %schema.name, error = %e, "failed to read override, falling back to bundled document");
            }
        }

        let raw = self
            .source
            .fetch(schema)
            .map_err(|e| StoreError::load(&schema.name, e.to_string()))?
            .ok_or_else(|| {
                StoreError::load(
                    &schema.name,
                    format!("no bundled document {}", schema.file_name),
                )
            })?;

        let document: Document = serde_json::from_str(&raw)
            .map_err(|e| StoreError::load(&schema.name, e.to_string()))?;

        info!(collection = %schema.name, "loaded from bundled document");
        Ok(document)
    }

    /// Replace a collection's document in the cache and try to persist it.
    ///
    /// A failed override write is logged and reported through the returned
    /// [`SaveOutcome`]; the cache keeps the new document either way.
    pub fn save(&self, collection: &str, document: Document) -> Result<SaveOutcome> {
        let schema = self.schema.get(collection)?;

        let serialized = serde_json::to_string(&document);
        let records = record_count(&document, schema);
        self.cache.lock().insert(collection.to_string(), document);

        let outcome = match serialized {
            Ok(raw) => match self.overrides.set(&self.override_key(collection), &raw) {
                Ok(()) => {
                    info!(collection, records, "saved override");
                    SaveOutcome::Persisted
                }
                Err(e) => {
                    error!(collection, error = %e, "failed to persist override, keeping cached copy");
                    SaveOutcome::CacheOnly(e.to_string())
                }
            },
            Err(e) => {
                error!(collection, error = %e, "failed to serialize document, keeping cached copy");
                SaveOutcome::CacheOnly(e.to_string())
            }
        };

        Ok(outcome)
    }

    /// Drop one collection from the cache, keeping its override.
    pub fn evict(&self, collection: &str) -> bool {
        self.cache.lock().remove(collection).is_some()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn is_cached(&self, collection: &str) -> bool {
        self.cache.lock().contains_key(collection)
    }

    /// Discard override and cache entry for one collection, or for every
    /// known collection when `collection` is `None`.
    pub fn reset(&self, collection: Option<&str>) -> Result<()> {
        match collection {
            Some(name) => {
                self.schema.get(name)?;
                self.reset_one(name)?;
                info!(collection = name, "reset to bundled document");
            }
            None => {
                let mut first_error = None;
                for name in self.schema.names() {
                    if let Err(e) = self.reset_one(name) {
                        warn!(collection = name, error = %e, "failed to reset collection");
                        first_error.get_or_insert(e);
                    }
                }
                if let Some(e) = first_error {
                    return Err(e);
                }
                info!("reset all collections to bundled documents");
            }
        }
        Ok(())
    }

    fn reset_one(&self, collection: &str) -> Result<()> {
        self.overrides.remove(&self.override_key(collection))?;
        self.cache.lock().remove(collection);
        Ok(())
    }

    /// Collections that currently have a persisted override.
    pub fn modified_collections(&self) -> Result<Vec<String>> {
        let mut modified = Vec::new();
        for name in self.schema.names() {
            if self.overrides.contains(&self.override_key(name))? {
                modified.push(name.to_string());
            }
        }
        Ok(modified)
    }
}

fn record_count(document: &Document, schema: &CollectionSchema) -> usize {
    document
        .get(&schema.records_field)
        .and_then(|v| v.as_array())
        .map(Vec::len)
        .unwrap_or(0)
}
