//! Main Database struct: generic CRUD over named collections.

use crate::collections::{
    CollectionSchema, CollectionStore, DirectorySource, DocumentSource, EmbeddedSource, Schema,
    DEFAULT_KEY_PREFIX,
};
use crate::error::{Result, StoreError};
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::types::{Document, Lookup, Record, RecordId, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Database configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory for persisted overrides. `None` keeps them in memory.
    pub storage_path: Option<PathBuf>,

    /// Directory of bundled documents. `None` uses the documents compiled
    /// into the crate.
    pub data_path: Option<PathBuf>,

    /// Byte quota for the override storage.
    pub quota_bytes: Option<usize>,

    /// Prefix of override keys.
    pub key_prefix: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            data_path: None,
            quota_bytes: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Read a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| StoreError::Deserialization(e.to_string()))
    }
}

/// The collection database.
///
/// Provides:
/// - Generic CRUD over any collection in its [`Schema`]
/// - Domain operations (authentication, sales, ranking, missions) built on top
/// - Reset of collections back to their bundled documents
pub struct Database {
    /// Document cache and override persistence.
    collections: CollectionStore,

    /// Persistent storage shared with session and avatar stores.
    storage: Arc<dyn KeyValueStorage>,

    /// Held across every read-modify-write.
    write_lock: Mutex<()>,
}

impl Database {
    /// Open a database from configuration.
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = match &config.storage_path {
            Some(path) => Arc::new(FileStorage::open_with_quota(path, config.quota_bytes)?),
            None => match config.quota_bytes {
                Some(quota) => Arc::new(MemoryStorage::with_quota(quota)),
                None => Arc::new(MemoryStorage::new()),
            },
        };

        let source: Box<dyn DocumentSource> = match &config.data_path {
            Some(path) => Box::new(DirectorySource::new(path)),
            None => Box::new(EmbeddedSource::default()),
        };

        let collections = CollectionStore::new(Schema::default(), source, Arc::clone(&storage))
            .with_key_prefix(config.key_prefix);

        Ok(Self::from_store(collections, storage))
    }

    /// In-memory database over the bundled documents.
    pub fn in_memory() -> Self {
        Self::with_parts(
            Schema::default(),
            Box::new(EmbeddedSource::default()),
            Arc::new(MemoryStorage::new()),
        )
    }

    /// Assemble a database from explicit components.
    pub fn with_parts(
        schema: Schema,
        source: Box<dyn DocumentSource>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let collections = CollectionStore::new(schema, source, Arc::clone(&storage));
        Self::from_store(collections, storage)
    }

    fn from_store(collections: CollectionStore, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            collections,
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// The persistent storage area overrides are written to.
    pub fn storage(&self) -> Arc<dyn KeyValueStorage> {
        Arc::clone(&self.storage)
    }

    pub fn collections(&self) -> &CollectionStore {
        &self.collections
    }

    // --- Document Operations ---

    /// Load a collection's whole document.
    pub fn load(&self, collection: &str) -> Result<Document> {
        self.collections.load(collection)
    }

    /// Forget every cached document; overrides stay.
    pub fn clear_cache(&self) {
        self.collections.clear_cache();
    }

    /// Drop overrides and cache for one collection, or all when `None`.
    pub fn reset_to_original_data(&self, collection: Option<&str>) -> Result<()> {
        let _lock = self.write_lock.lock();
        self.collections.reset(collection)
    }

    /// Collections that have a persisted override.
    pub fn modified_collections(&self) -> Result<Vec<String>> {
        self.collections.modified_collections()
    }

    // --- Record Operations ---

    /// All records of a collection, in stored order.
    pub fn find_all(&self, collection: &str) -> Result<Vec<Record>> {
        let schema = self.collections.schema().get(collection)?;
        self.collections
            .read(collection, |doc| -> Result<Vec<Record>> {
                Ok(records_of(doc, schema)?.into_iter().cloned().collect())
            })?
    }

    /// The first record with the given id.
    pub fn find_by_id(&self, collection: &str, id: impl Into<RecordId>) -> Result<Lookup<Record>> {
        let id = id.into();
        let schema = self.collections.schema().get(collection)?;
        self.collections.read(collection, |doc| -> Result<Lookup<Record>> {
            let records = records_of(doc, schema)?;
            Ok(records
                .into_iter()
                .find(|r| RecordId::of(r) == Some(id))
                .cloned()
                .into())
        })?
    }

    /// Records whose `field` equals `value` exactly (no type coercion).
    pub fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Record>> {
        let schema = self.collections.schema().get(collection)?;
        self.collections.read(collection, |doc| -> Result<Vec<Record>> {
            let records = records_of(doc, schema)?;
            Ok(records
                .into_iter()
                .filter(|r| r.get(field) == Some(value))
                .cloned()
                .collect())
        })?
    }

    /// Insert a record. The id is always assigned here: one past the highest
    /// existing id, or 1 for an empty collection.
    pub fn create(&self, collection: &str, mut fields: Record) -> Result<Record> {
        let _lock = self.write_lock.lock();
        let schema = self.collections.schema().get(collection)?;

        let mut document = self.collections.load(collection)?;
        let records = records_mut(&mut document, schema)?;

        let id = match records
            .iter()
            .filter_map(|r| r.as_object().and_then(RecordId::of))
            .max()
        {
            Some(max) => max.next().ok_or_else(|| {
                StoreError::InvalidRecord(format!("{collection}: no id left after {max}"))
            })?,
            None => RecordId::FIRST,
        };

        fields.remove("id");
        let mut record = Record::new();
        record.insert("id".into(), Value::from(id.0));
        record.extend(fields);
        record.insert("created_at".into(), Value::from(Timestamp::now().to_iso()));

        records.push(Value::Object(record.clone()));
        self.collections.save(collection, document)?;

        Ok(record)
    }

    /// Merge `patch` over the record with the given id. Patch fields win,
    /// except `id`, which never changes.
    pub fn update(
        &self,
        collection: &str,
        id: impl Into<RecordId>,
        mut patch: Record,
    ) -> Result<Lookup<Record>> {
        let id = id.into();
        let _lock = self.write_lock.lock();
        let schema = self.collections.schema().get(collection)?;

        let mut document = self.collections.load(collection)?;
        let records = records_mut(&mut document, schema)?;

        let record = match records
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|r| RecordId::of(r) == Some(id))
        {
            Some(record) => record,
            None => return Ok(Lookup::NotFound),
        };

        patch.remove("id");
        record.extend(patch);
        record.insert("updated_at".into(), Value::from(Timestamp::now().to_iso()));
        let updated = record.clone();

        self.collections.save(collection, document)?;
        Ok(Lookup::Found(updated))
    }

    /// Delete the first record with the given id. Returns whether one was
    /// deleted; nothing is written otherwise.
    pub fn remove(&self, collection: &str, id: impl Into<RecordId>) -> Result<bool> {
        let id = id.into();
        let _lock = self.write_lock.lock();
        let schema = self.collections.schema().get(collection)?;

        let mut document = self.collections.load(collection)?;
        let records = records_mut(&mut document, schema)?;

        let index = records
            .iter()
            .position(|r| r.as_object().and_then(RecordId::of) == Some(id));

        match index {
            Some(index) => {
                records.remove(index);
                self.collections.save(collection, document)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run a read-modify-write on a whole document under the write lock.
    pub(crate) fn modify_document<R>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Document) -> Result<Option<R>>,
    ) -> Result<Option<R>> {
        let _lock = self.write_lock.lock();

        let mut document = self.collections.load(collection)?;
        let result = f(&mut document)?;
        if result.is_some() {
            self.collections.save(collection, document)?;
        }
        Ok(result)
    }
}

/// The records of a document. A missing field reads as empty.
fn records_of<'a>(document: &'a Document, schema: &CollectionSchema) -> Result<Vec<&'a Record>> {
    let items = match document.get(&schema.records_field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(not_an_array(schema)),
    };

    items
        .iter()
        .map(|item| {
            item.as_object().ok_or_else(|| {
                StoreError::InvalidFormat(format!("{}: records must be JSON objects", schema.name))
            })
        })
        .collect()
}

fn records_mut<'a>(document: &'a mut Document, schema: &CollectionSchema) -> Result<&'a mut Vec<Value>> {
    let object = document.as_object_mut().ok_or_else(|| {
        StoreError::InvalidFormat(format!("{}: document is not a JSON object", schema.name))
    })?;

    let field = object
        .entry(schema.records_field.clone())
        .or_insert_with(|| Value::Array(Vec::new()));
    if field.is_null() {
        *field = Value::Array(Vec::new());
    }

    field.as_array_mut().ok_or_else(|| not_an_array(schema))
}

fn not_an_array(schema: &CollectionSchema) -> StoreError {
    StoreError::InvalidFormat(format!(
        "{}: field {} is not an array",
        schema.name, schema.records_field
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stores_schema() -> CollectionSchema {
        CollectionSchema::new("stores")
    }

    #[test]
    fn test_records_of_missing_and_null_fields() {
        let schema = stores_schema();
        assert!(records_of(&json!({}), &schema).unwrap().is_empty());
        assert!(records_of(&json!({"stores": null}), &schema).unwrap().is_empty());
    }

    #[test]
    fn test_records_of_rejects_bad_shapes() {
        let schema = stores_schema();
        assert!(matches!(
            records_of(&json!({"stores": "x"}), &schema),
            Err(StoreError::InvalidFormat(_))
        ));
        assert!(matches!(
            records_of(&json!({"stores": [{"id": 1}, 2]}), &schema),
            Err(StoreError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_records_mut_creates_field() {
        let schema = stores_schema();
        let mut document = json!({"stores": null});
        records_mut(&mut document, &schema).unwrap().push(json!({"id": 1}));
        assert_eq!(document, json!({"stores": [{"id": 1}]}));

        let mut not_object = json!([1, 2]);
        assert!(records_mut(&mut not_object, &schema).is_err());
    }

    #[test]
    fn test_create_ignores_caller_id_and_stamps() {
        let db = Database::in_memory();
        let mut fields = Record::new();
        fields.insert("id".into(), json!(1));
        fields.insert("name".into(), json!("Loja Swift - Moema"));

        let created = db.create("stores", fields).unwrap();
        assert_eq!(created["id"], 3);
        assert_eq!(created["name"], "Loja Swift - Moema");
        assert!(created["created_at"].as_str().unwrap().ends_with('Z'));
        assert_eq!(db.find_all("stores").unwrap().len(), 3);
    }

    #[test]
    fn test_remove_missing_writes_nothing() {
        let db = Database::in_memory();
        assert!(!db.remove("stores", 42u64).unwrap());
        assert!(db.modified_collections().unwrap().is_empty());
    }

    #[test]
    fn test_find_by_id_first_match() {
        let db = Database::in_memory();
        let store = db.find_by_id("stores", 2u64).unwrap().found().unwrap();
        assert_eq!(store["name"], "Loja Swift - Pinheiros");
        assert!(db.find_by_id("stores", 0u64).unwrap().is_not_found());
    }

    #[test]
    fn test_open_in_memory_with_quota() {
        let db = Database::open(DatabaseConfig {
            quota_bytes: Some(16),
            ..Default::default()
        })
        .unwrap();

        db.remove("stores", 1u64).unwrap();
        assert!(db.find_by_id("stores", 1u64).unwrap().is_not_found());
        assert!(db.modified_collections().unwrap().is_empty());
    }
}
