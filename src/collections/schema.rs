//! Collection schema: which field of a document holds its records.

use crate::error::{Result, StoreError};

pub const USERS: &str = "users";
pub const STORES: &str = "stores";
pub const RANKINGS: &str = "rankings";
pub const MISSIONS: &str = "missions";
pub const SALES: &str = "sales";
pub const LEARNING_TRACKS: &str = "learning_tracks";

/// The collections every store knows about, in load order.
pub const KNOWN_COLLECTIONS: [&str; 6] = [USERS, STORES, RANKINGS, MISSIONS, SALES, LEARNING_TRACKS];

/// Shape of one collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionSchema {
    /// Logical name (`users`, `sales`, ...).
    pub name: String,

    /// Top-level document field holding the record array.
    pub records_field: String,

    /// File name of the bundled document.
    pub file_name: String,
}

impl CollectionSchema {
    /// Schema whose records field and file name follow the collection name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            records_field: name.clone(),
            file_name: format!("{name}.json"),
            name,
        }
    }

    pub fn with_records_field(mut self, field: impl Into<String>) -> Self {
        self.records_field = field.into();
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}

/// Registry of collection schemas, resolved once at configuration time.
#[derive(Clone, Debug)]
pub struct Schema {
    collections: Vec<CollectionSchema>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            collections: KNOWN_COLLECTIONS
                .iter()
                .map(|name| CollectionSchema::new(*name))
                .collect(),
        }
    }
}

impl Schema {
    /// A registry with no collections.
    pub fn empty() -> Self {
        Self {
            collections: Vec::new(),
        }
    }

    /// Add a collection, replacing any existing one with the same name.
    pub fn with(mut self, collection: CollectionSchema) -> Self {
        match self.collections.iter_mut().find(|c| c.name == collection.name) {
            Some(existing) => *existing = collection,
            None => self.collections.push(collection),
        }
        self
    }

    /// Look up a collection by name.
    pub fn get(&self, name: &str) -> Result<&CollectionSchema> {
        self.collections
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.iter().any(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionSchema> {
        self.collections.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_has_known_collections() {
        let schema = Schema::default();
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, KNOWN_COLLECTIONS.to_vec());

        let users = schema.get(USERS).unwrap();
        assert_eq!(users.records_field, "users");
        assert_eq!(users.file_name, "users.json");
    }

    #[test]
    fn test_unknown_collection() {
        let schema = Schema::default();
        assert!(matches!(
            schema.get("orders"),
            Err(StoreError::UnknownCollection(name)) if name == "orders"
        ));
    }

    #[test]
    fn test_with_replaces_existing() {
        let schema = Schema::default()
            .with(CollectionSchema::new(SALES).with_records_field("items"))
            .with(CollectionSchema::new("coupons").with_file_name("cupons.json"));

        assert_eq!(schema.get(SALES).unwrap().records_field, "items");
        assert_eq!(schema.get("coupons").unwrap().file_name, "cupons.json");
        assert_eq!(schema.names().count(), 7);
    }
}
