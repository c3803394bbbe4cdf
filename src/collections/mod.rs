//! Named JSON collections.
//!
//! Each collection is one JSON document whose records live under a field
//! named by its [`CollectionSchema`]. Documents are loaded lazily, cached for
//! the lifetime of the [`CollectionStore`] and mirrored into an override
//! storage on every write.

mod schema;
mod source;
mod store;

pub use schema::{
    CollectionSchema, Schema, KNOWN_COLLECTIONS, LEARNING_TRACKS, MISSIONS, RANKINGS, SALES,
    STORES, USERS,
};
pub use source::{DirectorySource, DocumentSource, EmbeddedSource};
pub use store::{CollectionStore, SaveOutcome, DEFAULT_KEY_PREFIX};
