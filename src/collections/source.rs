//! Sources of bundled (static) collection documents.

use super::schema::CollectionSchema;
use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Where the original, unmodified documents come from.
pub trait DocumentSource: Send + Sync {
    /// Raw JSON text of the bundled document, or `None` if there is none.
    fn fetch(&self, collection: &CollectionSchema) -> Result<Option<String>>;
}

/// Reads `<root>/<file_name>` from disk.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentSource for DirectorySource {
    fn fetch(&self, collection: &CollectionSchema) -> Result<Option<String>> {
        match fs::read_to_string(self.root.join(&collection.file_name)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Documents held in memory, keyed by file name.
///
/// `EmbeddedSource::default()` serves the documents shipped with the crate.
#[derive(Clone, Debug)]
pub struct EmbeddedSource {
    documents: BTreeMap<String, String>,
}

impl Default for EmbeddedSource {
    fn default() -> Self {
        Self::empty()
            .with_document("users.json", include_str!("../../data/users.json"))
            .with_document("stores.json", include_str!("../../data/stores.json"))
            .with_document("rankings.json", include_str!("../../data/rankings.json"))
            .with_document("missions.json", include_str!("../../data/missions.json"))
            .with_document("sales.json", include_str!("../../data/sales.json"))
            .with_document(
                "learning_tracks.json",
                include_str!("../../data/learning_tracks.json"),
            )
    }
}

impl EmbeddedSource {
    pub fn empty() -> Self {
        Self {
            documents: BTreeMap::new(),
        }
    }

    pub fn with_document(mut self, file_name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.documents.insert(file_name.into(), raw.into());
        self
    }
}

impl DocumentSource for EmbeddedSource {
    fn fetch(&self, collection: &CollectionSchema) -> Result<Option<String>> {
        Ok(self.documents.get(&collection.file_name).cloned())
    }
}
