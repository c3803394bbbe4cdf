//! Per-user avatar images.
//!
//! An avatar is stored as one JSON blob per user holding the image as a
//! `data:` URL plus upload metadata.

use crate::error::{Result, StoreError};
use crate::storage::KeyValueStorage;
use crate::types::Timestamp;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Shown when a user has no avatar of their own.
pub const DEFAULT_AVATAR_URL: &str =
    "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=64&h=64&fit=crop&crop=face&auto=format";

/// Storage key of a user's avatar.
pub fn avatar_key(user_id: u64) -> String {
    format!("swift_avatar_{user_id}")
}

/// An image file as uploaded.
#[derive(Clone, Debug)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What is stored for an avatar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarRecord {
    pub data_url: String,
    pub file_name: String,
    pub upload_date: String,
    pub file_size: u64,
    pub file_type: String,
}

/// Saves and retrieves avatars.
pub struct AvatarStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl AvatarStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Store `upload` as the user's avatar, replacing any previous one.
    pub fn save(&self, user_id: u64, upload: &AvatarUpload) -> Result<AvatarRecord> {
        if upload.bytes.is_empty() {
            return Err(StoreError::InvalidRecord("avatar file is empty".into()));
        }

        let now = Timestamp::now();
        let record = AvatarRecord {
            data_url: format!(
                "data:{};base64,{}",
                upload.content_type,
                STANDARD.encode(&upload.bytes)
            ),
            file_name: format!(
                "avatar_{}_{}.{}",
                user_id,
                now.unix_millis(),
                extension(&upload.file_name)
            ),
            upload_date: now.to_iso(),
            file_size: upload.bytes.len() as u64,
            file_type: upload.content_type.clone(),
        };

        self.storage
            .set(&avatar_key(user_id), &serde_json::to_string(&record)?)?;
        Ok(record)
    }

    /// The stored avatar, if any. An unparseable entry reads as absent.
    pub fn get(&self, user_id: u64) -> Result<Option<AvatarRecord>> {
        let raw = match self.storage.get(&avatar_key(user_id))? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(user_id, error = %e, "unparseable avatar entry");
                Ok(None)
            }
        }
    }

    pub fn avatar_url(&self, user_id: u64) -> Result<Option<String>> {
        Ok(self.get(user_id)?.map(|record| record.data_url))
    }

    pub fn avatar_url_or_default(&self, user_id: u64) -> Result<String> {
        Ok(self
            .avatar_url(user_id)?
            .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()))
    }

    /// Delete the user's avatar. Returns whether one existed.
    pub fn remove(&self, user_id: u64) -> Result<bool> {
        self.storage.remove(&avatar_key(user_id))
    }

    /// Decode a stored avatar back to raw image bytes.
    pub fn decode(record: &AvatarRecord) -> Result<Vec<u8>> {
        let payload = record
            .data_url
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| StoreError::InvalidFormat("avatar is not a base64 data URL".into()))?;

        STANDARD
            .decode(payload)
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    }
}

/// Text after the last dot; the whole name if there is none.
fn extension(file_name: &str) -> &str {
    file_name.rsplit('.').next().unwrap_or(file_name)
}
