//! Mission progress lookup.

use super::models::{Mission, MissionProgress, UserMission};
use crate::collections::MISSIONS;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::types::Document;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Field of the missions document holding per-user progress rows.
pub const USER_MISSIONS_FIELD: &str = "user_missions";

impl Database {
    /// Every mission a user has progress on, joined to its definition.
    ///
    /// Progress rows pointing at a mission that no longer exists are skipped.
    pub fn get_user_missions(&self, user_id: u64) -> Result<Vec<MissionProgress>> {
        let field = self.collections().schema().get(MISSIONS)?.records_field.clone();
        let document = self.load(MISSIONS)?;

        let missions: Vec<Mission> = decode_array(&document, &field)?;
        let progress: Vec<UserMission> = decode_array(&document, USER_MISSIONS_FIELD)?;

        let joined = progress
            .into_iter()
            .filter(|row| row.user_id == user_id)
            .filter_map(|row| {
                let mission_id = row.mission_id;
                match missions.iter().find(|m| m.id == mission_id) {
                    Some(mission) => Some(MissionProgress {
                        mission: mission.clone(),
                        user_progress: row,
                    }),
                    None => {
                        debug!(user_id, mission_id, "dropping progress for unknown mission");
                        None
                    }
                }
            })
            .collect();

        Ok(joined)
    }
}

fn decode_array<T: DeserializeOwned>(document: &Document, field: &str) -> Result<Vec<T>> {
    match document.get(field) {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| StoreError::Deserialization(format!("{MISSIONS}.{field}: {e}"))),
    }
}
