//! Ranking points and level bands.

use super::models::{Level, RankingWithLevel, RankingsDocument, UserRanking};
use crate::collections::RANKINGS;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::types::{Document, Timestamp};
use tracing::{debug, warn};

/// The first level whose band contains `points`.
pub fn resolve_level(levels: &[Level], points: i64) -> Option<&Level> {
    levels.iter().find(|level| level.contains(points))
}

impl Database {
    /// The typed contents of the `rankings` collection.
    pub fn rankings(&self) -> Result<RankingsDocument> {
        let field = self.rankings_field()?;
        let document = self.load(RANKINGS)?;
        decode_rankings(&document, &field)
    }

    /// A user's ranking row joined to its level, or `None` if the user has
    /// no ranking row.
    pub fn get_user_ranking(&self, user_id: u64) -> Result<Option<RankingWithLevel>> {
        let rankings = self.rankings()?;

        let ranking = match rankings
            .user_rankings
            .into_iter()
            .find(|r| r.user_id == user_id)
        {
            Some(ranking) => ranking,
            None => return Ok(None),
        };

        let level = rankings
            .levels
            .into_iter()
            .find(|level| level.id == ranking.level_id);

        Ok(Some(RankingWithLevel { ranking, level }))
    }

    /// Add `delta` to a user's current, monthly and lifetime points and move
    /// them to the level whose band holds the new current total.
    ///
    /// Returns the updated row, or `None` (nothing written) if the user has
    /// no ranking row. If no band holds the new total the level is kept.
    /// A total that would overflow is rejected and nothing is written.
    pub fn update_user_points(&self, user_id: u64, delta: i64) -> Result<Option<UserRanking>> {
        let field = self.rankings_field()?;

        self.modify_document(RANKINGS, |document| {
            let mut rankings = decode_rankings(document, &field)?;

            let ranking = match rankings
                .user_rankings
                .iter_mut()
                .find(|r| r.user_id == user_id)
            {
                Some(ranking) => ranking,
                None => {
                    warn!(user_id, "no ranking row, points not applied");
                    return Ok(None);
                }
            };

            let out_of_range = || {
                StoreError::InvalidRecord(format!(
                    "points for user {user_id} out of range after adding {delta}"
                ))
            };
            let current = ranking.current_points.checked_add(delta).ok_or_else(out_of_range)?;
            let monthly = ranking.monthly_points.checked_add(delta).ok_or_else(out_of_range)?;
            let lifetime = ranking
                .total_lifetime_points
                .checked_add(delta)
                .ok_or_else(out_of_range)?;

            ranking.current_points = current;
            ranking.monthly_points = monthly;
            ranking.total_lifetime_points = lifetime;
            if let Some(level) = resolve_level(&rankings.levels, ranking.current_points) {
                ranking.level_id = level.id;
            }
            ranking.last_updated = Some(Timestamp::now().to_iso());

            let updated = ranking.clone();
            debug!(
                user_id,
                delta,
                points = updated.current_points,
                level_id = updated.level_id,
                "points updated"
            );

            encode_rankings(document, &field, &rankings)?;
            Ok(Some(updated))
        })
    }

    fn rankings_field(&self) -> Result<String> {
        Ok(self.collections().schema().get(RANKINGS)?.records_field.clone())
    }
}

fn decode_rankings(document: &Document, field: &str) -> Result<RankingsDocument> {
    match document.get(field) {
        None => Ok(RankingsDocument::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| StoreError::Deserialization(format!("{RANKINGS}: {e}"))),
    }
}

fn encode_rankings(document: &mut Document, field: &str, rankings: &RankingsDocument) -> Result<()> {
    let object = document.as_object_mut().ok_or_else(|| {
        StoreError::InvalidFormat(format!("{RANKINGS}: document is not a JSON object"))
    })?;
    object.insert(field.to_string(), serde_json::to_value(rankings)?);
    Ok(())
}
