//! Typed views of the domain collections.
//!
//! Every model keeps unknown fields in `extra`, so converting a record to a
//! model and back never drops data.

use crate::error::{Result, StoreError};
use crate::types::Record;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a user is allowed to see.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Store manager.
    Gerente,
    /// Salesperson.
    Vendedor,
    /// Stock keeper.
    Estoquista,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Gerente => "gerente",
            Role::Vendedor => "vendedor",
            Role::Estoquista => "estoquista",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gerente" => Ok(Role::Gerente),
            "vendedor" => Ok(Role::Vendedor),
            "estoquista" => Ok(Role::Estoquista),
            other => Err(StoreError::InvalidRecord(format!("unknown role: {other}"))),
        }
    }
}

/// A row of the `users` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Stored and compared in plain text; this is demo data.
    pub password: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub store_id: Option<u64>,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl User {
    pub fn projection(&self) -> UserProjection {
        UserProjection {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            store_id: self.store_id,
        }
    }
}

/// The part of a user that is safe to hand out: no password.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProjection {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub store_id: Option<u64>,
}

/// One ranking level owning the band `min_points..=max_points`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub min_points: i64,
    /// `None` means the band is open-ended.
    pub max_points: Option<i64>,
    #[serde(flatten)]
    pub extra: Record,
}

impl Level {
    pub fn contains(&self, points: i64) -> bool {
        points >= self.min_points && self.max_points.map_or(true, |max| points <= max)
    }
}

/// A user's standing in the ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRanking {
    pub user_id: u64,
    pub current_points: i64,
    pub monthly_points: i64,
    pub total_lifetime_points: i64,
    pub level_id: u64,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

/// Contents of the `rankings` collection's records field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingsDocument {
    #[serde(default)]
    pub levels: Vec<Level>,
    #[serde(default)]
    pub user_rankings: Vec<UserRanking>,
    #[serde(flatten)]
    pub extra: Record,
}

/// A ranking row joined to its level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingWithLevel {
    #[serde(flatten)]
    pub ranking: UserRanking,
    /// `None` when the row's `level_id` does not resolve.
    pub level: Option<Level>,
}

/// A mission definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub points: i64,
    #[serde(flatten)]
    pub extra: Record,
}

/// A user's progress on one mission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserMission {
    pub user_id: u64,
    pub mission_id: u64,
    #[serde(flatten)]
    pub extra: Record,
}

/// A mission joined to the user's progress on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissionProgress {
    #[serde(flatten)]
    pub mission: Mission,
    pub user_progress: UserMission,
}

/// A recorded sale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: u64,
    pub user_id: u64,
    pub amount: f64,
    #[serde(default)]
    pub is_cross_sell: bool,
    pub points_earned: i64,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Record,
}

/// Input for registering a sale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    pub user_id: u64,
    pub amount: f64,
    #[serde(default)]
    pub is_cross_sell: bool,
    #[serde(flatten)]
    pub extra: Record,
}

impl NewSale {
    pub fn new(user_id: u64, amount: f64, is_cross_sell: bool) -> Self {
        Self {
            user_id,
            amount,
            is_cross_sell,
            extra: Record::new(),
        }
    }
}

/// Decode a record into a model.
pub(crate) fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(record))
        .map_err(|e| StoreError::Deserialization(e.to_string()))
}

/// Encode a model into a record.
pub(crate) fn to_record<T: Serialize>(model: &T) -> Result<Record> {
    match serde_json::to_value(model)? {
        serde_json::Value::Object(record) => Ok(record),
        other => Err(StoreError::Serialization(format!(
            "expected an object, got {other}"
        ))),
    }
}
