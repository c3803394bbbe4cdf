//! Credential checks against the `users` collection.

use super::models::{from_record, User, UserProjection};
use crate::collections::USERS;
use crate::database::Database;
use crate::error::Result;
use crate::types::{Record, Timestamp};
use serde_json::Value;
use tracing::{error, info};

/// Why a login was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthFailure {
    /// Unknown email, wrong password or inactive account. Deliberately not
    /// more specific.
    InvalidCredentials,

    /// The users collection could not be read or written.
    Internal(String),
}

impl AuthFailure {
    /// Message suitable for showing to the user.
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::InvalidCredentials => "Invalid credentials",
            AuthFailure::Internal(_) => "Internal server error",
        }
    }
}

/// Result of [`Database::authenticate_user`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Success(UserProjection),
    Failure(AuthFailure),
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success(_))
    }

    pub fn user(&self) -> Option<&UserProjection> {
        match self {
            AuthOutcome::Success(user) => Some(user),
            AuthOutcome::Failure(_) => None,
        }
    }
}

impl Database {
    /// Check an email/password pair.
    ///
    /// The email matches case-insensitively. On success the user's
    /// `last_login` is stamped and a password-free projection returned.
    pub fn authenticate_user(&self, email: &str, password: &str) -> AuthOutcome {
        match self.try_authenticate(email, password) {
            Ok(Some(user)) => {
                info!(user_id = user.id, role = %user.role, "login succeeded");
                AuthOutcome::Success(user)
            }
            Ok(None) => AuthOutcome::Failure(AuthFailure::InvalidCredentials),
            Err(e) => {
                error!(error = %e, "authentication failed");
                AuthOutcome::Failure(AuthFailure::Internal(e.to_string()))
            }
        }
    }

    fn try_authenticate(&self, email: &str, password: &str) -> Result<Option<UserProjection>> {
        let user = match self.find_user_by_email(email)? {
            Some(user) => user,
            None => return Ok(None),
        };

        if user.password != password || !user.active {
            return Ok(None);
        }

        let mut patch = Record::new();
        patch.insert("last_login".into(), Value::from(Timestamp::now().to_iso()));
        self.update(USERS, user.id, patch)?;

        Ok(Some(user.projection()))
    }

    /// Whether an active user is registered under `email` (any case).
    pub fn email_registered(&self, email: &str) -> Result<bool> {
        Ok(self
            .find_user_by_email(email)?
            .map_or(false, |user| user.active))
    }

    /// First user whose email matches, ignoring case.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let wanted = email.to_lowercase();

        let record = self.find_all(USERS)?.into_iter().find(|r| {
            r.get("email")
                .and_then(Value::as_str)
                .map_or(false, |e| e.to_lowercase() == wanted)
        });

        record.map(from_record).transpose()
    }
}
