//! Account records and the transient values passed around the auth flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2id PHC string, never the raw password.
    pub password: String,
    pub email: String,
    pub created: DateTime<Utc>,
    pub enabled: bool,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"***")
            .field("email", &self.email)
            .field("created", &self.created)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// A user about to be persisted; always starts disabled.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub created: DateTime<Utc>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password_hash", &"***")
            .field("email", &self.email)
            .field("created", &self.created)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVerificationToken {
    pub token_hash: Vec<u8>,
    pub created: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken {
    pub id: i64,
    pub token_hash: Vec<u8>,
    pub user_id: i64,
    pub created: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl VerificationToken {
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}

/// The authenticated identity, handed explicitly to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub authentication_token: String,
    pub username: String,
}
