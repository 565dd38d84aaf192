//! Persistence seam for users and verification tokens.
//!
//! Each trait method is one unit of work: signup writes the user and its token
//! together, activation reads the token, enables the user and consumes the
//! token together. Implementations must commit all of it or none of it.

use super::models::{NewUser, NewVerificationToken, User, VerificationToken};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Outcome of creating a user together with its verification token.
#[derive(Debug)]
pub enum SignupOutcome {
    Created(User),
    Conflict,
}

/// Outcome of presenting a verification token.
#[derive(Debug)]
pub enum ActivationOutcome {
    Activated(User),
    InvalidToken,
    UserNotFound,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a disabled user and its verification token atomically.
    ///
    /// Returns [`SignupOutcome::Conflict`] (and writes nothing) when the
    /// username is taken.
    async fn insert_user_with_token(
        &self,
        user: &NewUser,
        token: &NewVerificationToken,
    ) -> Result<SignupOutcome>;

    /// Look up a usable token by hash, enable its user and consume the token.
    async fn activate_by_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    tokens: Vec<VerificationToken>,
    next_user_id: i64,
    next_token_id: i64,
}

/// Process-local store; a single lock serialises every unit of work.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.users.clone()
    }

    pub async fn tokens(&self) -> Vec<VerificationToken> {
        self.state.lock().await.tokens.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user_with_token(
        &self,
        user: &NewUser,
        token: &NewVerificationToken,
    ) -> Result<SignupOutcome> {
        let mut state = self.state.lock().await;

        if state.users.iter().any(|u| u.username == user.username) {
            return Ok(SignupOutcome::Conflict);
        }

        state.next_user_id += 1;
        let created = User {
            id: state.next_user_id,
            username: user.username.clone(),
            password: user.password_hash.clone(),
            email: user.email.clone(),
            created: user.created,
            enabled: false,
        };
        state.users.push(created.clone());

        state.next_token_id += 1;
        let token = VerificationToken {
            id: state.next_token_id,
            token_hash: token.token_hash.clone(),
            user_id: created.id,
            created: token.created,
            expires_at: token.expires_at,
            consumed_at: None,
        };
        state.tokens.push(token);

        Ok(SignupOutcome::Created(created))
    }

    async fn activate_by_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome> {
        let mut state = self.state.lock().await;

        let Some(token_index) = state
            .tokens
            .iter()
            .position(|t| t.token_hash == token_hash && t.is_usable(now))
        else {
            return Ok(ActivationOutcome::InvalidToken);
        };

        let user_id = state.tokens[token_index].user_id;
        let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(ActivationOutcome::UserNotFound);
        };

        user.enabled = true;
        let activated = user.clone();
        state.tokens[token_index].consumed_at = Some(now);

        Ok(ActivationOutcome::Activated(activated))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
