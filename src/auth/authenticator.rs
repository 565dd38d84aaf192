use super::{error::AuthError, models::Principal, password::PasswordEncoder, store::UserStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Checks a username/password pair and names who it belongs to.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// # Errors
    /// Returns [`AuthError::Authentication`] for any credential problem, or
    /// [`AuthError::Internal`] if the store cannot be reached.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError>;
}

/// Authenticates against the stored Argon2 hash. Disabled accounts are
/// refused like a wrong password.
#[derive(Clone)]
pub struct StoreAuthenticator {
    store: Arc<dyn UserStore>,
    encoder: PasswordEncoder,
}

impl StoreAuthenticator {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, encoder: PasswordEncoder) -> Self {
        Self { store, encoder }
    }
}

#[async_trait]
impl Authenticator for StoreAuthenticator {
    #[instrument(skip(self, password))]
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let Some(user) = self.store.find_by_username(username).await? else {
            let _ = self.encoder.dummy_verify(password);
            debug!("unknown username");
            return Err(AuthError::Authentication);
        };

        if !self.encoder.matches(password, &user.password) {
            debug!("password mismatch");
            return Err(AuthError::Authentication);
        }

        if !user.enabled {
            debug!("account not activated");
            return Err(AuthError::Authentication);
        }

        Ok(Principal {
            username: user.username,
        })
    }
}
