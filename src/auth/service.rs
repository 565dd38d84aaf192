//! Signup, account verification and login.
//!
//! A user starts **unverified** (`enabled = false`) and becomes **active**
//! once the token mailed at signup is presented. There is no way back.

use super::{
    authenticator::{Authenticator, StoreAuthenticator},
    error::AuthError,
    models::{AuthenticationResponse, NewUser, NewVerificationToken, Principal, User},
    password::PasswordEncoder,
    store::{ActivationOutcome, SignupOutcome, UserStore},
    utils::{build_activation_url, generate_verification_token, hash_verification_token, validate_signup},
};
use crate::mail::{NotificationEmail, Notifier};
use crate::token::TokenSigner;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};

pub const DEFAULT_ACTIVATION_BASE_URL: &str = "http://localhost:8080/api/auth/accountVerification";
pub const DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
pub const MAX_VERIFICATION_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    activation_base_url: String,
    verification_token_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(activation_base_url: impl Into<String>) -> Self {
        Self {
            activation_base_url: activation_base_url.into(),
            verification_token_ttl_seconds: DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS,
        }
    }

    /// Set how long a verification token stays usable. Zero issues tokens
    /// that are already expired.
    ///
    /// # Errors
    /// [`AuthError::Configuration`] unless `seconds` is within
    /// `0..=MAX_VERIFICATION_TOKEN_TTL_SECONDS`.
    pub fn with_verification_token_ttl_seconds(mut self, seconds: i64) -> Result<Self, AuthError> {
        if !(0..=MAX_VERIFICATION_TOKEN_TTL_SECONDS).contains(&seconds) {
            return Err(AuthError::Configuration(format!(
                "verification token ttl must be between 0 and {MAX_VERIFICATION_TOKEN_TTL_SECONDS} seconds, got {seconds}"
            )));
        }
        self.verification_token_ttl_seconds = seconds;
        Ok(self)
    }

    #[must_use]
    pub fn activation_base_url(&self) -> &str {
        &self.activation_base_url
    }

    #[must_use]
    pub fn verification_token_ttl_seconds(&self) -> i64 {
        self.verification_token_ttl_seconds
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_BASE_URL)
    }
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    authenticator: Arc<dyn Authenticator>,
    encoder: PasswordEncoder,
    signer: Arc<TokenSigner>,
    notifier: Notifier,
    config: AuthConfig,
}

impl AuthService {
    /// Build the service with a [`StoreAuthenticator`] over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn UserStore>,
        signer: Arc<TokenSigner>,
        notifier: Notifier,
        config: AuthConfig,
    ) -> Self {
        let encoder = PasswordEncoder::default();
        let authenticator = Arc::new(StoreAuthenticator::new(store.clone(), encoder.clone()));
        Self {
            store,
            authenticator,
            encoder,
            signer,
            notifier,
            config,
        }
    }

    /// Replace the password encoder; also rebuilds the default authenticator,
    /// so call it before [`Self::with_authenticator`].
    #[must_use]
    pub fn with_password_encoder(mut self, encoder: PasswordEncoder) -> Self {
        self.authenticator = Arc::new(StoreAuthenticator::new(self.store.clone(), encoder.clone()));
        self.encoder = encoder;
        self
    }

    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Register a new, disabled user and queue its activation email.
    ///
    /// The user row and the verification token are written together; the mail
    /// is queued afterwards and its delivery never affects the result.
    ///
    /// # Errors
    /// [`AuthError::Validation`] lists every bad field, [`AuthError::Conflict`]
    /// means the username is taken.
    #[instrument(skip(self, email, password))]
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let errors = validate_signup(username, email, password);
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let password_hash = self.encoder.encode(password)?;
        let token = generate_verification_token()?;
        let now = Utc::now();

        let new_user = NewUser {
            username: username.trim().to_string(),
            password_hash,
            email: email.trim().to_string(),
            created: now,
        };
        let new_token = NewVerificationToken {
            token_hash: hash_verification_token(&token),
            created: now,
            expires_at: token_expiry(now, self.config.verification_token_ttl_seconds)?,
        };

        let user = match self.store.insert_user_with_token(&new_user, &new_token).await? {
            SignupOutcome::Created(user) => user,
            SignupOutcome::Conflict => return Err(AuthError::Conflict),
        };

        let activation_url = build_activation_url(&self.config.activation_base_url, &token);
        if let Err(err) = self
            .notifier
            .dispatch(NotificationEmail::activation(&user.email, &activation_url))
        {
            error!(user_id = user.id, "failed to queue activation email: {err}");
        }

        info!(user_id = user.id, "user registered");

        Ok(user)
    }

    /// Activate the account owning `token` and consume the token.
    ///
    /// # Errors
    /// [`AuthError::InvalidToken`] for unknown, expired or used tokens and
    /// [`AuthError::UserNotFound`] if the owner has vanished.
    #[instrument(skip(self, token))]
    pub async fn verify_account(&self, token: &str) -> Result<User, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let token_hash = hash_verification_token(token);
        match self.store.activate_by_token(&token_hash, Utc::now()).await? {
            ActivationOutcome::Activated(user) => {
                info!(user_id = user.id, "account activated");
                Ok(user)
            }
            ActivationOutcome::InvalidToken => Err(AuthError::InvalidToken),
            ActivationOutcome::UserNotFound => Err(AuthError::UserNotFound),
        }
    }

    /// Authenticate and issue a signed session token.
    ///
    /// # Errors
    /// [`AuthError::Authentication`] for any credential problem.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthenticationResponse, AuthError> {
        let principal = self.authenticator.authenticate(username, password).await?;

        let authentication_token = self
            .signer
            .sign(&principal.username)
            .context("failed to sign session token")?;

        info!("login succeeded");

        Ok(AuthenticationResponse {
            authentication_token,
            username: principal.username,
        })
    }

    /// Resolve a bearer token to the principal it was issued for.
    ///
    /// # Errors
    /// [`AuthError::InvalidToken`] if the token does not verify or has expired.
    pub fn current_user(&self, token: &str) -> Result<Principal, AuthError> {
        let username = self.signer.verify(token)?;
        Ok(Principal { username })
    }

    pub async fn store_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(err) => {
                error!("store health check failed: {err:#}");
                false
            }
        }
    }
}

fn token_expiry(now: DateTime<Utc>, ttl_seconds: i64) -> Result<DateTime<Utc>, AuthError> {
    Duration::try_seconds(ttl_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AuthError::Configuration(format!("verification token ttl out of range: {ttl_seconds}"))
        })
}
