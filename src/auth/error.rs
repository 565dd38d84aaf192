use thiserror::Error;

/// Failures surfaced by the auth orchestrator.
///
/// `Authentication` carries no detail: the caller never learns whether the
/// username or the password was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("Username already exists")]
    Conflict,
    #[error("Invalid Token")]
    InvalidToken,
    #[error("User Not Found")]
    UserNotFound,
    #[error("Bad credentials")]
    Authentication,
    #[error("mail delivery failed: {0}")]
    Delivery(#[from] crate::mail::DeliveryError),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<crate::token::TokenError> for AuthError {
    fn from(err: crate::token::TokenError) -> Self {
        if err.is_configuration() {
            Self::Configuration(err.to_string())
        } else {
            Self::InvalidToken
        }
    }
}
