//! Small helpers for signup validation and verification token handling.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Basic email format check.
pub(crate) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Collect every field-level problem with a signup request.
pub(crate) fn validate_signup(username: &str, email: &str, password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if username.trim().is_empty() {
        errors.push("Username is required".to_string());
    }
    if password.trim().is_empty() {
        errors.push("Password is required".to_string());
    }
    if email.trim().is_empty() {
        errors.push("Email is required".to_string());
    } else if !valid_email(email.trim()) {
        errors.push("Email is invalid".to_string());
    }
    errors
}

/// Create a new verification token for the activation link.
///
/// Only the hash is stored; the raw value travels in the email.
pub(crate) fn generate_verification_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate verification token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

pub(crate) fn hash_verification_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// `<base>/<token>`, tolerating a trailing slash on the base.
pub(crate) fn build_activation_url(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/{token}")
}
