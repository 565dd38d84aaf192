//! # Swades (account registration and session tokens)
//!
//! `swades` creates user accounts, mails a verification link, activates the
//! account when the link is followed and issues signed session tokens on login.
//!
//! ## Account lifecycle
//!
//! A new account is **unverified** (`enabled = false`). Signup writes the user
//! and a single-use verification token in one transaction, then queues the
//! activation email. Presenting the token enables the account and consumes the
//! token; it cannot be used twice and expires after a configurable lifetime.
//!
//! ## Session tokens
//!
//! Login checks the Argon2id password hash and returns an RS256 JWT whose
//! `kid` is the keystore alias. The signing key is read once at startup from a
//! password protected keystore (see [`token::keystore`]); a wrong password or
//! a tampered keystore stops the process from starting.

pub mod auth;
pub mod cli;
pub mod mail;
pub mod swades;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
