//! Session token signing and verification.
//!
//! Tokens are compact RS256 JWS strings (`header.claims.signature`, each part
//! base64url without padding). The subject claim carries the username; `iat`
//! and `exp` bound the lifetime. The signer is built once from a [`KeyPair`]
//! and is shared read-only between requests.

pub mod keystore;

pub use keystore::{KeyPair, KeyProvider, KeystoreKeyProvider, StaticKeyProvider};

use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::SystemTime;
use thiserror::Error;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 15 * 60;

const ALG_RS256: &str = "RS256";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to read keystore {path}")]
    KeystoreRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid keystore format")]
    KeystoreFormat(#[source] serde_json::Error),
    #[error("unsupported keystore version: {0}")]
    KeystoreVersion(u32),
    #[error("keystore password incorrect or keystore tampered")]
    KeystoreIntegrity,
    #[error("alias not found in keystore: {0}")]
    UnknownAlias(String),
    #[error("failed to decrypt key for alias: {0}")]
    KeyDecrypt(String),
    #[error("failed to parse RSA key")]
    KeyParse,
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("unknown key id: {0}")]
    UnknownKid(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid token ttl")]
    InvalidTtl,
}

impl TokenError {
    /// True for failures of the key material itself (as opposed to a bad token).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::KeystoreRead { .. }
                | Self::KeystoreFormat(_)
                | Self::KeystoreVersion(_)
                | Self::KeystoreIntegrity
                | Self::UnknownAlias(_)
                | Self::KeyDecrypt(_)
                | Self::KeyParse
                | Self::InvalidTtl
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
    pub kid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

pub struct TokenSigner {
    kid: String,
    ttl_seconds: i64,
    signing_key: SigningKey<Sha256>,
    verifying_key: VerifyingKey<Sha256>,
}

impl TokenSigner {
    /// Build a signer from a key pair; tokens live for `ttl_seconds`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidTtl`] if `ttl_seconds` is not positive.
    pub fn new(key_pair: KeyPair, ttl_seconds: i64) -> Result<Self, TokenError> {
        if ttl_seconds <= 0 {
            return Err(TokenError::InvalidTtl);
        }

        Ok(Self {
            kid: key_pair.alias().to_string(),
            ttl_seconds,
            signing_key: SigningKey::<Sha256>::new(key_pair.private_key().clone()),
            verifying_key: VerifyingKey::<Sha256>::new(key_pair.public_key().clone()),
        })
    }

    /// Load key material through `provider` and build the signer.
    ///
    /// # Errors
    /// Returns an error if the provider cannot produce a key pair.
    pub fn from_provider(provider: &dyn KeyProvider, ttl_seconds: i64) -> Result<Self, TokenError> {
        Self::new(provider.load()?, ttl_seconds)
    }

    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Sign a token asserting `subject`.
    ///
    /// # Errors
    /// Returns an error if the header or claims cannot be encoded.
    pub fn sign(&self, subject: &str) -> Result<String, TokenError> {
        self.sign_at(subject, now_unix_seconds())
    }

    /// Sign a token as if issued at `now` (unix seconds).
    ///
    /// # Errors
    /// Returns an error if the header or claims cannot be encoded.
    pub fn sign_at(&self, subject: &str, now: i64) -> Result<String, TokenError> {
        let header = TokenHeader {
            alg: ALG_RS256.to_string(),
            typ: "JWT".to_string(),
            kid: self.kid.clone(),
        };
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };

        let signing_input = format!("{}.{}", b64e_json(&header)?, b64e_json(&claims)?);
        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature.to_vec());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify `token` and return its subject.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, signed by another key, has a
    /// bad signature or is expired.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, now_unix_seconds())
            .map(|claims| claims.sub)
    }

    /// Verify `token` against the clock value `now` and return all claims.
    ///
    /// # Errors
    /// See [`TokenSigner::verify`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let mut parts = token.trim().split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != ALG_RS256 {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }
        if header.kid != self.kid {
            return Err(TokenError::UnknownKid(header.kid));
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature_bytes =
            Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|_| TokenError::InvalidSignature)?;
        self.verifying_key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: TokenClaims = b64d_json(claims_b64)?;
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("kid", &self.kid)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNING_KEY_PEM: &str = include_str!("../../tests/fixtures/signing_key.pem");
    const OTHER_KEY_PEM: &str = include_str!("../../tests/fixtures/other_key.pem");
    const NOW: i64 = 1_700_000_000;

    fn signer(alias: &str, pem: &str) -> TokenSigner {
        let pair = StaticKeyProvider::from_pem(alias, pem).load().unwrap();
        TokenSigner::new(pair, 900).unwrap()
    }

    fn flip_char(s: &str, index: usize) -> String {
        let mut bytes = s.as_bytes().to_vec();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn sign_then_verify_returns_subject() {
        let signer = signer("swades", SIGNING_KEY_PEM);
        let token = signer.sign("alice").unwrap();
        assert_eq!(signer.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn claims_carry_iat_and_exp() {
        let signer = signer("swades", SIGNING_KEY_PEM);
        let token = signer.sign_at("alice", NOW).unwrap();
        let claims = signer.verify_at(&token, NOW + 1).unwrap();
        assert_eq!(
            claims,
            TokenClaims {
                sub: "alice".to_string(),
                iat: NOW,
                exp: NOW + 900,
            }
        );
    }

    #[test]
    fn header_names_alias_as_kid() {
        let signer = signer("swades", SIGNING_KEY_PEM);
        let token = signer.sign("alice").unwrap();
        let header_b64 = token.split('.').next().unwrap();
        let header: TokenHeader = b64d_json(header_b64).unwrap();
        assert_eq!(header.alg, "RS256");
        assert_eq!(header.typ, "JWT");
        assert_eq!(header.kid, "swades");
    }

    #[test]
    fn rejects_expired_token() {
        let signer = signer("swades", SIGNING_KEY_PEM);
        let token = signer.sign_at("alice", NOW).unwrap();
        assert!(matches!(
            signer.verify_at(&token, NOW + 900),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let signer = signer("swades", SIGNING_KEY_PEM);
        let token = signer.sign("alice").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = b64e_json(&TokenClaims {
            sub: "mallory".to_string(),
            iat: 0,
            exp: i64::MAX,
        })
        .unwrap();
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert!(matches!(
            signer.verify(&forged),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_tampered_signature() {
        let signer = signer("swades", SIGNING_KEY_PEM);
        let token = signer.sign("alice").unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;
        let tampered = flip_char(&token, sig_start + 10);
        assert!(signer.verify(&tampered).is_err());
    }

    #[test]
    fn rejects_token_from_other_key_with_same_alias() {
        let ours = signer("swades", SIGNING_KEY_PEM);
        let theirs = signer("swades", OTHER_KEY_PEM);
        let token = theirs.sign("alice").unwrap();
        assert!(matches!(
            ours.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_unknown_kid() {
        let ours = signer("swades", SIGNING_KEY_PEM);
        let theirs = signer("other", SIGNING_KEY_PEM);
        let token = theirs.sign("alice").unwrap();
        assert!(matches!(ours.verify(&token), Err(TokenError::UnknownKid(kid)) if kid == "other"));
    }

    #[test]
    fn rejects_malformed_tokens() {
        let signer = signer("swades", SIGNING_KEY_PEM);
        assert!(matches!(signer.verify(""), Err(TokenError::TokenFormat)));
        assert!(matches!(signer.verify("a.b"), Err(TokenError::TokenFormat)));
        assert!(matches!(
            signer.verify("a.b.c.d"),
            Err(TokenError::TokenFormat)
        ));
        assert!(matches!(signer.verify("!!.b.c"), Err(TokenError::Base64)));
    }

    #[test]
    fn rejects_non_rs256_header() {
        let signer = signer("swades", SIGNING_KEY_PEM);
        let header = b64e_json(&TokenHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
            kid: "swades".to_string(),
        })
        .unwrap();
        let claims = b64e_json(&TokenClaims {
            sub: "alice".to_string(),
            iat: NOW,
            exp: i64::MAX,
        })
        .unwrap();
        let token = format!("{header}.{claims}.");
        assert!(matches!(
            signer.verify(&token),
            Err(TokenError::UnsupportedAlg(alg)) if alg == "none"
        ));
    }

    #[test]
    fn new_rejects_non_positive_ttl() {
        let pair = StaticKeyProvider::from_pem("swades", SIGNING_KEY_PEM)
            .load()
            .unwrap();
        assert!(matches!(
            TokenSigner::new(pair, 0),
            Err(TokenError::InvalidTtl)
        ));
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(TokenError::KeystoreIntegrity.is_configuration());
        assert!(TokenError::UnknownAlias("x".to_string()).is_configuration());
        assert!(!TokenError::InvalidSignature.is_configuration());
        assert!(!TokenError::Expired.is_configuration());
    }
}
