//! Password hashing with Argon2id (PHC string format).

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

// Fixed salt and digest; only the cost parameters vary with the encoder.
const DUMMY_SALT: &str = "c3dhZGVzLWR1bW15LXNsdA";
const DUMMY_DIGEST: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8";

#[derive(Clone, Debug)]
pub struct PasswordEncoder {
    params: Params,
}

impl PasswordEncoder {
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `raw` with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if hashing fails.
    pub fn encode(&self, raw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("failed to hash password: {e}"))
    }

    /// Check `raw` against a stored PHC string; malformed hashes never match.
    #[must_use]
    pub fn matches(&self, raw: &str, encoded: &str) -> bool {
        PasswordHash::new(encoded).is_ok_and(|parsed| {
            self.argon2()
                .verify_password(raw.as_bytes(), &parsed)
                .is_ok()
        })
    }

    /// Run a full verification against a hash no password produces, so a
    /// missing account costs the same as a wrong password. Always `false`.
    #[must_use]
    pub fn dummy_verify(&self, raw: &str) -> bool {
        self.matches(raw, &self.dummy_hash())
    }

    fn dummy_hash(&self) -> String {
        format!(
            "$argon2id$v=19$m={},t={},p={}${DUMMY_SALT}${DUMMY_DIGEST}",
            self.params.m_cost(),
            self.params.t_cost(),
            self.params.p_cost()
        )
    }
}

impl Default for PasswordEncoder {
    fn default() -> Self {
        Self::new(Params::default())
    }
}
