//! Password hashing with Argon2id and an optional server-side pepper.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{EngineError, Result};

/// Hash compared against when no account matches, so that unknown and known
/// e-mails cost the same Argon2 work.
pub(crate) static DECOY_HASH: OnceLock<String> = OnceLock::new();
const DECOY_PASSWORD: &str = "cardhub-decoy-credential";

/// Rules applied to passwords at registration and login.
#[derive(Clone)]
pub struct PasswordPolicy {
    pepper: Option<String>,
    min_length: usize,
}

impl fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordPolicy")
            .field("peppered", &self.pepper.is_some())
            .field("min_length", &self.min_length)
            .finish()
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(None, 8)
    }
}

impl PasswordPolicy {
    pub fn new(pepper: Option<String>, min_length: usize) -> Self {
        Self {
            pepper: pepper.filter(|p| !p.is_empty()),
            min_length,
        }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn check_strength(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.min_length {
            return Err(EngineError::Validation(format!(
                "password must be at least {} characters",
                self.min_length
            )));
        }
        Ok(())
    }

    /// Hashes into a PHC string with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let input = self.peppered(password);
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(input.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| EngineError::Crypto(format!("hash error: {e}")))
    }

    /// `Ok(false)` on mismatch; a malformed stored hash is a crypto error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| EngineError::Crypto(format!("invalid hash format: {e}")))?;
        let input = self.peppered(password);
        match Argon2::default().verify_password(input.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(EngineError::Crypto(format!("verify error: {e}"))),
        }
    }

    /// Runs a full verification against a fixed hash and discards the
    /// outcome. Used on login paths that have no stored credential.
    pub fn verify_decoy(&self, password: &str) -> Result<()> {
        let hash = match DECOY_HASH.get() {
            Some(hash) => hash,
            None => {
                let fresh = self.hash(DECOY_PASSWORD)?;
                DECOY_HASH.get_or_init(|| fresh)
            }
        };
        self.verify(password, hash).map(|_| ())
    }

    fn peppered(&self, password: &str) -> String {
        match &self.pepper {
            Some(pepper) => format!("{pepper}{password}"),
            None => password.to_string(),
        }
    }
}
