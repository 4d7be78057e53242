//! # rf-auth-simple
//!
//! Argon2-based implementation of `PasswordHasher`, plus an OS-random
//! `TokenSource` for session tokens.

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use base64::Engine;
use rf_core::models::SessionToken;
use rf_core::traits::{PasswordHasher, TokenSource};

/// Salt length in bytes before base64 encoding.
const SALT_BYTES: usize = 16;

/// Tokens shorter than this are rejected at construction.
pub const MIN_TOKEN_BYTES: usize = 20;

#[derive(Default)]
pub struct Argon2Hasher {
    argon: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2Hasher {
    /// Produces a PHC string (`$argon2id$v=19$...`) with a fresh random salt.
    fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
        let salt = random_bytes(SALT_BYTES)?;
        let salt = SaltString::encode_b64(&salt).map_err(|e| anyhow!("salt encoding failed: {e}"))?;
        let hash = self
            .argon
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!("stored password hash is not a valid PHC string");
                return false;
            }
        };
        self.argon
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Base64-encoded random tokens drawn from the OS generator.
pub struct RandomTokenSource {
    bytes: usize,
}

impl RandomTokenSource {
    /// Accepts the entropy size in bytes (e.g., from config). Anything
    /// below `MIN_TOKEN_BYTES` is an error.
    pub fn new(bytes: usize) -> anyhow::Result<Self> {
        if bytes < MIN_TOKEN_BYTES {
            return Err(anyhow!(
                "session tokens need at least {MIN_TOKEN_BYTES} random bytes, got {bytes}"
            ));
        }
        Ok(Self { bytes })
    }
}

impl Default for RandomTokenSource {
    fn default() -> Self {
        Self {
            bytes: MIN_TOKEN_BYTES,
        }
    }
}

impl TokenSource for RandomTokenSource {
    fn generate(&self) -> anyhow::Result<SessionToken> {
        let raw = random_bytes(self.bytes)?;
        Ok(SessionToken::new(
            base64::engine::general_purpose::STANDARD.encode(raw),
        ))
    }
}

fn random_bytes(len: usize) -> anyhow::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!("os random source failed: {e}"))?;
    Ok(buf)
}
