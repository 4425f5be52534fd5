//! Credential hashing.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests in the encoded form
//! `pbkdf2-sha256$<rounds>$<salt>$<hash>` (base64 without padding).

use std::fmt;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Scheme tag at the start of every encoded hash.
pub const SCHEME: &str = "pbkdf2-sha256";

/// Round count used by [`PasswordHash::hash`].
pub const DEFAULT_ROUNDS: u32 = 600_000;

const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// Salted, iterated password digest. Never holds the plain text.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash {
    rounds: u32,
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl PasswordHash {
    /// Hash a password with [`DEFAULT_ROUNDS`].
    pub fn hash(plain: &str) -> ModelResult<Self> {
        Self::hash_with_rounds(plain, DEFAULT_ROUNDS)
    }

    /// Hash a password with an explicit round count.
    pub fn hash_with_rounds(plain: &str, rounds: u32) -> ModelResult<Self> {
        if plain.is_empty() {
            return Err(ModelError::EmptyPassword);
        }
        let rounds = rounds.max(1);
        let salt = Uuid::new_v4().as_bytes()[..SALT_LEN].to_vec();
        let digest = pbkdf2_sha256(plain.as_bytes(), &salt, rounds).to_vec();
        Ok(Self {
            rounds,
            salt,
            digest,
        })
    }

    /// Parse the encoded form produced by [`PasswordHash::encode`].
    pub fn parse(encoded: &str) -> ModelResult<Self> {
        let parts: Vec<&str> = encoded.split('$').collect();
        if parts.len() != 4 || parts[0] != SCHEME {
            return Err(ModelError::invalid_password_hash(
                "expected pbkdf2-sha256$<rounds>$<salt>$<hash>",
            ));
        }

        let rounds: u32 = parts[1]
            .parse()
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| ModelError::invalid_password_hash("bad round count"))?;
        let salt = STANDARD_NO_PAD
            .decode(parts[2])
            .map_err(|e| ModelError::invalid_password_hash(format!("bad salt: {}", e)))?;
        let digest = STANDARD_NO_PAD
            .decode(parts[3])
            .map_err(|e| ModelError::invalid_password_hash(format!("bad digest: {}", e)))?;

        if salt.is_empty() || digest.len() != DIGEST_LEN {
            return Err(ModelError::invalid_password_hash("bad salt or digest length"));
        }

        Ok(Self {
            rounds,
            salt,
            digest,
        })
    }

    /// Encoded form for storage.
    pub fn encode(&self) -> String {
        format!(
            "{}${}${}${}",
            SCHEME,
            self.rounds,
            STANDARD_NO_PAD.encode(&self.salt),
            STANDARD_NO_PAD.encode(&self.digest)
        )
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Check a candidate password against this hash.
    pub fn verify(&self, plain: &str) -> bool {
        let candidate = pbkdf2_sha256(plain.as_bytes(), &self.salt, self.rounds);
        candidate.as_slice().ct_eq(&self.digest).into()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}

fn pbkdf2_sha256(password: &[u8], salt: &[u8], rounds: u32) -> [u8; DIGEST_LEN] {
    let mut digest = [0u8; DIGEST_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, rounds, &mut digest);
    digest
}
