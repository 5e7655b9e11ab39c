// src/utils/crypto.rs
//! Password hashing.
//!
//! Uses PBKDF2-HMAC-SHA256 from `ring` with a random 16-byte salt per
//! password. Hashes are stored as
//! `pbkdf2-sha256$<iterations>$<base64 salt>$<base64 hash>` so the iteration
//! count can be raised later without invalidating existing rows.

use crate::errors::ServiceError;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use std::num::NonZeroU32;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;
const SALT_LEN: usize = 16;
const SCHEME: &str = "pbkdf2-sha256";

/// Salted one-way password hasher.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    /// Creates a hasher that derives new hashes with `iterations` rounds.
    ///
    /// # Errors
    /// Returns `ServiceError::Hashing` if `iterations` is zero.
    pub fn new(iterations: u32) -> Result<Self, ServiceError> {
        let iterations = NonZeroU32::new(iterations)
            .ok_or_else(|| ServiceError::Hashing("iteration count must be non-zero".into()))?;
        Ok(Self {
            iterations,
            rng: SystemRandom::new(),
        })
    }

    /// Hashes `password` under a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, ServiceError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|_| ServiceError::Hashing("system RNG failure".into()))?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(PBKDF2_ALG, self.iterations, &salt, password.as_bytes(), &mut hash);

        Ok(format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            base64::encode(salt),
            base64::encode(hash)
        ))
    }

    /// Checks `password` against a stored hash in constant time.
    ///
    /// A stored value that cannot be parsed never matches.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((iterations, salt, hash)) = parse_stored_hash(stored) else {
            return false;
        };
        pbkdf2::verify(PBKDF2_ALG, iterations, &salt, password.as_bytes(), &hash).is_ok()
    }

    /// Spends the same work as a real verification and reports a mismatch.
    /// Used when the login identifier is unknown.
    pub fn verify_absent(&self, password: &str) -> bool {
        let mut scratch = [0u8; HASH_LEN];
        pbkdf2::derive(
            PBKDF2_ALG,
            self.iterations,
            &[0u8; SALT_LEN],
            password.as_bytes(),
            &mut scratch,
        );
        false
    }
}

fn parse_stored_hash(stored: &str) -> Option<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations = parts.next()?.parse::<NonZeroU32>().ok()?;
    let salt = base64::decode(parts.next()?).ok()?;
    let hash = base64::decode(parts.next()?).ok()?;
    if parts.next().is_some() || hash.len() != HASH_LEN {
        return None;
    }
    Some((iterations, salt, hash))
}
