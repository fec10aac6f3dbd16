// ==============================================================================
// security.rs - Password Hashing (Argon2id)
// ==============================================================================
// Description: Argon2id hashing and verification for local-strategy passwords
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::sync::OnceLock;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

// ==============================================================================
// PASSWORD HASHING (ARGON2ID)
// ==============================================================================

/// Argon2id memory cost in KiB (46 MiB)
const MEMORY_COST_KIB: u32 = 47104;

/// Argon2id iterations
const TIME_COST: u32 = 3;

/// Argon2id lanes
const PARALLELISM: u32 = 4;

/// Hashes a password using Argon2id with secure parameters
///
/// The returned hash string is in PHC format and contains the algorithm,
/// parameters, salt, and hash. CPU heavy: call from `spawn_blocking`.
///
/// # Errors
///
/// Returns an error if salt generation or hashing fails (extremely rare)
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .context("Failed to create Argon2 parameters")?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .context("Failed to hash password")?
        .to_string();

    Ok(password_hash)
}

/// Verifies a password against an Argon2id hash
///
/// Parameters are read from the PHC string, so hashes created with older
/// parameters still verify.
///
/// # Errors
///
/// Returns an error if the hash string is malformed
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).context("Failed to parse password hash")?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification error: {}", e)),
    }
}

/// Hash checked in place of a missing account's, same parameters as real ones
///
/// Computed on first use. Empty if hashing failed, in which case the check
/// errors out and the caller still reports invalid credentials.
pub fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password("decoy-password-never-issued").unwrap_or_default())
}

// ==============================================================================
// TESTS
// ==============================================================================
