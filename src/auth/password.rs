//! Argon2id password hashing.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHasher, PasswordVerifier, phc::PasswordHash},
};

use crate::error::{AppError, AppResult};

fn hashing_error(operation: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Internal {
        source: anyhow::anyhow!("Failed to {}: {}", operation, e),
    }
}

/// Argon2id with the crate's default parameters.
pub fn default_hasher() -> Argon2<'static> {
    Argon2::default()
}

/// Argon2id with explicit cost parameters (memory in KiB).
pub fn hasher_with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> AppResult<Argon2<'static>> {
    let params = Params::new(m_cost, t_cost, p_cost, None)
        .map_err(|e| hashing_error("build argon2 parameters", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string with a random salt.
pub fn hash_password(argon2: &Argon2<'_>, password: &str) -> AppResult<String> {
    argon2
        .hash_password(password.as_bytes())
        .map(|hash| hash.to_string())
        .map_err(|e| hashing_error("hash password", e))
}

/// Check a password against a PHC string. A malformed digest is an error,
/// a wrong password is `Ok(false)`.
pub fn verify_password(argon2: &Argon2<'_>, password: &str, digest: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(digest).map_err(|e| hashing_error("parse password digest", e))?;

    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
