use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::AuthError;

/// Hash a plaintext password using Argon2 with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a plaintext password against a stored digest.
///
/// A wrong password is `Ok(false)`. A digest that cannot be parsed, or one
/// argon2 cannot check (another algorithm, bad parameters), is an error.
pub fn verify_password(password: &str, digest: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(digest)
        .map_err(|e| AuthError::Internal(format!("Invalid password digest: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Internal(format!("Failed to verify password: {}", e))),
    }
}
