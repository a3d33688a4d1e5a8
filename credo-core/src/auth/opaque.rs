//! One-time codes for email verification and password reset.
//!
//! The raw code travels in the emailed link; the store only ever sees the
//! encoded form. Encoding is reversible obfuscation, not secrecy: matching an
//! incoming code means encoding it again and comparing encoded values.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::{Rng, distributions::Alphanumeric};

use crate::error::AuthError;

/// Length of generated verification codes and reset tokens.
pub const CODE_LENGTH: usize = 20;

/// Generate a random alphanumeric one-time code.
pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Obfuscate a raw code into its stored form.
pub fn encode_opaque(raw: &str) -> String {
    STANDARD.encode(raw.as_bytes())
}

/// Recover the raw code from its stored form.
pub fn decode_opaque(token: &str) -> Result<String, AuthError> {
    let bytes = STANDARD
        .decode(token)
        .map_err(|e| AuthError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AuthError::Decode(e.to_string()))
}
