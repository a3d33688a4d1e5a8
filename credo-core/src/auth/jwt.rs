use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AuthError;

/// JWT claims payload.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Asymmetric signature scheme used for both token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAlgorithm {
    Rs256,
    EdDsa,
}

impl TokenAlgorithm {
    fn algorithm(self) -> Algorithm {
        match self {
            TokenAlgorithm::Rs256 => Algorithm::RS256,
            TokenAlgorithm::EdDsa => Algorithm::EdDSA,
        }
    }
}

impl FromStr for TokenAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RS256" => Ok(TokenAlgorithm::Rs256),
            "EDDSA" | "ED25519" => Ok(TokenAlgorithm::EdDsa),
            other => Err(format!("unsupported token algorithm `{}`", other)),
        }
    }
}

/// A signing key and its matching verification key.
///
/// Access and refresh tokens each get their own pair, so a refresh token can
/// never be replayed as an access token.
#[derive(Clone)]
pub struct TokenKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    /// Parse a PEM private key (PKCS#8, or PKCS#1 for RSA) and PEM public key.
    pub fn from_pem(
        algorithm: TokenAlgorithm,
        private_pem: &[u8],
        public_pem: &[u8],
    ) -> Result<Self, AuthError> {
        let (encoding, decoding) = match algorithm {
            TokenAlgorithm::Rs256 => (
                EncodingKey::from_rsa_pem(private_pem),
                DecodingKey::from_rsa_pem(public_pem),
            ),
            TokenAlgorithm::EdDsa => (
                EncodingKey::from_ed_pem(private_pem),
                DecodingKey::from_ed_pem(public_pem),
            ),
        };

        Ok(TokenKeys {
            algorithm: algorithm.algorithm(),
            encoding: encoding.map_err(|e| AuthError::Signing(format!("private key: {}", e)))?,
            decoding: decoding.map_err(|e| AuthError::Signing(format!("public key: {}", e)))?,
        })
    }
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Create a signed token for `subject` that expires `ttl` from now.
pub fn create_token(ttl: Duration, subject: &str, keys: &TokenKeys) -> Result<String, AuthError> {
    let now = Utc::now();
    let expires = now + ttl;

    let claims = Claims {
        sub: subject.to_string(),
        exp: expires.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(&Header::new(keys.algorithm), &claims, &keys.encoding)
        .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Validate a signed token and return its claims.
///
/// Rejects a bad signature, a malformed token, and any token whose expiry is
/// not after the current wall-clock second.
pub fn validate_token(token: &str, keys: &TokenKeys) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(keys.algorithm);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(token, &keys.decoding, &validation)?;
    Ok(token_data.claims)
}
