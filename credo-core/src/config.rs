use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Duration;
use thiserror::Error;

use crate::auth::{TokenAlgorithm, TokenKeys};
use crate::error::AuthError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Application configuration loaded once from environment variables.
///
/// Built at startup, wrapped in an `Arc` and handed to every service; nothing
/// mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (e.g. sqlite://credo.db, postgres://...)
    pub database_url: String,

    /// Server host (default: 127.0.0.1)
    pub server_host: String,

    /// Server port (default: 8000)
    pub server_port: u16,

    /// Environment: development, production, test
    pub environment: String,

    /// Base URL embedded in verification and reset links
    pub client_origin: String,

    /// Origin allowed to make credentialed cross-origin requests
    pub cors_origin: String,

    pub access_token: TokenConfig,
    pub refresh_token: TokenConfig,

    /// How long a password-reset token stays redeemable
    pub password_reset_expires_in: Duration,

    /// Upper bound on every store and mail call
    pub upstream_timeout: std::time::Duration,

    pub cookie: CookieConfig,
    pub mail: MailConfig,
}

/// Key material and lifetime for one token class.
#[derive(Clone)]
pub struct TokenConfig {
    pub algorithm: TokenAlgorithm,
    pub private_key_pem: String,
    pub public_key_pem: String,
    pub expires_in: Duration,
}

impl TokenConfig {
    /// Parse the PEM material into signing/verification keys.
    pub fn keys(&self) -> Result<TokenKeys, AuthError> {
        TokenKeys::from_pem(
            self.algorithm,
            self.private_key_pem.as_bytes(),
            self.public_key_pem.as_bytes(),
        )
    }

    /// Cookie max-age matching the token lifetime.
    pub fn max_age_secs(&self) -> i64 {
        self.expires_in.num_seconds()
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("algorithm", &self.algorithm)
            .field("private_key_pem", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CookieConfig {
    /// Cookie domain; host-only cookies when unset
    pub domain: Option<String>,
    pub secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// Write outgoing mail to the log (development)
    Log,
    /// Post to a transactional mail HTTP API
    Http,
}

impl FromStr for MailTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(MailTransport::Log),
            "http" => Ok(MailTransport::Http),
            other => Err(format!("unknown mail transport `{}`", other)),
        }
    }
}

#[derive(Clone)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("transport", &self.transport)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("sender_email", &self.sender_email)
            .field("sender_name", &self.sender_name)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();

        let algorithm: TokenAlgorithm = parse_var("TOKEN_ALGORITHM", TokenAlgorithm::Rs256)?;

        let mail = MailConfig {
            transport: parse_var("MAIL_TRANSPORT", MailTransport::Log)?,
            api_url: std::env::var("MAIL_API_URL").ok(),
            api_key: std::env::var("MAIL_API_KEY").ok(),
            sender_email: var_or("MAIL_SENDER_EMAIL", "no-reply@localhost"),
            sender_name: std::env::var("MAIL_SENDER_NAME").ok(),
        };
        if mail.transport == MailTransport::Http {
            if mail.api_url.is_none() {
                return Err(ConfigError::Missing("MAIL_API_URL"));
            }
            if mail.api_key.is_none() {
                return Err(ConfigError::Missing("MAIL_API_KEY"));
            }
        }

        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite://credo.db?mode=rwc"),
            server_host: var_or("SERVER_HOST", "127.0.0.1"),
            server_port: parse_var("SERVER_PORT", 8000)?,
            environment: var_or("ENVIRONMENT", "development"),
            client_origin: var_or("CLIENT_ORIGIN", "http://localhost:8000"),
            cors_origin: var_or("CORS_ORIGIN", "http://127.0.0.1:3000"),
            access_token: TokenConfig {
                algorithm,
                private_key_pem: pem_var("ACCESS_TOKEN_PRIVATE_KEY")?,
                public_key_pem: pem_var("ACCESS_TOKEN_PUBLIC_KEY")?,
                expires_in: Duration::minutes(parse_var("ACCESS_TOKEN_EXPIRES_IN", 15)?),
            },
            refresh_token: TokenConfig {
                algorithm,
                private_key_pem: pem_var("REFRESH_TOKEN_PRIVATE_KEY")?,
                public_key_pem: pem_var("REFRESH_TOKEN_PUBLIC_KEY")?,
                expires_in: Duration::minutes(parse_var("REFRESH_TOKEN_EXPIRES_IN", 60)?),
            },
            password_reset_expires_in: Duration::minutes(parse_var(
                "PASSWORD_RESET_EXPIRES_IN",
                15,
            )?),
            upstream_timeout: std::time::Duration::from_secs(parse_var(
                "UPSTREAM_TIMEOUT_SECS",
                5,
            )?),
            cookie: CookieConfig {
                domain: std::env::var("COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
                secure: parse_var("COOKIE_SECURE", false)?,
            },
            mail,
        })
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Link embedded in the verification email.
    pub fn verification_url(&self, raw_code: &str) -> String {
        format!(
            "{}/api/auth/verifyemail/{}",
            self.client_origin.trim_end_matches('/'),
            raw_code
        )
    }

    /// Link embedded in the password-reset email.
    pub fn password_reset_url(&self, raw_token: &str) -> String {
        format!(
            "{}/api/auth/resetpassword/{}",
            self.client_origin.trim_end_matches('/'),
            raw_token
        )
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Keys are supplied base64-encoded so a multi-line PEM fits in one variable.
fn pem_var(key: &'static str) -> Result<String, ConfigError> {
    let encoded = std::env::var(key).map_err(|_| ConfigError::Missing(key))?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
