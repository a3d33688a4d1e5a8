//! Persistence contract for accounts.
//!
//! Services only reach the account collection through [`AccountStore`]. The
//! `consume_*` operations must be a single atomic match-and-mutate in every
//! implementation: two concurrent requests presenting the same code can never
//! both see a match.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use thiserror::Error;

use crate::models::{Account, NewAccount, Role};

pub mod memory;
pub mod sea;

pub use memory::MemoryAccountStore;
pub use sea::SeaOrmAccountStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found")]
    NotFound,

    #[error("user with that email already exists")]
    DuplicateEmail,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Account, StoreError>;

    /// Looks up by the lowercased form of `email`.
    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError>;

    /// Fails with [`StoreError::DuplicateEmail`] when the email is taken.
    async fn insert(&self, draft: NewAccount) -> Result<Account, StoreError>;

    /// Store the encoded verification code on a pending account.
    async fn set_verification_code(&self, id: &str, code: &str) -> Result<(), StoreError>;

    async fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError>;

    /// Record a pending reset, superseding any earlier one. Returns the match count.
    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Mark the account holding `code` verified and clear the code.
    /// Returns the match count; zero means the code is unknown or already used.
    async fn consume_verification_code(&self, code: &str) -> Result<u64, StoreError>;

    /// Replace the digest of the account holding an unexpired `token` and
    /// clear the pending reset. Zero matches covers both unknown and expired.
    async fn consume_reset_token(&self, token: &str, new_digest: &str) -> Result<u64, StoreError>;
}

/// Current time at the precision timestamps are persisted with.
///
/// Whole seconds keep the text encoding SQLite uses lexically ordered.
pub fn store_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// `now + ttl` rounded up to the next whole second.
///
/// Rounding up means a deadline is never earlier than the full lifetime.
pub fn expiry_after(ttl: Duration) -> DateTime<Utc> {
    let exact = Utc::now() + ttl;
    let whole = exact.trunc_subsecs(0);
    if whole < exact {
        whole + Duration::seconds(1)
    } else {
        whole
    }
}
