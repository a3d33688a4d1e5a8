use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AccountStore, StoreError, store_now};
use crate::models::{Account, NewAccount, Role};

/// In-process account store.
///
/// Every operation runs under one mutex, which is what makes the consume
/// operations atomic. Tests use [`calls`](Self::calls) to assert a flow never
/// reached the store and [`set_unavailable`](Self::set_unavailable) to simulate
/// an outage.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of an account by email, bypassing the call counter.
    pub fn snapshot(&self, email: &str) -> Option<Account> {
        let email = email.to_lowercase();
        self.lock()
            .ok()?
            .values()
            .find(|a| a.email == email)
            .cloned()
    }

    /// Overwrite a stored account, bypassing the call counter.
    pub fn put(&self, account: Account) {
        if let Ok(mut accounts) = self.lock() {
            accounts.insert(account.id.clone(), account);
        }
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Account>>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: &str) -> Result<Account, StoreError> {
        self.enter()?;
        self.lock()?.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.enter()?;
        let email = email.to_lowercase();
        self.lock()?
            .values()
            .find(|a| a.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, draft: NewAccount) -> Result<Account, StoreError> {
        self.enter()?;
        let mut accounts = self.lock()?;
        let email = draft.email.to_lowercase();
        if accounts.values().any(|a| a.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            name: draft.name,
            email,
            password_digest: draft.password_digest,
            role: draft.role,
            verified: draft.verified,
            verification_code: None,
            password_reset_token: None,
            password_reset_expires_at: None,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        };
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn set_verification_code(&self, id: &str, code: &str) -> Result<(), StoreError> {
        self.enter()?;
        let mut accounts = self.lock()?;
        let account = accounts.get_mut(id).ok_or(StoreError::NotFound)?;
        account.verification_code = Some(code.to_string());
        account.updated_at = store_now();
        Ok(())
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        self.enter()?;
        let mut accounts = self.lock()?;
        let account = accounts.get_mut(id).ok_or(StoreError::NotFound)?;
        account.role = role;
        account.updated_at = store_now();
        Ok(())
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.enter()?;
        let email = email.to_lowercase();
        let mut accounts = self.lock()?;
        match accounts.values_mut().find(|a| a.email == email) {
            Some(account) => {
                account.password_reset_token = Some(token.to_string());
                account.password_reset_expires_at = Some(expires_at);
                account.updated_at = store_now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn consume_verification_code(&self, code: &str) -> Result<u64, StoreError> {
        self.enter()?;
        let mut accounts = self.lock()?;
        match accounts
            .values_mut()
            .find(|a| a.verification_code.as_deref() == Some(code))
        {
            Some(account) => {
                account.verified = true;
                account.verification_code = None;
                account.updated_at = store_now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn consume_reset_token(&self, token: &str, new_digest: &str) -> Result<u64, StoreError> {
        self.enter()?;
        let now = store_now();
        let mut accounts = self.lock()?;
        let pending = accounts.values_mut().find(|a| {
            a.password_reset_token.as_deref() == Some(token)
                && a.password_reset_expires_at.is_some_and(|at| at > now)
        });
        match pending {
            Some(account) => {
                account.password_digest = new_digest.to_string();
                account.password_reset_token = None;
                account.password_reset_expires_at = None;
                account.updated_at = now;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
