//! In-memory account directory for tests/dev.
//!
//! Implements both [`AccountStore`] and [`ExternalIdentityStore`] over one
//! lock, so username uniqueness and the authmap stay consistent.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use smbridge_auth::{AccountStore, ExternalIdentityStore, ExternalLink, LocalAccount, StoreError};
use smbridge_core::{AccountId, DomainError};

#[derive(Debug, Default)]
struct DirectoryState {
    accounts: HashMap<AccountId, LocalAccount>,
    /// (provider, authname) -> account
    authmap: HashMap<(String, String), AccountId>,
}

impl DirectoryState {
    fn id_by_username(&self, username: &str) -> Option<AccountId> {
        self.accounts
            .values()
            .find(|a| a.username == username)
            .map(|a| a.id)
    }

    fn link(&mut self, authname: &str, provider: &str, id: AccountId) -> Result<(), DomainError> {
        let key = (provider.to_string(), authname.to_string());
        match self.authmap.get(&key) {
            Some(existing) if *existing != id => {
                return Err(DomainError::conflict(format!(
                    "'{authname}' is already linked to another account"
                )));
            }
            _ => {}
        }
        let account = self.accounts.get_mut(&id).ok_or(DomainError::NotFound)?;
        account.external_link = Some(ExternalLink::new(authname, provider));
        self.authmap.insert(key, id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    inner: RwLock<DirectoryState>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an account directly, bypassing uniqueness checks.
    pub fn insert(&self, account: LocalAccount) {
        if let Ok(mut state) = self.inner.write() {
            state.accounts.insert(account.id, account);
        }
    }

    pub fn get(&self, id: AccountId) -> Option<LocalAccount> {
        self.read().ok()?.accounts.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().map(|s| s.accounts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DirectoryState>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("account directory lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DirectoryState>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("account directory lock poisoned".to_string()))
    }
}

impl AccountStore for InMemoryAccountDirectory {
    fn load_by_username(&self, username: &str) -> Option<LocalAccount> {
        let state = self.read().ok()?;
        let id = state.id_by_username(username)?;
        state.accounts.get(&id).cloned()
    }

    fn save(&self, account: &LocalAccount) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if let Some(owner) = state.id_by_username(&account.username) {
            if owner != account.id {
                return Err(StoreError::DuplicateUsername(account.username.clone()));
            }
        }
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }
}

impl ExternalIdentityStore for InMemoryAccountDirectory {
    fn login(&self, authname: &str, provider: &str) -> Option<LocalAccount> {
        let mut state = self.write().ok()?;
        let id = *state
            .authmap
            .get(&(provider.to_string(), authname.to_string()))?;
        let account = state.accounts.get_mut(&id)?;
        account.last_login = Some(Utc::now());
        Some(account.clone())
    }

    fn register(&self, authname: &str, provider: &str) -> Result<LocalAccount, StoreError> {
        // Check and insert under one write lock; concurrent registrations of
        // the same name lose here.
        let mut state = self.write()?;
        if state.id_by_username(authname).is_some() {
            return Err(StoreError::DuplicateUsername(authname.to_string()));
        }
        let account = LocalAccount::new(AccountId::new(), authname)?;
        let id = account.id;
        state.accounts.insert(id, account);
        state.link(authname, provider, id)?;
        debug!(authname, account_id = %id, "account registered");
        state.accounts.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn link_existing_account(
        &self,
        authname: &str,
        provider: &str,
        account: &LocalAccount,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.link(authname, provider, account.id)?;
        Ok(())
    }

    fn finalize_login(
        &self,
        mut account: LocalAccount,
        authname: &str,
        provider: &str,
    ) -> Result<LocalAccount, StoreError> {
        let mut state = self.write()?;
        if !state.accounts.contains_key(&account.id) {
            return Err(StoreError::NotFound);
        }
        account.external_link = Some(ExternalLink::new(authname, provider));
        account.last_login = Some(Utc::now());
        state
            .authmap
            .insert((provider.to_string(), authname.to_string()), account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }
}
