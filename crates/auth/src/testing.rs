//! Minimal collaborators for unit tests in this crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;

use smbridge_core::AccountId;

use crate::account::{ExternalLink, LocalAccount};
use crate::store::{AccountStore, ExternalIdentityStore, StoreError};

#[derive(Debug, Default)]
pub(crate) struct MemoryDirectory {
    accounts: Mutex<HashMap<AccountId, LocalAccount>>,
    links: Mutex<HashMap<(String, String), AccountId>>,
    saves: AtomicUsize,
}

impl MemoryDirectory {
    /// Insert an unlinked account without counting a save.
    pub(crate) fn seed(&self, username: &str) -> LocalAccount {
        let account = LocalAccount::new(AccountId::new(), username).unwrap();
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        account
    }

    pub(crate) fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub(crate) fn count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub(crate) fn get(&self, id: AccountId) -> Option<LocalAccount> {
        self.accounts.lock().unwrap().get(&id).cloned()
    }
}

impl AccountStore for MemoryDirectory {
    fn load_by_username(&self, username: &str) -> Option<LocalAccount> {
        self.accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.username == username)
            .cloned()
    }

    fn save(&self, account: &LocalAccount) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(())
    }
}

impl ExternalIdentityStore for MemoryDirectory {
    fn login(&self, authname: &str, provider: &str) -> Option<LocalAccount> {
        let id = *self
            .links
            .lock()
            .unwrap()
            .get(&(provider.to_string(), authname.to_string()))?;
        self.get(id)
    }

    fn register(&self, authname: &str, provider: &str) -> Result<LocalAccount, StoreError> {
        if self.load_by_username(authname).is_some() {
            return Err(StoreError::DuplicateUsername(authname.to_string()));
        }
        let mut account = self.seed(authname);
        self.link_existing_account(authname, provider, &account)?;
        account.external_link = Some(ExternalLink::new(authname, provider));
        Ok(account)
    }

    fn link_existing_account(
        &self,
        authname: &str,
        provider: &str,
        account: &LocalAccount,
    ) -> Result<(), StoreError> {
        self.links
            .lock()
            .unwrap()
            .insert((provider.to_string(), authname.to_string()), account.id);
        if let Some(stored) = self.accounts.lock().unwrap().get_mut(&account.id) {
            stored.external_link = Some(ExternalLink::new(authname, provider));
        }
        Ok(())
    }

    fn finalize_login(
        &self,
        mut account: LocalAccount,
        authname: &str,
        provider: &str,
    ) -> Result<LocalAccount, StoreError> {
        account.external_link = Some(ExternalLink::new(authname, provider));
        account.last_login = Some(Utc::now());
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(account)
    }
}
