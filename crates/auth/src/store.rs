//! Collaborator interfaces the bridge drives.
//!
//! Implementations must be safe for concurrent use across requests; the bridge
//! performs no locking of its own.

use thiserror::Error;

use smbridge_core::DomainError;

use crate::account::LocalAccount;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("an account with username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("account not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => StoreError::NotFound,
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Generic local account storage.
pub trait AccountStore: Send + Sync {
    fn load_by_username(&self, username: &str) -> Option<LocalAccount>;

    /// Persist `account`, replacing the stored record with the same id.
    fn save(&self, account: &LocalAccount) -> Result<(), StoreError>;
}

/// Links asserted identities to local accounts.
pub trait ExternalIdentityStore: Send + Sync {
    /// The account linked to `(authname, provider)`, logged in, if any.
    fn login(&self, authname: &str, provider: &str) -> Option<LocalAccount>;

    /// Create a local account named `authname` and link it.
    ///
    /// Fails with [`StoreError::DuplicateUsername`] if the username is taken.
    fn register(&self, authname: &str, provider: &str) -> Result<LocalAccount, StoreError>;

    fn link_existing_account(
        &self,
        authname: &str,
        provider: &str,
        account: &LocalAccount,
    ) -> Result<(), StoreError>;

    /// Complete the login binding and return the account as stored.
    fn finalize_login(
        &self,
        account: LocalAccount,
        authname: &str,
        provider: &str,
    ) -> Result<LocalAccount, StoreError>;
}
