//! Recoverable, user-visible errors.
//!
//! A notice degrades one part of a flow; it never aborts the request. Callers
//! decide how to show them.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Notice {
    #[error("Error registering user: an account with username '{0}' already exists.")]
    DuplicateUsername(String),

    #[error("Error synchronizing username: an account with username '{0}' already exists.")]
    UsernameCollision(String),

    #[error("Error synchronizing username: no username is provided by the identity headers.")]
    MissingUsername,

    #[error("Error synchronizing mail: no email address is provided by the identity headers.")]
    MissingEmail,

    #[error("Error updating account: {0}")]
    Store(String),
}

impl From<StoreError> for Notice {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateUsername(name) => Notice::DuplicateUsername(name),
            other => Notice::Store(other.to_string()),
        }
    }
}
