//! Local account record as seen by the bridge.
//!
//! The account store owns these records; the bridge only reads them and hands
//! mutated copies back for persistence.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use smbridge_core::{AccountId, DomainError, DomainResult, Entity};

use crate::Role;

/// Namespace tag under which asserted identities are linked to local accounts.
pub const PROVIDER: &str = "siteminder";

/// Link between a local account and an externally asserted identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalLink {
    pub provider: String,
    pub authname: String,
}

impl ExternalLink {
    pub fn new(authname: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            authname: authname.into(),
        }
    }
}

/// A local account.
///
/// # Invariants
/// - `username` is never empty.
/// - `roles` only grow through [`LocalAccount::add_roles`]; the bridge never
///   revokes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAccount {
    pub id: AccountId,
    pub username: String,
    pub email: Option<String>,
    pub roles: BTreeSet<Role>,
    pub external_link: Option<ExternalLink>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl LocalAccount {
    pub fn new(id: AccountId, username: impl Into<String>) -> DomainResult<Self> {
        let username = username.into();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }

        Ok(Self {
            id,
            username,
            email: None,
            roles: BTreeSet::new(),
            external_link: None,
            created_at: Utc::now(),
            last_login: None,
        })
    }

    /// Set the username. Returns `true` if the stored value changed.
    pub fn set_username(&mut self, username: &str) -> DomainResult<bool> {
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        if self.username == username {
            return Ok(false);
        }
        self.username = username.to_string();
        Ok(true)
    }

    /// Set the email. Returns `true` if the stored value changed.
    pub fn set_email(&mut self, email: &str) -> bool {
        if self.email.as_deref() == Some(email) {
            return false;
        }
        self.email = Some(email.to_string());
        true
    }

    /// Union `roles` into the account. Returns the roles that were not held before.
    pub fn add_roles<'a>(&mut self, roles: impl IntoIterator<Item = &'a Role>) -> BTreeSet<Role> {
        let mut added = BTreeSet::new();
        for role in roles {
            if self.roles.insert(role.clone()) {
                added.insert(role.clone());
            }
        }
        added
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }

    pub fn is_linked_to(&self, authname: &str, provider: &str) -> bool {
        self.external_link
            .as_ref()
            .is_some_and(|l| l.authname == authname && l.provider == provider)
    }
}

impl Entity for LocalAccount {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> LocalAccount {
        LocalAccount::new(AccountId::new(), name).unwrap()
    }

    #[test]
    fn empty_username_is_rejected() {
        let err = LocalAccount::new(AccountId::new(), "").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn setting_same_username_reports_no_change() {
        let mut a = account("alice");
        assert!(!a.set_username("alice").unwrap());
        assert!(a.set_username("alice.smith").unwrap());
        assert_eq!(a.username, "alice.smith");
    }

    #[test]
    fn set_email_reports_change_only_once() {
        let mut a = account("alice");
        assert!(a.set_email("alice@example.org"));
        assert!(!a.set_email("alice@example.org"));
    }

    #[test]
    fn add_roles_is_a_set_union() {
        let mut a = account("alice");
        let staff = Role::new("staff");
        let admin = Role::new("admin");

        let added = a.add_roles([&staff, &admin]);
        assert_eq!(added.len(), 2);

        let added = a.add_roles([&staff]);
        assert!(added.is_empty());
        assert_eq!(a.roles.len(), 2);
        assert!(a.has_role("admin"));
    }

    #[test]
    fn identity_is_by_id_not_attributes() {
        let a = account("alice");
        let mut b = a.clone();
        b.username = "someone-else".to_string();
        assert!(a.is_same_entity(&b));
        assert!(!a.is_same_entity(&account("alice")));
    }

    #[test]
    fn link_matches_authname_and_provider() {
        let mut a = account("alice");
        a.external_link = Some(ExternalLink::new("alice", PROVIDER));
        assert!(a.is_linked_to("alice", PROVIDER));
        assert!(!a.is_linked_to("alice", "other"));
        assert!(!a.is_linked_to("bob", PROVIDER));
    }
}
