//! Applies asserted attributes (username, email, roles) to a local account.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use smbridge_core::Entity;

use crate::Role;
use crate::account::LocalAccount;
use crate::context::RequestContext;
use crate::identity::HeaderIdentityReader;
use crate::notice::Notice;
use crate::rules;
use crate::settings::ConfigProvider;
use crate::store::AccountStore;

/// What an attribute synchronization changed and what went wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub username_changed: bool,
    pub email_changed: bool,
    pub persisted: bool,
    pub notices: Vec<Notice>,
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        self.username_changed || self.email_changed
    }
}

/// Result of an additive role grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleGrantOutcome {
    /// Roles the account did not hold before.
    pub added: BTreeSet<Role>,
    pub persisted: bool,
    pub notices: Vec<Notice>,
}

pub struct AccountSynchronizer {
    config: Arc<dyn ConfigProvider>,
    accounts: Arc<dyn AccountStore>,
}

impl AccountSynchronizer {
    pub fn new(config: Arc<dyn ConfigProvider>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { config, accounts }
    }

    /// Copy the asserted username and email onto `account`.
    ///
    /// With `force` both fields are synchronized regardless of which mappings
    /// are configured. The account is persisted only if a field changed.
    pub fn synchronize_user_attributes(
        &self,
        account: &mut LocalAccount,
        ctx: &RequestContext,
        force: bool,
    ) -> SyncOutcome {
        let settings = self.config.settings();
        let reader = HeaderIdentityReader::new(settings);
        let sync_username = force || settings.username_mapping().is_some();
        let sync_email = force || settings.mail_mapping().is_some();

        let mut outcome = SyncOutcome::default();

        if sync_username {
            let name = reader.default_name(ctx);
            if name.is_empty() {
                warn!(account_id = %account.id, "no username asserted; username not synchronized");
                outcome.notices.push(Notice::MissingUsername);
            } else if self.owned_by_other(account, &name) {
                warn!(account_id = %account.id, username = %name, "username collision; rename skipped");
                outcome.notices.push(Notice::UsernameCollision(name));
            } else {
                match account.set_username(&name) {
                    Ok(changed) => outcome.username_changed = changed,
                    Err(_) => outcome.notices.push(Notice::MissingUsername),
                }
            }
        }

        if sync_email {
            let mail = reader.default_email(ctx);
            if mail.is_empty() {
                warn!(account_id = %account.id, "no email asserted; email not synchronized");
                outcome.notices.push(Notice::MissingEmail);
            } else {
                outcome.email_changed = account.set_email(&mail);
            }
        }

        if outcome.changed() {
            match self.accounts.save(account) {
                Ok(()) => {
                    outcome.persisted = true;
                    debug!(
                        account_id = %account.id,
                        username_changed = outcome.username_changed,
                        email_changed = outcome.email_changed,
                        "account attributes synchronized"
                    );
                }
                Err(e) => {
                    warn!(account_id = %account.id, error = %e, "failed to persist synchronized account");
                    outcome.notices.push(Notice::from(e));
                }
            }
        }

        outcome
    }

    /// Roles the configured mapping grants for the asserted attributes.
    pub fn matching_roles(&self, ctx: &RequestContext) -> BTreeSet<Role> {
        let settings = self.config.settings();
        let (Some(ruleset), Some(attributes)) = (
            settings.role_mapping(),
            HeaderIdentityReader::new(settings).attribute_set(ctx),
        ) else {
            return BTreeSet::new();
        };
        rules::evaluate(ruleset, attributes)
    }

    /// Union the matching roles into `account`; persists only if it grew.
    pub fn grant_roles(&self, account: &mut LocalAccount, ctx: &RequestContext) -> RoleGrantOutcome {
        let matching = self.matching_roles(ctx);
        let added = account.add_roles(&matching);

        let mut outcome = RoleGrantOutcome {
            added,
            ..Default::default()
        };
        if outcome.added.is_empty() {
            return outcome;
        }

        match self.accounts.save(account) {
            Ok(()) => {
                outcome.persisted = true;
                info!(account_id = %account.id, roles = ?outcome.added, "roles granted");
            }
            Err(e) => {
                warn!(account_id = %account.id, error = %e, "failed to persist role grants");
                outcome.notices.push(Notice::from(e));
            }
        }
        outcome
    }

    fn owned_by_other(&self, account: &LocalAccount, username: &str) -> bool {
        self.accounts
            .load_by_username(username)
            .is_some_and(|existing| !existing.is_same_entity(account))
    }
}
