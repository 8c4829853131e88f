//! Authentication bridge: reconciles the local session with the asserted identity.
//!
//! | Local session  | Asserted identity     | Action                                   |
//! |----------------|-----------------------|------------------------------------------|
//! | authenticated  | present, differs      | destroy session, redirect to entrypoint  |
//! | authenticated  | present, same         | none                                     |
//! | authenticated  | absent                | none                                     |
//! | anonymous      | present               | login or register, establish session     |
//! | anonymous      | absent                | none                                     |
//!
//! Every path except the mismatch ends at the application root. The mismatch
//! path re-enters the entrypoint; on that second pass the session is anonymous
//! and the current asserted identity is logged in.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::account::{LocalAccount, PROVIDER};
use crate::context::{RequestContext, RequestOrigin};
use crate::identity::HeaderIdentityReader;
use crate::notice::Notice;
use crate::settings::ConfigProvider;
use crate::store::{AccountStore, ExternalIdentityStore};
use crate::sync::AccountSynchronizer;

pub const APPLICATION_ROOT: &str = "/";
pub const AUTHENTICATION_ENTRYPOINT: &str = "/siteminder/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    ApplicationRoot,
    AuthenticationEntrypoint,
    External(String),
}

impl RedirectTarget {
    pub fn location(&self) -> &str {
        match self {
            RedirectTarget::ApplicationRoot => APPLICATION_ROOT,
            RedirectTarget::AuthenticationEntrypoint => AUTHENTICATION_ENTRYPOINT,
            RedirectTarget::External(url) => url,
        }
    }
}

/// The local (application) session for the current request.
pub trait LocalSession {
    /// Authname the session was established for; `None` when anonymous.
    fn authname(&self) -> Option<&str>;

    /// Drop the local identity. Must take effect before the response is sent.
    fn destroy(&mut self);

    fn establish(&mut self, account: &LocalAccount, authname: &str);
}

/// Which row of the state table a request landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeDecision {
    SessionMismatch,
    InSync,
    LocalOnly,
    LoginOrRegister,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationOutcome {
    pub decision: BridgeDecision,
    pub redirect: RedirectTarget,
    /// The account the session was established for, if any.
    pub account: Option<LocalAccount>,
    pub notices: Vec<Notice>,
}

impl AuthenticationOutcome {
    fn no_op(decision: BridgeDecision) -> Self {
        Self {
            decision,
            redirect: RedirectTarget::ApplicationRoot,
            account: None,
            notices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginOutcome {
    pub account: Option<LocalAccount>,
    pub notices: Vec<Notice>,
}

pub struct AuthenticationBridge {
    config: Arc<dyn ConfigProvider>,
    accounts: Arc<dyn AccountStore>,
    external: Arc<dyn ExternalIdentityStore>,
    synchronizer: AccountSynchronizer,
}

impl AuthenticationBridge {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        accounts: Arc<dyn AccountStore>,
        external: Arc<dyn ExternalIdentityStore>,
    ) -> Self {
        let synchronizer = AccountSynchronizer::new(config.clone(), accounts.clone());
        Self {
            config,
            accounts,
            external,
            synchronizer,
        }
    }

    pub fn authenticate(
        &self,
        ctx: &RequestContext,
        session: &mut dyn LocalSession,
    ) -> AuthenticationOutcome {
        let reader = HeaderIdentityReader::new(self.config.settings());
        let asserted = reader.authname(ctx);
        let local = session.authname().map(str::to_owned);

        match local {
            Some(local) if !asserted.is_empty() && local != asserted => {
                info!(local = %local, asserted = %asserted, "session identity mismatch; destroying local session");
                session.destroy();
                AuthenticationOutcome {
                    redirect: RedirectTarget::AuthenticationEntrypoint,
                    ..AuthenticationOutcome::no_op(BridgeDecision::SessionMismatch)
                }
            }
            Some(_) if !asserted.is_empty() => {
                debug!(authname = %asserted, "session matches asserted identity");
                AuthenticationOutcome::no_op(BridgeDecision::InSync)
            }
            Some(local) => {
                debug!(local = %local, "no asserted identity; keeping local session");
                AuthenticationOutcome::no_op(BridgeDecision::LocalOnly)
            }
            None if asserted.is_empty() => {
                debug!("anonymous request without asserted identity");
                AuthenticationOutcome::no_op(BridgeDecision::Anonymous)
            }
            None => {
                let login = self.external_login_register(&asserted, ctx);
                if let Some(account) = &login.account {
                    session.establish(account, &asserted);
                }
                AuthenticationOutcome {
                    account: login.account,
                    notices: login.notices,
                    ..AuthenticationOutcome::no_op(BridgeDecision::LoginOrRegister)
                }
            }
        }
    }

    /// Log in the account linked to `authname`, registering one if needed.
    pub fn external_login_register(&self, authname: &str, ctx: &RequestContext) -> LoginOutcome {
        let mut outcome = match self.external.login(authname, PROVIDER) {
            Some(account) => {
                info!(authname, account_id = %account.id, "logged in linked account");
                LoginOutcome {
                    account: Some(account),
                    notices: Vec::new(),
                }
            }
            None => self.external_register(authname, ctx),
        };

        if self.config.settings().user.role_evaluate_everytime {
            if let Some(account) = outcome.account.as_mut() {
                let grant = self.synchronizer.grant_roles(account, ctx);
                outcome.notices.extend(grant.notices);
            }
        }

        outcome
    }

    /// Link an existing same-named account or register a new one, then force
    /// an attribute sync and finalize the login.
    pub fn external_register(&self, authname: &str, ctx: &RequestContext) -> LoginOutcome {
        let mut notices = Vec::new();

        let account = match self.accounts.load_by_username(authname) {
            Some(existing) => {
                match self.external.link_existing_account(authname, PROVIDER, &existing) {
                    Ok(()) => {
                        info!(authname, account_id = %existing.id, "linked existing account");
                        Some(existing)
                    }
                    Err(e) => {
                        warn!(authname, error = %e, "failed to link existing account");
                        notices.push(Notice::from(e));
                        None
                    }
                }
            }
            None => match self.external.register(authname, PROVIDER) {
                Ok(account) => {
                    info!(authname, account_id = %account.id, "registered account");
                    Some(account)
                }
                Err(e) => {
                    warn!(authname, error = %e, "registration failed");
                    notices.push(Notice::from(e));
                    None
                }
            },
        };

        let Some(mut account) = account else {
            return LoginOutcome {
                account: None,
                notices,
            };
        };

        let sync = self
            .synchronizer
            .synchronize_user_attributes(&mut account, ctx, true);
        notices.extend(sync.notices);

        match self.external.finalize_login(account, authname, PROVIDER) {
            Ok(account) => LoginOutcome {
                account: Some(account),
                notices,
            },
            Err(e) => {
                warn!(authname, error = %e, "failed to finalize login");
                notices.push(Notice::from(e));
                LoginOutcome {
                    account: None,
                    notices,
                }
            }
        }
    }

    /// Logout redirect using the configured `logout_url`.
    pub fn logout(&self, origin: &RequestOrigin) -> Option<RedirectTarget> {
        logout(self.config.settings().logout_url(), origin)
    }
}

/// `logout_url?referrer=scheme://host`, or no redirect when no URL is set.
pub fn logout(logout_url: Option<&str>, origin: &RequestOrigin) -> Option<RedirectTarget> {
    let base = logout_url.filter(|u| !u.is_empty())?;
    Some(RedirectTarget::External(format!(
        "{base}?referrer={}",
        origin.application_url()
    )))
}
