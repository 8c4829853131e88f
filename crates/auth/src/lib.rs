//! `smbridge-auth` — bridges a proxy-asserted identity into local accounts.
//!
//! The reverse proxy in front of the application has already authenticated
//! the user and forwards identity attributes as request headers. This crate
//! only trusts and interprets those attributes: it decides whether to log in,
//! register or reconcile a session, and which roles to grant.
//!
//! This crate is decoupled from HTTP and storage; both come in through the
//! traits in [`store`], [`settings`] and [`bridge`].

pub mod account;
pub mod bridge;
pub mod context;
pub mod identity;
pub mod notice;
pub mod roles;
pub mod rules;
pub mod settings;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use account::{ExternalLink, LocalAccount, PROVIDER};
pub use bridge::{
    APPLICATION_ROOT, AUTHENTICATION_ENTRYPOINT, AuthenticationBridge, AuthenticationOutcome, BridgeDecision,
    LocalSession, LoginOutcome, RedirectTarget, logout,
};
pub use context::{AttributeValue, RequestContext, RequestOrigin};
pub use identity::HeaderIdentityReader;
pub use notice::Notice;
pub use roles::Role;
pub use rules::{Condition, Operator, RoleMappingRule, RuleParseError, RuleSet, evaluate};
pub use settings::{ConfigProvider, Settings, SettingsError, UserSettings};
pub use store::{AccountStore, ExternalIdentityStore, StoreError};
pub use sync::{AccountSynchronizer, RoleGrantOutcome, SyncOutcome};
