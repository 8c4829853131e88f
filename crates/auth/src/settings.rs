//! Bridge configuration.
//!
//! Settings are persisted and edited elsewhere; the bridge only reads them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::{RuleParseError, RuleSet};

/// Options under the `user.` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Attribute key carrying the authoritative authname.
    pub username_mapping: Option<String>,
    /// Attribute key carrying the display name.
    pub user_mapping: Option<String>,
    /// Attribute key carrying the email address.
    pub mail_mapping: Option<String>,
    /// Role-mapping ruleset string.
    pub role_mapping: Option<String>,
    /// Re-run role grants on every login, not only on registration.
    pub role_evaluate_everytime: bool,
    /// Strip a `PREFIX\` from the raw authname.
    pub prefix_strip: bool,
    /// Strip an `@domain` from the raw authname.
    pub domain_strip: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub user: UserSettings,
    /// Base URL the logout action redirects to.
    pub logout_url: Option<String>,
    /// Name of the client-side cookie set by the proxy.
    pub siteminder_cookie: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error("invalid role mapping: {0}")]
    RoleMapping(#[from] RuleParseError),

    #[error("malformed settings: {0}")]
    Malformed(String),
}

/// Source of the current settings.
pub trait ConfigProvider: Send + Sync {
    fn settings(&self) -> &Settings;
}

impl ConfigProvider for Settings {
    fn settings(&self) -> &Settings {
        self
    }
}

/// `Some` only for a present, non-empty option.
pub(crate) fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Settings {
    pub fn username_mapping(&self) -> Option<&str> {
        configured(&self.user.username_mapping)
    }

    pub fn user_mapping(&self) -> Option<&str> {
        configured(&self.user.user_mapping)
    }

    pub fn mail_mapping(&self) -> Option<&str> {
        configured(&self.user.mail_mapping)
    }

    pub fn role_mapping(&self) -> Option<&str> {
        configured(&self.user.role_mapping)
    }

    pub fn logout_url(&self) -> Option<&str> {
        configured(&self.logout_url)
    }

    pub fn siteminder_cookie(&self) -> Option<&str> {
        configured(&self.siteminder_cookie)
    }

    /// Every dotted key [`Settings::get`] resolves.
    pub const KEYS: &'static [&'static str] = &[
        "user.username_mapping",
        "user.user_mapping",
        "user.mail_mapping",
        "user.role_mapping",
        "user.role_evaluate_everytime",
        "user.prefix_strip",
        "user.domain_strip",
        "logout_url",
        "siteminder_cookie",
    ];

    /// Look up an option by its dotted key (`user.mail_mapping`, `logout_url`, ...).
    pub fn get(&self, key: &str) -> Option<String> {
        let flag = |b: bool| Some(b.to_string());
        match key {
            "user.username_mapping" => self.user.username_mapping.clone(),
            "user.user_mapping" => self.user.user_mapping.clone(),
            "user.mail_mapping" => self.user.mail_mapping.clone(),
            "user.role_mapping" => self.user.role_mapping.clone(),
            "user.role_evaluate_everytime" => flag(self.user.role_evaluate_everytime),
            "user.prefix_strip" => flag(self.user.prefix_strip),
            "user.domain_strip" => flag(self.user.domain_strip),
            "logout_url" => self.logout_url.clone(),
            "siteminder_cookie" => self.siteminder_cookie.clone(),
            _ => None,
        }
    }

    /// Save-time validation: an authname source must exist and a configured
    /// role mapping must parse strictly.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.username_mapping().is_none() {
            return Err(SettingsError::Missing("user.username_mapping"));
        }
        if let Some(rules) = self.role_mapping() {
            RuleSet::parse(rules)?;
        }
        Ok(())
    }

    /// Apply the configured prefix/domain stripping to a raw authname.
    pub fn normalize_authname<'a>(&self, raw: &'a str) -> &'a str {
        let mut name = raw;
        if self.user.prefix_strip {
            if let Some((_, rest)) = name.rsplit_once('\\') {
                name = rest;
            }
        }
        if self.user.domain_strip {
            if let Some((local, _)) = name.split_once('@') {
                name = local;
            }
        }
        name
    }
}
