use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier granted to local accounts.
///
/// Roles are opaque strings at this layer; what a role allows is decided by
/// the application that consumes the account store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}
