//! Settings loading: a JSON file plus `SMBRIDGE_*` environment overrides.

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};

use smbridge_auth::{Settings, SettingsError};

/// Path of the JSON settings file.
pub const SETTINGS_PATH_VAR: &str = "SMBRIDGE_SETTINGS";

pub fn from_json_str(json: &str) -> Result<Settings, SettingsError> {
    serde_json::from_str(json).map_err(|e| SettingsError::Malformed(e.to_string()))
}

pub fn from_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings file {}", path.display()))?;
    let settings = from_json_str(&raw)
        .with_context(|| format!("parsing settings file {}", path.display()))?;
    Ok(settings)
}

/// Override individual options from `lookup` (normally the process environment).
pub fn apply_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let text = |key: &str, slot: &mut Option<String>| {
        if let Some(v) = lookup(key) {
            *slot = Some(v);
        }
    };
    text("SMBRIDGE_USERNAME_MAPPING", &mut settings.user.username_mapping);
    text("SMBRIDGE_USER_MAPPING", &mut settings.user.user_mapping);
    text("SMBRIDGE_MAIL_MAPPING", &mut settings.user.mail_mapping);
    text("SMBRIDGE_ROLE_MAPPING", &mut settings.user.role_mapping);
    text("SMBRIDGE_LOGOUT_URL", &mut settings.logout_url);
    text("SMBRIDGE_SITEMINDER_COOKIE", &mut settings.siteminder_cookie);

    let flag = |key: &str, slot: &mut bool| {
        if let Some(v) = lookup(key) {
            *slot = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    };
    flag("SMBRIDGE_ROLE_EVALUATE_EVERYTIME", &mut settings.user.role_evaluate_everytime);
    flag("SMBRIDGE_PREFIX_STRIP", &mut settings.user.prefix_strip);
    flag("SMBRIDGE_DOMAIN_STRIP", &mut settings.user.domain_strip);
}

/// Load settings for the running process and validate them.
pub fn load_from_env() -> anyhow::Result<Settings> {
    let mut settings = match std::env::var(SETTINGS_PATH_VAR) {
        Ok(path) => {
            info!(path = %path, "loading settings file");
            from_file(Path::new(&path))?
        }
        Err(_) => {
            warn!("{SETTINGS_PATH_VAR} not set; using environment overrides only");
            Settings::default()
        }
    };
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate().context("validating settings")?;
    for key in Settings::KEYS {
        debug!(key, value = settings.get(key).as_deref().unwrap_or(""), "setting");
    }
    Ok(settings)
}
