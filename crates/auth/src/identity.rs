//! Reads the asserted identity out of the trusted request context.

use crate::context::RequestContext;
use crate::settings::Settings;

/// Extracts asserted-identity attributes using the configured mappings.
///
/// Every lookup goes through [`HeaderIdentityReader::attribute_set`], so no
/// attribute is visible unless the username attribute was asserted.
#[derive(Debug, Clone, Copy)]
pub struct HeaderIdentityReader<'a> {
    settings: &'a Settings,
}

impl<'a> HeaderIdentityReader<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn is_authenticated(&self, ctx: &RequestContext) -> bool {
        !self.authname(ctx).is_empty()
    }

    /// The authname, or an empty string when none is asserted.
    pub fn authname(&self, ctx: &RequestContext) -> String {
        self.lookup(ctx, self.settings.username_mapping())
    }

    pub fn default_name(&self, ctx: &RequestContext) -> String {
        self.lookup(ctx, self.settings.user_mapping())
    }

    pub fn default_email(&self, ctx: &RequestContext) -> String {
        self.lookup(ctx, self.settings.mail_mapping())
    }

    /// The full attribute context, but only when the username attribute is
    /// present and non-empty in it.
    pub fn attribute_set<'c>(&self, ctx: &'c RequestContext) -> Option<&'c RequestContext> {
        let key = self.settings.username_mapping()?;
        match ctx.get(key) {
            Some(value) if !value.is_empty() => Some(ctx),
            _ => None,
        }
    }

    fn lookup(&self, ctx: &RequestContext, key: Option<&str>) -> String {
        let (Some(attributes), Some(key)) = (self.attribute_set(ctx), key) else {
            return String::new();
        };
        attributes
            .get(key)
            .and_then(|v| v.first())
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::UserSettings;

    fn settings() -> Settings {
        Settings {
            user: UserSettings {
                username_mapping: Some("HTTP_SM_USER".to_string()),
                user_mapping: Some("HTTP_SM_DISPLAYNAME".to_string()),
                mail_mapping: Some("HTTP_SM_MAIL".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn reads_mapped_attributes() {
        let s = settings();
        let reader = HeaderIdentityReader::new(&s);
        let ctx = RequestContext::new()
            .with("HTTP_SM_USER", "alice")
            .with("HTTP_SM_DISPLAYNAME", "alice.smith")
            .with("HTTP_SM_MAIL", "alice@example.org");

        assert!(reader.is_authenticated(&ctx));
        assert_eq!(reader.authname(&ctx), "alice");
        assert_eq!(reader.default_name(&ctx), "alice.smith");
        assert_eq!(reader.default_email(&ctx), "alice@example.org");
    }

    #[test]
    fn missing_username_attribute_hides_everything() {
        let s = settings();
        let reader = HeaderIdentityReader::new(&s);
        let ctx = RequestContext::new()
            .with("HTTP_SM_DISPLAYNAME", "alice.smith")
            .with("HTTP_SM_MAIL", "alice@example.org");

        assert!(!reader.is_authenticated(&ctx));
        assert_eq!(reader.authname(&ctx), "");
        assert_eq!(reader.default_email(&ctx), "");
        assert!(reader.attribute_set(&ctx).is_none());
    }

    #[test]
    fn empty_username_attribute_is_not_an_assertion() {
        let s = settings();
        let reader = HeaderIdentityReader::new(&s);
        let ctx = RequestContext::new()
            .with("HTTP_SM_USER", "")
            .with("HTTP_SM_MAIL", "alice@example.org");

        assert!(!reader.is_authenticated(&ctx));
        assert!(reader.attribute_set(&ctx).is_none());
    }

    #[test]
    fn unconfigured_mapping_yields_empty_string() {
        let mut s = settings();
        s.user.mail_mapping = None;
        let reader = HeaderIdentityReader::new(&s);
        let ctx = RequestContext::new()
            .with("HTTP_SM_USER", "alice")
            .with("HTTP_SM_MAIL", "alice@example.org");

        assert_eq!(reader.default_email(&ctx), "");
    }

    #[test]
    fn no_username_mapping_means_nothing_is_asserted() {
        let s = Settings::default();
        let reader = HeaderIdentityReader::new(&s);
        let ctx = RequestContext::new().with("HTTP_SM_USER", "alice");
        assert!(!reader.is_authenticated(&ctx));
    }

    #[test]
    fn multi_valued_identity_attribute_uses_first_value() {
        let s = settings();
        let reader = HeaderIdentityReader::new(&s);
        let ctx = RequestContext::new()
            .with("HTTP_SM_USER", "alice")
            .with("HTTP_SM_MAIL", ["alice@example.org", "a.smith@example.org"]);
        assert_eq!(reader.default_email(&ctx), "alice@example.org");
    }
}
