//! Role-mapping rule engine.
//!
//! Grammar (delimiters are literal, whitespace is significant):
//!
//! ```text
//! ruleset   := rule ( "|" rule )*
//! rule      := roleId ":" condition ( ";" condition )*
//! condition := attributeKey "," operator "," value
//! operator  := "=" | "@=" | "~="
//! ```
//!
//! Conditions within a rule are OR'd: a rule grants its role as soon as any one
//! of its conditions holds. `staff:a,=,x;b,=,y` grants `staff` when either
//! `a = x` or `b = y`.
//!
//! There are two entry points. [`RuleSet::parse`] is strict and meant for
//! validating configuration. [`evaluate`] is lenient: malformed rules and
//! conditions are skipped (they never match) so a bad mapping cannot fail a
//! login.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::Role;
use crate::context::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`: the attribute equals the value exactly. A multi-valued attribute
    /// is compared in its comma-joined form, so `[a, b]` equals `a,b`.
    Equals,
    /// `@=`: the part after `@` in the attribute's first value equals the value.
    DomainSuffixMatch,
    /// `~=`: the value occurs inside any of the attribute's values.
    SubstringMatch,
}

impl Operator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Operator::Equals),
            "@=" => Some(Operator::DomainSuffixMatch),
            "~=" => Some(Operator::SubstringMatch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::DomainSuffixMatch => "@=",
            Operator::SubstringMatch => "~=",
        }
    }
}

impl core::fmt::Display for Operator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub attribute_key: String,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(
        attribute_key: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            attribute_key: attribute_key.into(),
            operator,
            value: value.into(),
        }
    }

    /// A condition whose attribute is absent never matches.
    pub fn matches(&self, attributes: &RequestContext) -> bool {
        let Some(attribute) = attributes.get(&self.attribute_key) else {
            return false;
        };

        match self.operator {
            Operator::Equals => attribute.joined() == self.value.as_str(),
            // Only the first value is inspected.
            Operator::DomainSuffixMatch => attribute
                .first()
                .and_then(|v| v.split_once('@'))
                .is_some_and(|(_, domain)| domain == self.value),
            Operator::SubstringMatch => attribute
                .values()
                .iter()
                .any(|v| v.contains(self.value.as_str())),
        }
    }
}

impl core::fmt::Display for Condition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{},{},{}", self.attribute_key, self.operator, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMappingRule {
    pub role: Role,
    pub conditions: Vec<Condition>,
}

impl RoleMappingRule {
    /// Whether any condition holds. A rule without conditions never grants.
    pub fn matches(&self, attributes: &RequestContext) -> bool {
        self.conditions.iter().any(|c| c.matches(attributes))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("rule '{0}' has no ':' separating the role id from its conditions")]
    MissingRoleSeparator(String),

    #[error("rule '{0}' has an empty role id")]
    EmptyRoleId(String),

    #[error("condition '{0}' must have the form key,operator,value")]
    MalformedCondition(String),

    #[error("condition '{condition}' uses unknown operator '{operator}'")]
    UnknownOperator { condition: String, operator: String },

    #[error("rule for role '{0}' has no conditions")]
    NoConditions(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub rules: Vec<RoleMappingRule>,
}

impl RuleSet {
    /// Strict parse: any malformed rule or condition is an error.
    pub fn parse(input: &str) -> Result<Self, RuleParseError> {
        let mut rules = Vec::new();
        for raw_rule in split_rules(input) {
            let (role_id, raw_conditions) = raw_rule
                .split_once(':')
                .ok_or_else(|| RuleParseError::MissingRoleSeparator(raw_rule.to_string()))?;
            if role_id.is_empty() {
                return Err(RuleParseError::EmptyRoleId(raw_rule.to_string()));
            }

            let mut conditions = Vec::new();
            for raw in split_conditions(raw_conditions) {
                let parts: Vec<&str> = raw.split(',').collect();
                let &[key, token, value] = parts.as_slice() else {
                    return Err(RuleParseError::MalformedCondition(raw.to_string()));
                };
                let operator =
                    Operator::from_token(token).ok_or_else(|| RuleParseError::UnknownOperator {
                        condition: raw.to_string(),
                        operator: token.to_string(),
                    })?;
                conditions.push(Condition::new(key, operator, value));
            }

            if conditions.is_empty() {
                return Err(RuleParseError::NoConditions(role_id.to_string()));
            }
            rules.push(RoleMappingRule {
                role: Role::from(role_id),
                conditions,
            });
        }
        Ok(Self { rules })
    }

    /// Lenient parse: keeps every well-formed condition and drops the rest.
    ///
    /// A condition with more than three comma-separated parts keeps its first
    /// three; a condition with an unrecognised operator is dropped. Rules left
    /// without conditions are kept but can never grant.
    pub fn parse_lenient(input: &str) -> Self {
        let rules = split_rules(input)
            .filter_map(|raw_rule| {
                let (role_id, raw_conditions) = raw_rule.split_once(':')?;
                if role_id.is_empty() {
                    return None;
                }
                let conditions = split_conditions(raw_conditions)
                    .filter_map(|raw| {
                        let mut parts = raw.split(',');
                        let key = parts.next()?;
                        let operator = Operator::from_token(parts.next()?)?;
                        let value = parts.next()?;
                        Some(Condition::new(key, operator, value))
                    })
                    .collect();
                Some(RoleMappingRule {
                    role: Role::from(role_id),
                    conditions,
                })
            })
            .collect();
        Self { rules }
    }

    /// Roles granted by this rule set for `attributes`.
    pub fn evaluate(&self, attributes: &RequestContext) -> BTreeSet<Role> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(attributes))
            .map(|rule| rule.role.clone())
            .collect()
    }
}

/// Evaluate a ruleset string against `attributes`. Never fails.
pub fn evaluate(ruleset: &str, attributes: &RequestContext) -> BTreeSet<Role> {
    let roles = RuleSet::parse_lenient(ruleset).evaluate(attributes);
    debug!(matched = ?roles, "role mapping evaluated");
    roles
}

fn split_rules(input: &str) -> impl Iterator<Item = &str> {
    input.split('|').filter(|r| !r.is_empty())
}

// A trailing ';' is tolerated.
fn split_conditions(input: &str) -> impl Iterator<Item = &str> {
    input.split(';').filter(|c| !c.is_empty())
}
