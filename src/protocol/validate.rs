//! Declarative message contracts.
//!
//! Handlers describe what they accept with a [`Contract`] and call
//! [`Message::validate`]. Every violation is collected; the resulting
//! [`ValidationError`] lists them all.

use super::Message;
use crate::codec::{format_flag, join_natural, normalize_name};
use crate::error::ValidationError;

/// What a handler requires and accepts.
///
/// By default nothing is required and no values or flags are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract {
    /// Objects must be present
    pub require_objects: bool,
    /// Keys that must be present
    pub required_values: Vec<String>,
    /// Keys that may be present
    pub accepted_values: Vec<String>,
    /// Flag names that may be present (sigils are ignored)
    pub accepted_flags: Vec<String>,
    /// Accept keys not listed above
    pub allow_other_values: bool,
    /// Accept flags not listed above
    pub allow_other_flags: bool,
}

impl Contract {
    /// Create an empty contract
    pub fn new() -> Self {
        Self::default()
    }

    /// Require at least one object
    pub fn require_objects(mut self) -> Self {
        self.require_objects = true;
        self
    }

    /// Require keys
    pub fn require_values<S: AsRef<str>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.required_values
            .extend(keys.into_iter().map(|k| normalize_name(k.as_ref())));
        self
    }

    /// Accept optional keys
    pub fn accept_values<S: AsRef<str>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.accepted_values
            .extend(keys.into_iter().map(|k| normalize_name(k.as_ref())));
        self
    }

    /// Accept flags, given with or without sigil
    pub fn accept_flags<S: AsRef<str>>(mut self, flags: impl IntoIterator<Item = S>) -> Self {
        self.accepted_flags
            .extend(flags.into_iter().map(|f| normalize_name(f.as_ref())));
        self
    }

    /// Accept any key
    pub fn allow_other_values(mut self) -> Self {
        self.allow_other_values = true;
        self
    }

    /// Accept any flag
    pub fn allow_other_flags(mut self) -> Self {
        self.allow_other_flags = true;
        self
    }

    fn knows_value(&self, key: &str) -> bool {
        self.required_values.iter().any(|k| k == key) || self.accepted_values.iter().any(|k| k == key)
    }

    fn knows_flag(&self, name: &str) -> bool {
        self.accepted_flags.iter().any(|f| f == name)
    }
}

impl Message {
    /// Check this message against a contract.
    pub fn validate(&self, contract: &Contract) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if contract.require_objects && self.objects().is_empty() {
            violations.push("missing required objects".to_string());
        }

        let mut missing: Vec<String> = contract
            .required_values
            .iter()
            .filter(|k| self.value(k).is_none())
            .map(|k| format!("{k}="))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            violations.push(format!(
                "missing required key/value pair(s) {}",
                join_natural(&missing, "and")
            ));
        }

        if !contract.allow_other_values {
            let mut unknown: Vec<String> = self
                .values()
                .iter()
                .filter(|(k, _)| !contract.knows_value(k))
                .map(|(k, _)| format!("{k}="))
                .collect();
            if !unknown.is_empty() {
                unknown.sort();
                violations.push(format!(
                    "unknown key/value pair(s) {}",
                    join_natural(&unknown, "and")
                ));
            }
        }

        if !contract.allow_other_flags {
            let mut unknown: Vec<String> = self
                .flags()
                .iter()
                .filter(|(f, _)| !contract.knows_flag(f))
                .map(|(f, p)| format_flag(f, *p))
                .collect();
            if !unknown.is_empty() {
                unknown.sort();
                violations.push(format!("unknown flag(s) {}", join_natural(&unknown, "and")));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                prefixes: self.prefixes(),
                violations,
            })
        }
    }
}
