//! Capability key type

use crate::utils::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Literal wildcard key held only by the `system-admin` role.
///
/// Checked as an ordinary member of the effective capability set,
/// never as a prefix match.
pub const SYSTEM_WILDCARD: &str = "system:*";

/// An opaque permission key of the shape `domain:action` or
/// `domain:resource:action`, e.g. `course:edit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityKey(String);

impl CapabilityKey {
    /// Parse and validate a capability key
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let segments: Vec<&str> = key.split(':').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(AuthzError::validation(format!(
                "capability key '{key}' must have at least two non-empty colon-separated segments"
            )));
        }
        if key.chars().any(char::is_whitespace) {
            return Err(AuthzError::validation(format!(
                "capability key '{key}' must not contain whitespace"
            )));
        }
        Ok(Self(key))
    }

    /// The literal `system:*` key
    pub fn system_wildcard() -> Self {
        Self(SYSTEM_WILDCARD.to_string())
    }

    /// Whether this is the literal `system:*` key
    pub fn is_system_wildcard(&self) -> bool {
        self.0 == SYSTEM_WILDCARD
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CapabilityKey {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for CapabilityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
