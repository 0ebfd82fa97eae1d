//! Access decision engine
//!
//! Evaluates an access requirement against a principal's effective
//! capability set. Gates run in a fixed order: escalation, then admin
//! roles, then capability lookup. Which capability was missing is logged
//! server-side only and never serialized back to the caller.

#[cfg(test)]
mod tests;

use crate::model::{CapabilityKey, Principal};
use crate::resolver::CapabilityResolver;
use crate::utils::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// The capability part of a requirement: one key, or any-of a non-empty
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequiredCapabilities {
    /// Exactly this capability
    Single(CapabilityKey),
    /// Any one of these capabilities suffices
    AnyOf(Vec<CapabilityKey>),
}

/// What an operation demands before it may proceed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    /// Capability expression
    pub capabilities: RequiredCapabilities,
    /// Whether a verified elevated-privilege credential must be present
    #[serde(default)]
    pub requires_escalation: bool,
    /// Admin role names, any of which the principal must hold
    #[serde(default)]
    pub required_admin_roles: HashSet<String>,
}

impl AccessRequirement {
    /// Require a single capability
    pub fn capability(key: CapabilityKey) -> Self {
        Self {
            capabilities: RequiredCapabilities::Single(key),
            requires_escalation: false,
            required_admin_roles: HashSet::new(),
        }
    }

    /// Require any one of a non-empty list of capabilities
    pub fn any_of(keys: Vec<CapabilityKey>) -> Result<Self> {
        if keys.is_empty() {
            return Err(AuthzError::validation(
                "an any-of requirement needs at least one capability",
            ));
        }
        Ok(Self {
            capabilities: RequiredCapabilities::AnyOf(keys),
            requires_escalation: false,
            required_admin_roles: HashSet::new(),
        })
    }

    /// Additionally demand an escalation credential
    pub fn with_escalation(mut self) -> Self {
        self.requires_escalation = true;
        self
    }

    /// Additionally demand one of these admin roles
    pub fn with_admin_roles(mut self, roles: impl IntoIterator<Item = String>) -> Self {
        self.required_admin_roles.extend(roles);
        self
    }
}

/// Why a decision denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    /// Requirement demands escalation and none was presented
    EscalationRequired,
    /// Principal holds none of the required admin roles
    AdminRoleRequired,
    /// Effective capability set does not satisfy the expression
    MissingCapability,
}

/// Outcome of an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the operation is permitted
    pub allowed: bool,
    /// Denial reason, absent when allowed
    pub reason: Option<DenialReason>,
    /// Unmet capability keys. Server-side diagnostics only; never
    /// serialized into a caller-visible response.
    #[serde(skip)]
    missing: Vec<CapabilityKey>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            missing: Vec::new(),
        }
    }

    fn deny(reason: DenialReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            missing: Vec::new(),
        }
    }

    fn deny_missing(missing: Vec<CapabilityKey>) -> Self {
        Self {
            allowed: false,
            reason: Some(DenialReason::MissingCapability),
            missing,
        }
    }

    /// Unmet capability keys, for server-side diagnostics and audit
    pub fn missing_capabilities(&self) -> &[CapabilityKey] {
        &self.missing
    }
}

/// Pure decision function over the capability resolver
#[derive(Clone)]
pub struct DecisionEngine {
    resolver: Arc<CapabilityResolver>,
}

impl DecisionEngine {
    /// Create a decision engine
    pub fn new(resolver: Arc<CapabilityResolver>) -> Self {
        Self { resolver }
    }

    /// Decide whether `principal` may perform an operation guarded by
    /// `requirement` in the given department context.
    ///
    /// `escalation_present` comes from the elevated-credential
    /// collaborator; extraction is the caller's responsibility.
    pub async fn decide(
        &self,
        principal: &Principal,
        requirement: &AccessRequirement,
        department_context: Option<&str>,
        escalation_present: bool,
    ) -> Result<AccessDecision> {
        // Escalation is the coarsest gate and needs no store access
        if requirement.requires_escalation && !escalation_present {
            debug!(user = %principal.user_id, "denied: escalation required");
            return Ok(AccessDecision::deny(DenialReason::EscalationRequired));
        }

        let effective = self.resolver.resolve(principal, department_context).await?;

        if !requirement.required_admin_roles.is_empty()
            && !effective.holds_any_role(&requirement.required_admin_roles)
        {
            debug!(user = %principal.user_id, "denied: admin role required");
            return Ok(AccessDecision::deny(DenialReason::AdminRoleRequired));
        }

        let satisfied = match &requirement.capabilities {
            RequiredCapabilities::Single(key) => effective.contains(key),
            RequiredCapabilities::AnyOf(keys) => effective.contains_any(keys),
        };
        if satisfied {
            return Ok(AccessDecision::allow());
        }

        let missing = match &requirement.capabilities {
            RequiredCapabilities::Single(key) => vec![key.clone()],
            RequiredCapabilities::AnyOf(keys) => keys.clone(),
        };
        debug!(
            user = %principal.user_id,
            missing = ?missing,
            "denied: missing capability"
        );
        Ok(AccessDecision::deny_missing(missing))
    }
}
