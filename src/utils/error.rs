//! Error handling for the authorization engine
//!
//! This module defines all error types used throughout the engine. Callers
//! branch on error kind, not just presence, so invariant violations carry
//! their own variants instead of being folded into a generic forbidden.

use thiserror::Error;

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Main error type for the authorization engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Unknown user, department, role, or membership
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input (empty capability list, bad key shape, kind mismatch)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate role assignment, duplicate role-definition name, or a
    /// stale optimistic-concurrency version
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Capability, admin-role, or escalation checks failed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Removal would leave the system without an active system admin.
    /// A non-overridable forbidden subtype.
    #[error("Last admin protected: {0}")]
    LastAdminProtected(String),

    /// Mutation attempt on a built-in role definition
    #[error("Immutable role: {0}")]
    ImmutableRole(String),

    /// Role deletion blocked by live membership references
    #[error("Role in use: {0}")]
    RoleInUse(String),

    /// Persistence-layer failure, distinct from policy errors so callers
    /// can distinguish "denied" from "couldn't evaluate"
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthzError {
    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether this error is any of the forbidden kinds
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            Self::Forbidden(_) | Self::LastAdminProtected(_) | Self::ImmutableRole(_)
        )
    }

    /// Whether this error came from the persistence layer rather than policy
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
