//! Core entity types

use super::capability::CapabilityKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Sentinel department id that scopes all global-admin memberships
pub const MASTER_DEPARTMENT: &str = "master";

/// Kind of an authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserKind {
    /// Department staff (instructors, administrators)
    Staff,
    /// Enrolled learner
    Learner,
    /// Organization-wide administrator
    GlobalAdmin,
}

impl fmt::Display for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKind::Staff => f.write_str("staff"),
            UserKind::Learner => f.write_str("learner"),
            UserKind::GlobalAdmin => f.write_str("global-admin"),
        }
    }
}

/// An already-authenticated principal. Immutable per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique user identifier
    pub user_id: String,
    /// Principal kind
    pub kind: UserKind,
}

impl Principal {
    /// Create a principal
    pub fn new(user_id: impl Into<String>, kind: UserKind) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
        }
    }
}

/// A node in the department forest. Owned by the organization store;
/// the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// Unique department identifier
    pub id: String,
    /// Parent department, `None` for a root/top-level department
    pub parent_id: Option<String>,
}

impl Department {
    /// Create a department
    pub fn new(id: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            parent_id,
        }
    }

    /// Whether this is a root/top-level department
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A staff principal's association with a department and the roles held
/// there. Mutated only through the role management service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentMembership {
    /// Unique membership identifier
    pub membership_id: String,
    /// Owning user
    pub user_id: String,
    /// Department this membership belongs to
    pub department_id: String,
    /// Roles held in the department. A true set: no duplicate entries.
    pub roles: HashSet<String>,
    /// At most one membership per user is marked primary
    pub is_primary: bool,
    /// Soft-delete flag; deactivated memberships are kept for audit
    pub is_active: bool,
    /// When the user joined the department
    pub joined_at: DateTime<Utc>,
    /// Optional expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version
    pub version: u64,
}

impl DepartmentMembership {
    /// Whether the membership is active and unexpired at `now`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// A global-admin principal's organization-wide role membership, always
/// scoped to the sentinel master department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAdminMembership {
    /// Unique membership identifier
    pub membership_id: String,
    /// Owning user
    pub user_id: String,
    /// Global-admin roles held
    pub roles: HashSet<String>,
    /// Soft-delete flag
    pub is_active: bool,
    /// When the membership was granted
    pub joined_at: DateTime<Utc>,
    /// Optional expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version
    pub version: u64,
}

impl GlobalAdminMembership {
    /// Whether the membership is active and unexpired at `now`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// A named, reusable bundle of capabilities assignable to principals of a
/// matching kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name
    pub name: String,
    /// Role description
    pub description: String,
    /// Which principal kind this role may be assigned to
    pub user_kind: UserKind,
    /// Capabilities granted by this role
    pub capabilities: HashSet<CapabilityKey>,
    /// Built-in roles are immutable and cannot be deleted
    pub is_built_in: bool,
}
