//! Request and result types for role management

use crate::model::{CapabilityKey, DepartmentMembership, GlobalAdminMembership, UserKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Request to assign a role to a user in a department
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRoleRequest {
    /// Target user
    pub user_id: String,
    /// Department the role applies in; ignored for global-admin roles,
    /// which are implicitly scoped to the master department
    pub department_id: String,
    /// Role to assign
    pub role_name: String,
    /// Actor performing the assignment
    pub assigned_by: String,
}

/// Request to remove a role from a membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRoleRequest {
    /// Owning user, must match the membership
    pub user_id: String,
    /// Membership to mutate
    pub membership_id: String,
    /// Role to remove
    pub role_name: String,
    /// Actor performing the removal
    pub removed_by: String,
}

/// Non-role membership fields to update. Role-compatibility checks are
/// not re-run since the role set is unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipUpdate {
    /// Set or clear the primary flag
    pub is_primary: Option<bool>,
    /// Set a new expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Remove the expiry; takes precedence over `expires_at`
    pub clear_expires: bool,
}

/// Request to create a custom role definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    /// Role name, unique across built-ins and customs
    pub name: String,
    /// Role description
    pub description: String,
    /// Principal kind the role may be assigned to
    pub user_kind: UserKind,
    /// Capabilities granted, at least one
    pub capabilities: Vec<CapabilityKey>,
    /// Actor authoring the role
    pub created_by: String,
}

/// The membership an assignment landed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignedMembership {
    /// A staff department membership
    Department(DepartmentMembership),
    /// A global-admin membership
    Global(GlobalAdminMembership),
}

impl AssignedMembership {
    /// The membership id regardless of kind
    pub fn membership_id(&self) -> &str {
        match self {
            Self::Department(m) => &m.membership_id,
            Self::Global(m) => &m.membership_id,
        }
    }
}

/// Per-item outcome of a bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkItemStatus {
    /// Item committed
    Success,
    /// Item failed; the batch continued
    Error,
    /// Item skipped after cooperative cancellation
    Cancelled,
}

/// Result of one bulk item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemResult {
    /// Position in the submitted batch
    pub index: usize,
    /// Outcome
    pub status: BulkItemStatus,
    /// Error detail when status is `error`
    pub detail: Option<String>,
}

impl BulkItemResult {
    pub(super) fn success(index: usize) -> Self {
        Self {
            index,
            status: BulkItemStatus::Success,
            detail: None,
        }
    }

    pub(super) fn error(index: usize, detail: String) -> Self {
        Self {
            index,
            status: BulkItemStatus::Error,
            detail: Some(detail),
        }
    }

    pub(super) fn cancelled(index: usize) -> Self {
        Self {
            index,
            status: BulkItemStatus::Cancelled,
            detail: None,
        }
    }
}

/// Aggregate outcome of a bulk operation. Partial failure is the
/// contract: one item's error never aborts the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    /// Per-item results in submission order
    pub results: Vec<BulkItemResult>,
    /// Count of committed items
    pub succeeded: usize,
    /// Count of failed items
    pub failed: usize,
    /// Count of items skipped by cancellation
    pub cancelled: usize,
}

impl BulkOutcome {
    pub(super) fn from_results(results: Vec<BulkItemResult>) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut cancelled = 0;
        for result in &results {
            match result.status {
                BulkItemStatus::Success => succeeded += 1,
                BulkItemStatus::Error => failed += 1,
                BulkItemStatus::Cancelled => cancelled += 1,
            }
        }
        Self {
            results,
            succeeded,
            failed,
            cancelled,
        }
    }
}

/// Cooperative cancellation flag shared with the request boundary.
///
/// Bulk operations check it between items: already-committed items stay
/// committed, the remainder report `cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
