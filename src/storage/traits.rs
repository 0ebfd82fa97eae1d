//! Store traits consumed by the engine

use crate::model::{
    AuditEvent, Department, DepartmentMembership, GlobalAdminMembership, Principal, RoleDefinition,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Identity directory: supplies authenticated principals by id
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Look up a principal
    async fn principal(&self, user_id: &str) -> Result<Option<Principal>>;
}

/// Organization structure store: departments and role memberships.
///
/// Membership writes use compare-and-swap on the record's `version`;
/// a mismatch yields `Conflict` and the caller retries or surfaces it.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Look up a department
    async fn department(&self, id: &str) -> Result<Option<Department>>;

    /// Direct children of a department
    async fn children_of(&self, id: &str) -> Result<Vec<Department>>;

    /// Look up a department membership by id
    async fn membership(&self, membership_id: &str) -> Result<Option<DepartmentMembership>>;

    /// All department memberships of a user, active or not
    async fn memberships_for_user(&self, user_id: &str) -> Result<Vec<DepartmentMembership>>;

    /// A user's membership in a specific department, if any
    async fn membership_for_department(
        &self,
        user_id: &str,
        department_id: &str,
    ) -> Result<Option<DepartmentMembership>>;

    /// Department memberships that reference a role
    async fn memberships_with_role(&self, role_name: &str) -> Result<Vec<DepartmentMembership>>;

    /// Insert a new department membership; `Conflict` if the id exists
    async fn insert_membership(&self, membership: DepartmentMembership) -> Result<()>;

    /// Replace a department membership if its stored version matches
    /// `expected_version`; the stored version is bumped on success
    async fn update_membership(
        &self,
        membership: DepartmentMembership,
        expected_version: u64,
    ) -> Result<()>;

    /// Look up a global-admin membership by id
    async fn global_membership(
        &self,
        membership_id: &str,
    ) -> Result<Option<GlobalAdminMembership>>;

    /// A user's global-admin membership, if any
    async fn global_membership_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<GlobalAdminMembership>>;

    /// Global-admin memberships that reference a role
    async fn global_memberships_with_role(
        &self,
        role_name: &str,
    ) -> Result<Vec<GlobalAdminMembership>>;

    /// Insert a new global-admin membership; `Conflict` if the id exists
    async fn insert_global_membership(&self, membership: GlobalAdminMembership) -> Result<()>;

    /// Replace a global-admin membership under compare-and-swap
    async fn update_global_membership(
        &self,
        membership: GlobalAdminMembership,
        expected_version: u64,
    ) -> Result<()>;
}

/// Persisted custom role definitions
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Look up a custom role definition
    async fn custom_role(&self, name: &str) -> Result<Option<RoleDefinition>>;

    /// All custom role definitions
    async fn list_custom_roles(&self) -> Result<Vec<RoleDefinition>>;

    /// Insert or replace a custom role definition
    async fn upsert_custom_role(&self, role: RoleDefinition) -> Result<()>;

    /// Delete a custom role definition
    async fn delete_custom_role(&self, name: &str) -> Result<()>;
}

/// Append-only audit event sink. The engine writes, never reads.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append an event
    async fn record(&self, event: AuditEvent) -> Result<()>;
}
