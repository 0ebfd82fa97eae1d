//! Role management service - main facade

use super::membership_ops::MembershipOperations;
use super::role_ops::RoleOperations;
use super::types::{
    AssignRoleRequest, AssignedMembership, CreateRoleRequest, MembershipUpdate, RemoveRoleRequest,
};
use crate::model::{CapabilityKey, DepartmentMembership, RoleDefinition};
use crate::registry::RegistryHandle;
use crate::resolver::CapabilityResolver;
use crate::storage::{AuditSink, DirectoryStore, OrganizationStore, RoleStore};
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::info;

/// Role management service
pub struct RoleService {
    pub(super) membership_ops: MembershipOperations,
    pub(super) role_ops: RoleOperations,
}

impl RoleService {
    /// Create a new role service
    pub fn new(
        registry: Arc<RegistryHandle>,
        directory: Arc<dyn DirectoryStore>,
        org: Arc<dyn OrganizationStore>,
        roles: Arc<dyn RoleStore>,
        audit: Arc<dyn AuditSink>,
        resolver: Arc<CapabilityResolver>,
    ) -> Self {
        info!("initializing role management service");
        Self {
            membership_ops: MembershipOperations::new(
                Arc::clone(&registry),
                Arc::clone(&directory),
                Arc::clone(&org),
                Arc::clone(&audit),
            ),
            role_ops: RoleOperations::new(registry, directory, org, roles, audit, resolver),
        }
    }

    // Membership operations

    /// Assign a role to a user in a department
    pub async fn assign_role(&self, request: &AssignRoleRequest) -> Result<AssignedMembership> {
        self.membership_ops.assign_role(request).await
    }

    /// Remove a role from a membership
    pub async fn remove_role(&self, request: &RemoveRoleRequest) -> Result<()> {
        self.membership_ops.remove_role(request).await
    }

    /// Update non-role membership fields
    pub async fn update_membership(
        &self,
        membership_id: &str,
        update: &MembershipUpdate,
        actor: &str,
    ) -> Result<DepartmentMembership> {
        self.membership_ops
            .update_membership(membership_id, update, actor)
            .await
    }

    // Custom role operations

    /// Create a custom role definition
    pub async fn create_custom_role(&self, request: CreateRoleRequest) -> Result<RoleDefinition> {
        self.role_ops.create_custom_role(request).await
    }

    /// Replace a custom role's capability set
    pub async fn update_role_access_rights(
        &self,
        name: &str,
        capabilities: Vec<CapabilityKey>,
        actor: &str,
    ) -> Result<RoleDefinition> {
        self.role_ops
            .update_access_rights(name, capabilities, actor)
            .await
    }

    /// Grant one capability to a custom role
    pub async fn add_access_right(
        &self,
        name: &str,
        capability: CapabilityKey,
        actor: &str,
    ) -> Result<RoleDefinition> {
        self.role_ops.add_access_right(name, capability, actor).await
    }

    /// Revoke one capability from a custom role
    pub async fn remove_access_right(
        &self,
        name: &str,
        capability: &CapabilityKey,
        actor: &str,
    ) -> Result<RoleDefinition> {
        self.role_ops
            .remove_access_right(name, capability, actor)
            .await
    }

    /// Delete a custom role, optionally stripping references
    pub async fn delete_custom_role(&self, name: &str, force: bool, actor: &str) -> Result<()> {
        self.role_ops.delete_custom_role(name, force, actor).await
    }
}
