//! In-memory reference store

use super::traits::{AuditSink, DirectoryStore, OrganizationStore, RoleStore};
use crate::model::{
    AuditEvent, Department, DepartmentMembership, GlobalAdminMembership, Principal, RoleDefinition,
};
use crate::utils::error::{AuthzError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

/// In-memory store backing the test suite and in-process embedders.
///
/// All maps are keyed by entity id; membership updates enforce the same
/// compare-and-swap contract a database-backed store would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    principals: DashMap<String, Principal>,
    departments: DashMap<String, Department>,
    memberships: DashMap<String, DepartmentMembership>,
    global_memberships: DashMap<String, GlobalAdminMembership>,
    custom_roles: DashMap<String, RoleDefinition>,
    audit_log: Mutex<Vec<AuditEvent>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a principal
    pub fn add_principal(&self, principal: Principal) {
        self.principals.insert(principal.user_id.clone(), principal);
    }

    /// Seed a department
    pub fn add_department(&self, department: Department) {
        self.departments.insert(department.id.clone(), department);
    }

    /// Seed a department membership
    pub fn add_membership(&self, membership: DepartmentMembership) {
        self.memberships
            .insert(membership.membership_id.clone(), membership);
    }

    /// Seed a global-admin membership
    pub fn add_global_membership(&self, membership: GlobalAdminMembership) {
        self.global_memberships
            .insert(membership.membership_id.clone(), membership);
    }

    /// Recorded audit events, oldest first
    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit_log.lock().clone()
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn principal(&self, user_id: &str) -> Result<Option<Principal>> {
        Ok(self.principals.get(user_id).map(|p| p.clone()))
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn department(&self, id: &str) -> Result<Option<Department>> {
        Ok(self.departments.get(id).map(|d| d.clone()))
    }

    async fn children_of(&self, id: &str) -> Result<Vec<Department>> {
        Ok(self
            .departments
            .iter()
            .filter(|d| d.parent_id.as_deref() == Some(id))
            .map(|d| d.clone())
            .collect())
    }

    async fn membership(&self, membership_id: &str) -> Result<Option<DepartmentMembership>> {
        Ok(self.memberships.get(membership_id).map(|m| m.clone()))
    }

    async fn memberships_for_user(&self, user_id: &str) -> Result<Vec<DepartmentMembership>> {
        Ok(self
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.clone())
            .collect())
    }

    async fn membership_for_department(
        &self,
        user_id: &str,
        department_id: &str,
    ) -> Result<Option<DepartmentMembership>> {
        Ok(self
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.department_id == department_id)
            .map(|m| m.clone()))
    }

    async fn memberships_with_role(&self, role_name: &str) -> Result<Vec<DepartmentMembership>> {
        Ok(self
            .memberships
            .iter()
            .filter(|m| m.roles.contains(role_name))
            .map(|m| m.clone())
            .collect())
    }

    async fn insert_membership(&self, membership: DepartmentMembership) -> Result<()> {
        if self.memberships.contains_key(&membership.membership_id) {
            return Err(AuthzError::conflict(format!(
                "membership {} already exists",
                membership.membership_id
            )));
        }
        self.memberships
            .insert(membership.membership_id.clone(), membership);
        Ok(())
    }

    async fn update_membership(
        &self,
        mut membership: DepartmentMembership,
        expected_version: u64,
    ) -> Result<()> {
        let mut entry = self
            .memberships
            .get_mut(&membership.membership_id)
            .ok_or_else(|| {
                AuthzError::not_found(format!("membership {}", membership.membership_id))
            })?;
        if entry.version != expected_version {
            return Err(AuthzError::conflict(format!(
                "membership {} was modified concurrently",
                membership.membership_id
            )));
        }
        membership.version = expected_version + 1;
        *entry = membership;
        Ok(())
    }

    async fn global_membership(
        &self,
        membership_id: &str,
    ) -> Result<Option<GlobalAdminMembership>> {
        Ok(self
            .global_memberships
            .get(membership_id)
            .map(|m| m.clone()))
    }

    async fn global_membership_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<GlobalAdminMembership>> {
        Ok(self
            .global_memberships
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.clone()))
    }

    async fn global_memberships_with_role(
        &self,
        role_name: &str,
    ) -> Result<Vec<GlobalAdminMembership>> {
        Ok(self
            .global_memberships
            .iter()
            .filter(|m| m.roles.contains(role_name))
            .map(|m| m.clone())
            .collect())
    }

    async fn insert_global_membership(&self, membership: GlobalAdminMembership) -> Result<()> {
        if self
            .global_memberships
            .contains_key(&membership.membership_id)
        {
            return Err(AuthzError::conflict(format!(
                "global membership {} already exists",
                membership.membership_id
            )));
        }
        self.global_memberships
            .insert(membership.membership_id.clone(), membership);
        Ok(())
    }

    async fn update_global_membership(
        &self,
        mut membership: GlobalAdminMembership,
        expected_version: u64,
    ) -> Result<()> {
        let mut entry = self
            .global_memberships
            .get_mut(&membership.membership_id)
            .ok_or_else(|| {
                AuthzError::not_found(format!("global membership {}", membership.membership_id))
            })?;
        if entry.version != expected_version {
            return Err(AuthzError::conflict(format!(
                "global membership {} was modified concurrently",
                membership.membership_id
            )));
        }
        membership.version = expected_version + 1;
        *entry = membership;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn custom_role(&self, name: &str) -> Result<Option<RoleDefinition>> {
        Ok(self.custom_roles.get(name).map(|r| r.clone()))
    }

    async fn list_custom_roles(&self) -> Result<Vec<RoleDefinition>> {
        Ok(self.custom_roles.iter().map(|r| r.clone()).collect())
    }

    async fn upsert_custom_role(&self, role: RoleDefinition) -> Result<()> {
        self.custom_roles.insert(role.name.clone(), role);
        Ok(())
    }

    async fn delete_custom_role(&self, name: &str) -> Result<()> {
        self.custom_roles.remove(name);
        Ok(())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, event: AuditEvent) -> Result<()> {
        self.audit_log.lock().push(event);
        Ok(())
    }
}
