//! Membership mutation operations

use super::audit;
use super::types::{AssignRoleRequest, AssignedMembership, MembershipUpdate, RemoveRoleRequest};
use crate::model::{
    AuditEvent, DepartmentMembership, GlobalAdminMembership, Principal, UserKind,
};
use crate::registry::{role_names, RegistryHandle};
use crate::storage::{AuditSink, DirectoryStore, OrganizationStore};
use crate::utils::error::{AuthzError, Result};
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;
use uuid::Uuid;

fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Membership mutation handler.
///
/// Mutations are serialized per membership record through keyed async
/// locks; operations on unrelated records proceed concurrently.
pub(super) struct MembershipOperations {
    registry: Arc<RegistryHandle>,
    directory: Arc<dyn DirectoryStore>,
    org: Arc<dyn OrganizationStore>,
    audit: Arc<dyn AuditSink>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MembershipOperations {
    pub(super) fn new(
        registry: Arc<RegistryHandle>,
        directory: Arc<dyn DirectoryStore>,
        org: Arc<dyn OrganizationStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            directory,
            org,
            audit,
            locks: DashMap::new(),
        }
    }

    async fn guard(&self, key: String) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(key).or_default().clone();
        lock.lock_owned().await
    }

    /// Assign a role, creating or reactivating a membership as needed.
    /// Re-assigning an already-held role is a conflict, not a silent
    /// success: explicit re-assignment surfaces caller bugs.
    pub(super) async fn assign_role(
        &self,
        request: &AssignRoleRequest,
    ) -> Result<AssignedMembership> {
        let principal = self
            .directory
            .principal(&request.user_id)
            .await?
            .ok_or_else(|| AuthzError::not_found(format!("user {}", request.user_id)))?;

        let registry = self.registry.load();
        let role = registry
            .role(&request.role_name)
            .cloned()
            .ok_or_else(|| AuthzError::not_found(format!("role {}", request.role_name)))?;

        if role.user_kind != principal.kind {
            return Err(AuthzError::validation(format!(
                "role '{}' targets {} principals, user {} is {}",
                role.name, role.user_kind, principal.user_id, principal.kind
            )));
        }

        info!(
            user = %request.user_id,
            role = %request.role_name,
            actor = %request.assigned_by,
            "assigning role"
        );

        match principal.kind {
            UserKind::GlobalAdmin => self.assign_global(request, &principal).await,
            _ => self.assign_department(request).await,
        }
    }

    async fn assign_department(
        &self,
        request: &AssignRoleRequest,
    ) -> Result<AssignedMembership> {
        let _guard = self
            .guard(format!(
                "dept:{}:{}",
                request.user_id, request.department_id
            ))
            .await;

        if self.org.department(&request.department_id).await?.is_none() {
            return Err(AuthzError::not_found(format!(
                "department {}",
                request.department_id
            )));
        }

        match self
            .org
            .membership_for_department(&request.user_id, &request.department_id)
            .await?
        {
            Some(mut membership) => {
                if membership.is_active && membership.roles.contains(&request.role_name) {
                    return Err(AuthzError::conflict(format!(
                        "user {} already holds role '{}' in department {}",
                        request.user_id, request.role_name, request.department_id
                    )));
                }
                let before = snapshot(&membership);
                let expected = membership.version;
                membership.roles.insert(request.role_name.clone());
                // Inactive memberships are reactivated rather than duplicated
                membership.is_active = true;
                self.org
                    .update_membership(membership.clone(), expected)
                    .await?;
                membership.version = expected + 1;

                audit::emit(
                    &self.audit,
                    AuditEvent::new(
                        "role.assign",
                        &request.assigned_by,
                        &membership.membership_id,
                    )
                    .with_before(before)
                    .with_after(snapshot(&membership)),
                )
                .await;
                Ok(AssignedMembership::Department(membership))
            }
            None => {
                let membership = DepartmentMembership {
                    membership_id: Uuid::new_v4().to_string(),
                    user_id: request.user_id.clone(),
                    department_id: request.department_id.clone(),
                    roles: [request.role_name.clone()].into_iter().collect(),
                    is_primary: false,
                    is_active: true,
                    joined_at: Utc::now(),
                    expires_at: None,
                    version: 0,
                };
                self.org.insert_membership(membership.clone()).await?;

                audit::emit(
                    &self.audit,
                    AuditEvent::new(
                        "role.assign",
                        &request.assigned_by,
                        &membership.membership_id,
                    )
                    .with_after(snapshot(&membership)),
                )
                .await;
                Ok(AssignedMembership::Department(membership))
            }
        }
    }

    async fn assign_global(
        &self,
        request: &AssignRoleRequest,
        principal: &Principal,
    ) -> Result<AssignedMembership> {
        let _guard = self.guard(format!("global:{}", principal.user_id)).await;

        match self
            .org
            .global_membership_for_user(&principal.user_id)
            .await?
        {
            Some(mut membership) => {
                if membership.is_active && membership.roles.contains(&request.role_name) {
                    return Err(AuthzError::conflict(format!(
                        "user {} already holds global role '{}'",
                        request.user_id, request.role_name
                    )));
                }
                let before = snapshot(&membership);
                let expected = membership.version;
                membership.roles.insert(request.role_name.clone());
                membership.is_active = true;
                self.org
                    .update_global_membership(membership.clone(), expected)
                    .await?;
                membership.version = expected + 1;

                audit::emit(
                    &self.audit,
                    AuditEvent::new(
                        "role.assign",
                        &request.assigned_by,
                        &membership.membership_id,
                    )
                    .with_before(before)
                    .with_after(snapshot(&membership)),
                )
                .await;
                Ok(AssignedMembership::Global(membership))
            }
            None => {
                let membership = GlobalAdminMembership {
                    membership_id: Uuid::new_v4().to_string(),
                    user_id: principal.user_id.clone(),
                    roles: [request.role_name.clone()].into_iter().collect(),
                    is_active: true,
                    joined_at: Utc::now(),
                    expires_at: None,
                    version: 0,
                };
                self.org.insert_global_membership(membership.clone()).await?;

                audit::emit(
                    &self.audit,
                    AuditEvent::new(
                        "role.assign",
                        &request.assigned_by,
                        &membership.membership_id,
                    )
                    .with_after(snapshot(&membership)),
                )
                .await;
                Ok(AssignedMembership::Global(membership))
            }
        }
    }

    /// Remove a role. An emptied role set deactivates the membership
    /// rather than deleting it, preserving the audit trail.
    pub(super) async fn remove_role(&self, request: &RemoveRoleRequest) -> Result<()> {
        info!(
            user = %request.user_id,
            role = %request.role_name,
            membership = %request.membership_id,
            actor = %request.removed_by,
            "removing role"
        );

        if let Some(membership) = self.org.global_membership(&request.membership_id).await? {
            return self.remove_global_role(request, membership).await;
        }
        if let Some(membership) = self.org.membership(&request.membership_id).await? {
            return self.remove_department_role(request, membership).await;
        }
        Err(AuthzError::not_found(format!(
            "membership {}",
            request.membership_id
        )))
    }

    async fn remove_global_role(
        &self,
        request: &RemoveRoleRequest,
        stale: GlobalAdminMembership,
    ) -> Result<()> {
        let _guard = self.guard(format!("global:{}", stale.user_id)).await;
        // Re-read under the lock
        let mut membership = self
            .org
            .global_membership(&request.membership_id)
            .await?
            .ok_or_else(|| {
                AuthzError::not_found(format!("membership {}", request.membership_id))
            })?;

        if membership.user_id != request.user_id {
            return Err(AuthzError::not_found(format!(
                "membership {} does not belong to user {}",
                request.membership_id, request.user_id
            )));
        }
        if !membership.roles.contains(&request.role_name) {
            return Err(AuthzError::not_found(format!(
                "role '{}' is not held by membership {}",
                request.role_name, request.membership_id
            )));
        }

        // Never allow the count of live system-admin memberships to reach
        // zero. The count and the commit are serialized on a role-keyed
        // lock: two concurrent removals targeting different memberships
        // must not both observe a count of two. Lock order is always
        // membership key first, role key second.
        let _count_guard = if request.role_name == role_names::SYSTEM_ADMIN {
            let guard = self
                .guard(format!("role:{}", role_names::SYSTEM_ADMIN))
                .await;
            let now = Utc::now();
            if membership.is_live(now) {
                let live = self
                    .org
                    .global_memberships_with_role(role_names::SYSTEM_ADMIN)
                    .await?
                    .into_iter()
                    .filter(|m| m.is_live(now))
                    .count();
                if live <= 1 {
                    return Err(AuthzError::LastAdminProtected(
                        "removing this role would leave no active system admin".to_string(),
                    ));
                }
            }
            Some(guard)
        } else {
            None
        };

        let before = snapshot(&membership);
        let expected = membership.version;
        membership.roles.remove(&request.role_name);
        if membership.roles.is_empty() {
            membership.is_active = false;
        }
        self.org
            .update_global_membership(membership.clone(), expected)
            .await?;
        membership.version = expected + 1;

        audit::emit(
            &self.audit,
            AuditEvent::new("role.remove", &request.removed_by, &membership.membership_id)
                .with_before(before)
                .with_after(snapshot(&membership)),
        )
        .await;
        Ok(())
    }

    async fn remove_department_role(
        &self,
        request: &RemoveRoleRequest,
        stale: DepartmentMembership,
    ) -> Result<()> {
        let _guard = self
            .guard(format!("dept:{}:{}", stale.user_id, stale.department_id))
            .await;
        let mut membership = self
            .org
            .membership(&request.membership_id)
            .await?
            .ok_or_else(|| {
                AuthzError::not_found(format!("membership {}", request.membership_id))
            })?;

        if membership.user_id != request.user_id {
            return Err(AuthzError::not_found(format!(
                "membership {} does not belong to user {}",
                request.membership_id, request.user_id
            )));
        }
        if !membership.roles.contains(&request.role_name) {
            return Err(AuthzError::not_found(format!(
                "role '{}' is not held by membership {}",
                request.role_name, request.membership_id
            )));
        }

        let before = snapshot(&membership);
        let expected = membership.version;
        membership.roles.remove(&request.role_name);
        if membership.roles.is_empty() {
            membership.is_active = false;
        }
        self.org
            .update_membership(membership.clone(), expected)
            .await?;
        membership.version = expected + 1;

        audit::emit(
            &self.audit,
            AuditEvent::new("role.remove", &request.removed_by, &membership.membership_id)
                .with_before(before)
                .with_after(snapshot(&membership)),
        )
        .await;
        Ok(())
    }

    /// Update non-role membership fields. The role set is unchanged, so
    /// role-compatibility checks are not re-run.
    pub(super) async fn update_membership(
        &self,
        membership_id: &str,
        update: &MembershipUpdate,
        actor: &str,
    ) -> Result<DepartmentMembership> {
        let stale = self
            .org
            .membership(membership_id)
            .await?
            .ok_or_else(|| AuthzError::not_found(format!("membership {membership_id}")))?;
        let _guard = self
            .guard(format!("dept:{}:{}", stale.user_id, stale.department_id))
            .await;
        let mut membership = self
            .org
            .membership(membership_id)
            .await?
            .ok_or_else(|| AuthzError::not_found(format!("membership {membership_id}")))?;

        let before = snapshot(&membership);
        let expected = membership.version;

        if let Some(primary) = update.is_primary {
            // At most one membership per user is primary
            if primary && !membership.is_primary {
                self.clear_other_primaries(&membership).await?;
            }
            membership.is_primary = primary;
        }
        if update.clear_expires {
            membership.expires_at = None;
        } else if let Some(expires_at) = update.expires_at {
            membership.expires_at = Some(expires_at);
        }

        self.org
            .update_membership(membership.clone(), expected)
            .await?;
        membership.version = expected + 1;

        audit::emit(
            &self.audit,
            AuditEvent::new("membership.update", actor, &membership.membership_id)
                .with_before(before)
                .with_after(snapshot(&membership)),
        )
        .await;
        Ok(membership)
    }

    async fn clear_other_primaries(&self, membership: &DepartmentMembership) -> Result<()> {
        for mut other in self.org.memberships_for_user(&membership.user_id).await? {
            if other.membership_id != membership.membership_id && other.is_primary {
                let expected = other.version;
                other.is_primary = false;
                self.org.update_membership(other, expected).await?;
            }
        }
        Ok(())
    }
}
