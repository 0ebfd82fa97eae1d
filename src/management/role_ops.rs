//! Custom role definition operations

use super::audit;
use super::types::CreateRoleRequest;
use crate::model::{AuditEvent, CapabilityKey, RoleDefinition};
use crate::registry::RegistryHandle;
use crate::resolver::CapabilityResolver;
use crate::storage::{AuditSink, DirectoryStore, OrganizationStore, RoleStore};
use crate::utils::error::{AuthzError, Result};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Custom role CRUD handler.
///
/// Built-in roles are immutable: every mutation path checks the registry
/// first. Successful mutations republish the registry snapshot.
pub(super) struct RoleOperations {
    registry: Arc<RegistryHandle>,
    directory: Arc<dyn DirectoryStore>,
    org: Arc<dyn OrganizationStore>,
    roles: Arc<dyn RoleStore>,
    audit: Arc<dyn AuditSink>,
    resolver: Arc<CapabilityResolver>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RoleOperations {
    pub(super) fn new(
        registry: Arc<RegistryHandle>,
        directory: Arc<dyn DirectoryStore>,
        org: Arc<dyn OrganizationStore>,
        roles: Arc<dyn RoleStore>,
        audit: Arc<dyn AuditSink>,
        resolver: Arc<CapabilityResolver>,
    ) -> Self {
        Self {
            registry,
            directory,
            org,
            roles,
            audit,
            resolver,
            locks: DashMap::new(),
        }
    }

    async fn guard(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(name.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    async fn refresh_registry(&self) -> Result<()> {
        let custom = self.roles.list_custom_roles().await?;
        self.registry.rebuild(custom);
        Ok(())
    }

    /// Granting `system:*` through a role requires already holding it;
    /// otherwise role authoring becomes a privilege-escalation path.
    async fn check_wildcard_grant(&self, capabilities: &[CapabilityKey], actor: &str) -> Result<()> {
        if !capabilities.iter().any(CapabilityKey::is_system_wildcard) {
            return Ok(());
        }
        let creator = self
            .directory
            .principal(actor)
            .await?
            .ok_or_else(|| AuthzError::not_found(format!("user {actor}")))?;
        let effective = self.resolver.resolve(&creator, None).await?;
        if !effective.contains(&CapabilityKey::system_wildcard()) {
            return Err(AuthzError::forbidden(
                "granting system:* requires holding system:*",
            ));
        }
        Ok(())
    }

    fn reject_builtin(&self, name: &str) -> Result<()> {
        if let Some(role) = self.registry.load().role(name) {
            if role.is_built_in {
                return Err(AuthzError::ImmutableRole(format!(
                    "built-in role '{name}' cannot be modified"
                )));
            }
        }
        Ok(())
    }

    pub(super) async fn create_custom_role(
        &self,
        request: CreateRoleRequest,
    ) -> Result<RoleDefinition> {
        let _guard = self.guard(&request.name).await;

        if request.capabilities.is_empty() {
            return Err(AuthzError::validation(
                "a role needs at least one capability",
            ));
        }
        if self.registry.load().contains_role(&request.name)
            || self.roles.custom_role(&request.name).await?.is_some()
        {
            return Err(AuthzError::conflict(format!(
                "role '{}' already exists",
                request.name
            )));
        }
        self.check_wildcard_grant(&request.capabilities, &request.created_by)
            .await?;

        let role = RoleDefinition {
            name: request.name,
            description: request.description,
            user_kind: request.user_kind,
            capabilities: request.capabilities.into_iter().collect(),
            is_built_in: false,
        };
        self.roles.upsert_custom_role(role.clone()).await?;
        self.refresh_registry().await?;
        info!(role = %role.name, actor = %request.created_by, "created custom role");

        audit::emit(
            &self.audit,
            AuditEvent::new("role.create", &request.created_by, &role.name)
                .with_after(snapshot(&role)),
        )
        .await;
        Ok(role)
    }

    /// Replace a custom role's capability set wholesale
    pub(super) async fn update_access_rights(
        &self,
        name: &str,
        capabilities: Vec<CapabilityKey>,
        actor: &str,
    ) -> Result<RoleDefinition> {
        let _guard = self.guard(name).await;
        self.reject_builtin(name)?;

        if capabilities.is_empty() {
            return Err(AuthzError::validation(
                "a role needs at least one capability",
            ));
        }
        let mut role = self
            .roles
            .custom_role(name)
            .await?
            .ok_or_else(|| AuthzError::not_found(format!("custom role {name}")))?;
        self.check_wildcard_grant(&capabilities, actor).await?;

        let before = snapshot(&role);
        role.capabilities = capabilities.into_iter().collect();
        self.roles.upsert_custom_role(role.clone()).await?;
        self.refresh_registry().await?;

        audit::emit(
            &self.audit,
            AuditEvent::new("role.update", actor, name)
                .with_before(before)
                .with_after(snapshot(&role)),
        )
        .await;
        Ok(role)
    }

    /// Grant one capability to a custom role. Granting an already-held
    /// capability is a no-op.
    pub(super) async fn add_access_right(
        &self,
        name: &str,
        capability: CapabilityKey,
        actor: &str,
    ) -> Result<RoleDefinition> {
        let _guard = self.guard(name).await;
        self.reject_builtin(name)?;

        let mut role = self
            .roles
            .custom_role(name)
            .await?
            .ok_or_else(|| AuthzError::not_found(format!("custom role {name}")))?;
        if role.capabilities.contains(&capability) {
            return Ok(role);
        }
        self.check_wildcard_grant(std::slice::from_ref(&capability), actor)
            .await?;

        let before = snapshot(&role);
        role.capabilities.insert(capability);
        self.roles.upsert_custom_role(role.clone()).await?;
        self.refresh_registry().await?;

        audit::emit(
            &self.audit,
            AuditEvent::new("role.grant", actor, name)
                .with_before(before)
                .with_after(snapshot(&role)),
        )
        .await;
        Ok(role)
    }

    /// Revoke one capability from a custom role
    pub(super) async fn remove_access_right(
        &self,
        name: &str,
        capability: &CapabilityKey,
        actor: &str,
    ) -> Result<RoleDefinition> {
        let _guard = self.guard(name).await;
        self.reject_builtin(name)?;

        let mut role = self
            .roles
            .custom_role(name)
            .await?
            .ok_or_else(|| AuthzError::not_found(format!("custom role {name}")))?;
        if !role.capabilities.contains(capability) {
            return Err(AuthzError::not_found(format!(
                "role '{name}' does not hold capability '{capability}'"
            )));
        }
        if role.capabilities.len() == 1 {
            return Err(AuthzError::validation(
                "a role must keep at least one capability",
            ));
        }

        let before = snapshot(&role);
        role.capabilities.remove(capability);
        self.roles.upsert_custom_role(role.clone()).await?;
        self.refresh_registry().await?;

        audit::emit(
            &self.audit,
            AuditEvent::new("role.revoke", actor, name)
                .with_before(before)
                .with_after(snapshot(&role)),
        )
        .await;
        Ok(role)
    }

    /// Delete a custom role. Without `force`, live references block the
    /// deletion; with `force`, the role is stripped from every referencing
    /// membership as a destructive, audited action.
    pub(super) async fn delete_custom_role(
        &self,
        name: &str,
        force: bool,
        actor: &str,
    ) -> Result<()> {
        let _guard = self.guard(name).await;
        self.reject_builtin(name)?;

        let role = self
            .roles
            .custom_role(name)
            .await?
            .ok_or_else(|| AuthzError::not_found(format!("custom role {name}")))?;

        let dept_refs = self.org.memberships_with_role(name).await?;
        let global_refs = self.org.global_memberships_with_role(name).await?;
        let referenced = dept_refs.iter().any(|m| m.is_active)
            || global_refs.iter().any(|m| m.is_active);

        if referenced && !force {
            return Err(AuthzError::RoleInUse(format!(
                "role '{name}' is referenced by active memberships"
            )));
        }

        if force {
            for mut membership in dept_refs {
                let before = snapshot(&membership);
                let expected = membership.version;
                membership.roles.remove(name);
                if membership.roles.is_empty() {
                    membership.is_active = false;
                }
                self.org
                    .update_membership(membership.clone(), expected)
                    .await?;
                audit::emit(
                    &self.audit,
                    AuditEvent::new("role.strip", actor, &membership.membership_id)
                        .with_before(before)
                        .with_after(snapshot(&membership)),
                )
                .await;
            }
            for mut membership in global_refs {
                let before = snapshot(&membership);
                let expected = membership.version;
                membership.roles.remove(name);
                if membership.roles.is_empty() {
                    membership.is_active = false;
                }
                self.org
                    .update_global_membership(membership.clone(), expected)
                    .await?;
                audit::emit(
                    &self.audit,
                    AuditEvent::new("role.strip", actor, &membership.membership_id)
                        .with_before(before)
                        .with_after(snapshot(&membership)),
                )
                .await;
            }
        }

        self.roles.delete_custom_role(name).await?;
        self.refresh_registry().await?;
        info!(role = %name, actor = %actor, force, "deleted custom role");

        audit::emit(
            &self.audit,
            AuditEvent::new("role.delete", actor, name).with_before(snapshot(&role)),
        )
        .await;
        Ok(())
    }
}
