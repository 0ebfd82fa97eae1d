//! Effective-capability resolution
//!
//! Merges a principal's role memberships into a deduplicated capability
//! set for a department context. Recomputed on every check, never
//! persisted; pure given the store contents.


use crate::config::AuthzConfig;
use crate::hierarchy::HierarchyResolver;
use crate::model::{CapabilityKey, Principal, UserKind};
use crate::registry::RegistryHandle;
use crate::storage::OrganizationStore;
use crate::utils::error::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Materialized union of a principal's capabilities for one check.
///
/// Monotonic in role count: adding a role can only add members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveCapabilitySet {
    capabilities: HashSet<CapabilityKey>,
    roles: HashSet<String>,
}

impl EffectiveCapabilitySet {
    /// Whether the set contains a capability
    pub fn contains(&self, key: &CapabilityKey) -> bool {
        self.capabilities.contains(key)
    }

    /// Whether the set contains any of the given capabilities
    pub fn contains_any(&self, keys: &[CapabilityKey]) -> bool {
        keys.iter().any(|k| self.capabilities.contains(k))
    }

    /// Names of the roles that contributed to this set
    pub fn role_names(&self) -> &HashSet<String> {
        &self.roles
    }

    /// Whether any of the given role names contributed
    pub fn holds_any_role(&self, names: &HashSet<String>) -> bool {
        !self.roles.is_disjoint(names)
    }

    /// Number of distinct capabilities
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Iterate over the capabilities
    pub fn iter(&self) -> impl Iterator<Item = &CapabilityKey> {
        self.capabilities.iter()
    }
}

/// Resolves principals to effective capability sets
#[derive(Clone)]
pub struct CapabilityResolver {
    registry: Arc<RegistryHandle>,
    org: Arc<dyn OrganizationStore>,
    hierarchy: HierarchyResolver,
    learner_baseline: Vec<CapabilityKey>,
}

impl CapabilityResolver {
    /// Create a resolver
    pub fn new(
        registry: Arc<RegistryHandle>,
        org: Arc<dyn OrganizationStore>,
        config: &AuthzConfig,
    ) -> Self {
        let hierarchy = HierarchyResolver::new(Arc::clone(&org), config.max_hierarchy_depth);
        Self {
            registry,
            org,
            hierarchy,
            learner_baseline: config.learner_baseline_keys(),
        }
    }

    /// The hierarchy resolver this resolver scopes with
    pub fn hierarchy(&self) -> &HierarchyResolver {
        &self.hierarchy
    }

    /// Compute the effective capability set for a principal in an optional
    /// department context.
    pub async fn resolve(
        &self,
        principal: &Principal,
        department_context: Option<&str>,
    ) -> Result<EffectiveCapabilitySet> {
        match principal.kind {
            UserKind::GlobalAdmin => self.resolve_global_admin(principal).await,
            UserKind::Learner => Ok(self.learner_baseline()),
            UserKind::Staff => self.resolve_staff(principal, department_context).await,
        }
    }

    /// Global-admin capabilities apply everywhere; department context is
    /// irrelevant.
    async fn resolve_global_admin(&self, principal: &Principal) -> Result<EffectiveCapabilitySet> {
        let mut set = EffectiveCapabilitySet::default();
        let Some(membership) = self
            .org
            .global_membership_for_user(&principal.user_id)
            .await?
        else {
            return Ok(set);
        };
        if !membership.is_live(Utc::now()) {
            return Ok(set);
        }
        let registry = self.registry.load();
        for role_name in &membership.roles {
            match registry.role(role_name) {
                Some(role) => {
                    set.capabilities.extend(role.capabilities.iter().cloned());
                    set.roles.insert(role_name.clone());
                }
                None => {
                    warn!(role = %role_name, user = %principal.user_id,
                        "global membership references unknown role");
                }
            }
        }
        Ok(set)
    }

    /// Learners hold no memberships; they receive the configured baseline.
    fn learner_baseline(&self) -> EffectiveCapabilitySet {
        EffectiveCapabilitySet {
            capabilities: self.learner_baseline.iter().cloned().collect(),
            roles: HashSet::new(),
        }
    }

    /// Union the roles of every live membership whose scoped department
    /// set contains the context; all live memberships when no context is
    /// given.
    async fn resolve_staff(
        &self,
        principal: &Principal,
        department_context: Option<&str>,
    ) -> Result<EffectiveCapabilitySet> {
        let mut set = EffectiveCapabilitySet::default();
        let now = Utc::now();
        let registry = self.registry.load();

        for membership in self.org.memberships_for_user(&principal.user_id).await? {
            if !membership.is_live(now) {
                continue;
            }
            if let Some(context) = department_context {
                let scope = self
                    .hierarchy
                    .scoped_department_set(principal, &membership.department_id)
                    .await?;
                if !scope.contains(context) {
                    continue;
                }
            }
            for role_name in &membership.roles {
                match registry.role(role_name) {
                    Some(role) => {
                        set.capabilities.extend(role.capabilities.iter().cloned());
                        set.roles.insert(role_name.clone());
                    }
                    None => {
                        warn!(role = %role_name, membership = %membership.membership_id,
                            "membership references unknown role");
                    }
                }
            }
        }
        Ok(set)
    }
}
