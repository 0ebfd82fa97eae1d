//! Registry snapshot and atomic swap handle

use super::builtin::builtin_roles;
use super::keys::{builtin_capabilities, Capability};
use crate::model::{CapabilityKey, RoleDefinition};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable snapshot of all role definitions and the capability catalogue
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    roles: HashMap<String, RoleDefinition>,
    capabilities: HashMap<CapabilityKey, Capability>,
}

impl CapabilityRegistry {
    /// Build a snapshot from the built-in definitions only
    pub fn built_in() -> Self {
        Self::with_custom_roles(Vec::new())
    }

    /// Build a snapshot from built-ins plus persisted custom definitions.
    /// A custom role shadowing a built-in name is dropped with a warning;
    /// built-ins always win.
    pub fn with_custom_roles(custom: Vec<RoleDefinition>) -> Self {
        let mut roles: HashMap<String, RoleDefinition> = builtin_roles()
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();

        for role in custom {
            if let Some(existing) = roles.get(&role.name) {
                if existing.is_built_in {
                    warn!(role = %role.name, "custom role shadows a built-in name, skipping");
                    continue;
                }
            }
            roles.insert(role.name.clone(), role);
        }

        let capabilities = builtin_capabilities()
            .into_iter()
            .map(|c| (c.key.clone(), c))
            .collect();

        debug!(roles = roles.len(), "built capability registry snapshot");
        Self {
            roles,
            capabilities,
        }
    }

    /// Get a role definition by name
    pub fn role(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.get(name)
    }

    /// Whether a role with this name exists (built-in or custom)
    pub fn contains_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Get a catalogue entry by key
    pub fn capability(&self, key: &CapabilityKey) -> Option<&Capability> {
        self.capabilities.get(key)
    }

    /// List all role definitions
    pub fn list_roles(&self) -> Vec<&RoleDefinition> {
        self.roles.values().collect()
    }

    /// List the capability catalogue
    pub fn list_capabilities(&self) -> Vec<&Capability> {
        self.capabilities.values().collect()
    }
}

/// Shared handle over the current registry snapshot.
///
/// Readers call `load` on every check; writers publish a whole new
/// snapshot after custom-role mutations. The snapshot itself is never
/// mutated in place.
#[derive(Debug)]
pub struct RegistryHandle {
    inner: ArcSwap<CapabilityRegistry>,
}

impl RegistryHandle {
    /// Create a handle over an initial snapshot
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            inner: ArcSwap::from_pointee(registry),
        }
    }

    /// The current snapshot
    pub fn load(&self) -> Arc<CapabilityRegistry> {
        self.inner.load_full()
    }

    /// Replace the snapshot with built-ins plus the given custom roles
    pub fn rebuild(&self, custom_roles: Vec<RoleDefinition>) {
        let next = CapabilityRegistry::with_custom_roles(custom_roles);
        self.inner.store(Arc::new(next));
    }
}

impl Default for RegistryHandle {
    fn default() -> Self {
        Self::new(CapabilityRegistry::built_in())
    }
}
