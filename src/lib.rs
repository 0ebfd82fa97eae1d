//! # campus-authz
//!
//! Authorization and access-control engine for a learning platform:
//! capability-based permissions, department-scoped roles, and
//! viewer-dependent masking of personal data.
//!
//! ## Features
//!
//! - **Capability Registry**: Built-in and custom roles mapped to
//!   `domain:action` capability keys, published as a lock-free snapshot
//! - **Department Hierarchy**: Role scoping over a forest of departments,
//!   with top-level memberships covering every descendant
//! - **Capability Resolution**: Effective capability sets per principal
//!   kind (staff, learner, global admin) and department context
//! - **Access Decisions**: Single or any-of capability requirements with
//!   escalation and admin-role gates, evaluated in a fixed order
//! - **Data Masking**: Idempotent last-name, email, and phone masking
//!   keyed to the viewer's role
//! - **Role Management**: Audited CRUD over memberships and custom roles,
//!   with last-admin protection and cancellable bulk operations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use campus_authz::{
//!     AccessRequirement, AuthzConfig, CapabilityKey, CapabilityResolver, DecisionEngine,
//!     MemoryStore, Principal, RegistryHandle, UserKind,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let registry = Arc::new(RegistryHandle::default());
//!     let config = AuthzConfig::default();
//!     let resolver = Arc::new(CapabilityResolver::new(
//!         Arc::clone(&registry),
//!         store.clone(),
//!         &config,
//!     ));
//!     let engine = DecisionEngine::new(resolver);
//!
//!     let learner = Principal::new("user-1", UserKind::Learner);
//!     let requirement = AccessRequirement::capability(CapabilityKey::new("course:view")?);
//!     let decision = engine.decide(&learner, &requirement, None, false).await?;
//!
//!     println!("allowed: {}", decision.allowed);
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod decision;
pub mod hierarchy;
pub mod management;
pub mod masking;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::{AuthzConfig, MaskingConfig};
pub use utils::error::{AuthzError, Result};

pub use model::{
    AuditEvent, CapabilityKey, Department, DepartmentMembership, GlobalAdminMembership,
    Principal, RoleDefinition, UserKind, MASTER_DEPARTMENT,
};

pub use decision::{
    AccessDecision, AccessRequirement, DecisionEngine, DenialReason, RequiredCapabilities,
};
pub use hierarchy::HierarchyResolver;
pub use masking::{MaskingPolicy, SubjectProfile, ViewerRole};
pub use registry::{role_names, Capability, CapabilityRegistry, RegistryHandle};
pub use resolver::{CapabilityResolver, EffectiveCapabilitySet};

pub use management::{
    AssignRoleRequest, AssignedMembership, BulkItemResult, BulkItemStatus, BulkOutcome,
    CancelFlag, CreateRoleRequest, MembershipUpdate, RemoveRoleRequest, RoleService,
};
pub use storage::{AuditSink, DirectoryStore, MemoryStore, OrganizationStore, RoleStore};
