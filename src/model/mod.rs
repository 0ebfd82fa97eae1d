//! Domain model for the authorization engine
//!
//! Entities here are read and written through the storage traits; the
//! engine itself never persists anything directly.

mod audit;
mod capability;
mod entities;

pub use audit::AuditEvent;
pub use capability::CapabilityKey;
pub use entities::{
    Department, DepartmentMembership, GlobalAdminMembership, Principal, RoleDefinition, UserKind,
    MASTER_DEPARTMENT,
};
