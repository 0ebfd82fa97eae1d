//! Role management service
//!
//! CRUD and bulk mutation of role memberships and custom role
//! definitions. Every mutation is validated against the data-model
//! invariants before persistence, serialized per affected record, and
//! followed by a best-effort audit event.

mod audit;
mod bulk;
mod manager;
mod membership_ops;
mod role_ops;
#[cfg(test)]
mod tests;
mod types;

pub use manager::RoleService;
pub use types::{
    AssignRoleRequest, AssignedMembership, BulkItemResult, BulkItemStatus, BulkOutcome,
    CancelFlag, CreateRoleRequest, MembershipUpdate, RemoveRoleRequest,
};
