//! Capability registry
//!
//! Static catalogue of capability keys and role-to-capability mappings.
//! Built-in roles are fixed; custom roles are merged into a fresh
//! immutable snapshot on every mutation and published through an atomic
//! pointer swap, so concurrent readers never observe a partial update.

mod builtin;
mod keys;
mod snapshot;

pub use builtin::builtin_roles;
pub use keys::{builtin_capabilities, Capability};
pub use snapshot::{CapabilityRegistry, RegistryHandle};

/// Built-in role names
pub mod role_names {
    /// Staff: teaches courses, views and edits own course content
    pub const INSTRUCTOR: &str = "instructor";
    /// Staff: authors course, module, question, and template content
    pub const CONTENT_ADMIN: &str = "content-admin";
    /// Staff: administers a department, publishes courses
    pub const DEPT_ADMIN: &str = "dept-admin";
    /// Staff: manages enrollments and learner records
    pub const ENROLLMENT_ADMIN: &str = "enrollment-admin";
    /// Global admin: full system access including `system:*`
    pub const SYSTEM_ADMIN: &str = "system-admin";
    /// Global admin: read-mostly operational support
    pub const SUPPORT_ADMIN: &str = "support-admin";
}
