//! Built-in capability catalogue

use crate::model::CapabilityKey;
use serde::{Deserialize, Serialize};

/// Catalogue entry for a capability key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// The capability key
    pub key: CapabilityKey,
    /// Human-readable description
    pub description: String,
    /// Whether this is a built-in capability
    pub is_built_in: bool,
}

fn builtin(key: &str, description: &str) -> Capability {
    Capability {
        // Built-in keys are well-formed by construction
        key: CapabilityKey::new(key).expect("built-in capability key"),
        description: description.to_string(),
        is_built_in: true,
    }
}

/// The built-in capability catalogue
pub fn builtin_capabilities() -> Vec<Capability> {
    vec![
        // Courses and content
        builtin("course:view", "View course content"),
        builtin("course:edit", "Create and update courses"),
        builtin("course:publish", "Publish courses to learners"),
        builtin("module:view", "View course modules"),
        builtin("module:edit", "Create and update course modules"),
        builtin("question:view", "View assessment questions"),
        builtin("question:edit", "Create and update assessment questions"),
        builtin("template:edit", "Create and update assessment templates"),
        // Enrollment and learners
        builtin("enrollment:view", "View enrollment records"),
        builtin("enrollment:edit", "Create and update enrollments"),
        builtin("learner:view", "View learner records"),
        // Reporting
        builtin("report:view", "View department reports"),
        // Administration
        builtin("role:manage", "Manage role memberships"),
        builtin("department:manage", "Manage department settings"),
        // Full system administration; a literal member, no prefix semantics
        builtin("system:*", "Full system administration access"),
    ]
}
