//! Built-in role definitions

use super::keys::builtin_capabilities;
use super::role_names;
use crate::model::{CapabilityKey, RoleDefinition, UserKind};
use std::collections::HashSet;

fn caps(keys: &[&str]) -> HashSet<CapabilityKey> {
    keys.iter()
        .map(|k| CapabilityKey::new(*k).expect("built-in capability key"))
        .collect()
}

/// The immutable built-in roles
pub fn builtin_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition {
            name: role_names::INSTRUCTOR.to_string(),
            description: "Teaches courses and views enrolled learners".to_string(),
            user_kind: UserKind::Staff,
            capabilities: caps(&[
                "course:view",
                "module:view",
                "question:view",
                "question:edit",
                "learner:view",
                "report:view",
            ]),
            is_built_in: true,
        },
        RoleDefinition {
            name: role_names::CONTENT_ADMIN.to_string(),
            description: "Authors course, module, question, and template content".to_string(),
            user_kind: UserKind::Staff,
            capabilities: caps(&[
                "course:view",
                "course:edit",
                "module:view",
                "module:edit",
                "question:view",
                "question:edit",
                "template:edit",
            ]),
            is_built_in: true,
        },
        RoleDefinition {
            name: role_names::DEPT_ADMIN.to_string(),
            description: "Administers a department and publishes courses".to_string(),
            user_kind: UserKind::Staff,
            capabilities: caps(&[
                "course:view",
                "course:edit",
                "course:publish",
                "module:view",
                "enrollment:view",
                "learner:view",
                "report:view",
                "role:manage",
                "department:manage",
            ]),
            is_built_in: true,
        },
        RoleDefinition {
            name: role_names::ENROLLMENT_ADMIN.to_string(),
            description: "Manages enrollments and learner records".to_string(),
            user_kind: UserKind::Staff,
            capabilities: caps(&[
                "course:view",
                "enrollment:view",
                "enrollment:edit",
                "learner:view",
                "report:view",
            ]),
            is_built_in: true,
        },
        // system-admin holds every built-in capability, including the
        // literal system:* key
        RoleDefinition {
            name: role_names::SYSTEM_ADMIN.to_string(),
            description: "Full system administration access".to_string(),
            user_kind: UserKind::GlobalAdmin,
            capabilities: builtin_capabilities().into_iter().map(|c| c.key).collect(),
            is_built_in: true,
        },
        RoleDefinition {
            name: role_names::SUPPORT_ADMIN.to_string(),
            description: "Read-mostly operational support across departments".to_string(),
            user_kind: UserKind::GlobalAdmin,
            capabilities: caps(&[
                "course:view",
                "module:view",
                "question:view",
                "enrollment:view",
                "learner:view",
                "report:view",
            ]),
            is_built_in: true,
        },
    ]
}
