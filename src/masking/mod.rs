//! Data masking policy
//!
//! Viewer-role-dependent attenuation of PII fields in already-authorized
//! result sets. A presentation concern applied after filtering and
//! pagination; never used to decide whether a record is returned. Every
//! transform here is idempotent.


use crate::config::MaskingConfig;
use crate::registry::role_names;
use crate::resolver::EffectiveCapabilitySet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Closed set of viewer role categories, classified once from a resolved
/// capability set rather than inspected ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerRole {
    /// Sees unmasked data
    SystemAdmin,
    /// Sees unmasked data
    EnrollmentAdmin,
    /// PII is attenuated
    DepartmentAdmin,
    /// PII is attenuated
    Instructor,
    /// No relevant role; PII is attenuated
    Other,
}

impl ViewerRole {
    /// Classify from the role names that contributed to a viewer's
    /// effective set in the subject's department context.
    pub fn classify(roles: &HashSet<String>) -> Self {
        if roles.contains(role_names::SYSTEM_ADMIN) {
            Self::SystemAdmin
        } else if roles.contains(role_names::ENROLLMENT_ADMIN) {
            Self::EnrollmentAdmin
        } else if roles.contains(role_names::DEPT_ADMIN) {
            Self::DepartmentAdmin
        } else if roles.contains(role_names::INSTRUCTOR) {
            Self::Instructor
        } else {
            Self::Other
        }
    }

    /// Classify directly from a resolved effective set
    pub fn from_effective(effective: &EffectiveCapabilitySet) -> Self {
        Self::classify(effective.role_names())
    }

    /// Whether this viewer sees unmasked PII
    pub fn sees_unmasked(&self) -> bool {
        matches!(self, Self::SystemAdmin | Self::EnrollmentAdmin)
    }
}

/// PII-bearing view of a data subject, as handed to serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    /// Subject's user id
    pub user_id: String,
    /// First name, never masked
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Email address
    pub email: Option<String>,
    /// Phone number
    pub phone: Option<String>,
}

/// Applies the masking transforms enabled by configuration
#[derive(Debug, Clone)]
pub struct MaskingPolicy {
    config: MaskingConfig,
}

impl MaskingPolicy {
    /// Create a policy from masking feature flags
    pub fn new(config: MaskingConfig) -> Self {
        Self { config }
    }

    /// Mask a single subject for the given viewer
    pub fn mask(&self, mut subject: SubjectProfile, viewer: ViewerRole) -> SubjectProfile {
        if viewer.sees_unmasked() {
            return subject;
        }
        subject.last_name = mask_last_name(&subject.last_name);
        if self.config.mask_email {
            subject.email = subject.email.map(|e| mask_email(&e));
        }
        if self.config.mask_phone {
            subject.phone = subject.phone.map(|p| mask_phone(&p));
        }
        subject
    }

    /// Mask a collection of subjects; empty input yields empty output
    pub fn mask_many(
        &self,
        subjects: Vec<SubjectProfile>,
        viewer: ViewerRole,
    ) -> Vec<SubjectProfile> {
        subjects
            .into_iter()
            .map(|s| self.mask(s, viewer))
            .collect()
    }
}

/// First character plus `.`; empty stays empty
fn mask_last_name(last_name: &str) -> String {
    match last_name.chars().next() {
        Some(first) => format!("{first}."),
        None => String::new(),
    }
}

/// Keep the domain; mask the local-part interior, preserving first and
/// last character when the local part is longer than two characters.
fn mask_email(email: &str) -> String {
    let Some(at) = email.rfind('@') else {
        return mask_chars(email);
    };
    let (local, domain) = email.split_at(at);
    format!("{}{domain}", mask_chars(local))
}

fn mask_chars(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 2 {
        let interior = "*".repeat(chars.len() - 2);
        format!("{}{interior}{}", chars[0], chars[chars.len() - 1])
    } else {
        "*".repeat(chars.len())
    }
}

/// Mask every digit except the last four; formatting characters survive
fn mask_phone(phone: &str) -> String {
    let digit_count = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let to_mask = digit_count.saturating_sub(4);
    let mut seen = 0;
    phone
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen <= to_mask { '*' } else { c }
            } else {
                c
            }
        })
        .collect()
}
