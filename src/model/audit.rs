//! Audit event emitted on every mutation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Append-only record of a role/membership mutation.
///
/// Emission is best-effort: a sink failure is logged and never rolls back
/// the underlying state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Action name, e.g. `role.assign`
    pub action: String,
    /// Who performed the mutation
    pub actor_id: String,
    /// Entity the mutation targeted
    pub target_id: String,
    /// Snapshot before the mutation, if the entity existed
    pub before: Option<Value>,
    /// Snapshot after the mutation, if the entity survives
    pub after: Option<Value>,
    /// When the mutation happened
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event stamped with the current time
    pub fn new(
        action: impl Into<String>,
        actor_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            actor_id: actor_id.into(),
            target_id: target_id.into(),
            before: None,
            after: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a before snapshot
    pub fn with_before(mut self, before: Value) -> Self {
        self.before = Some(before);
        self
    }

    /// Attach an after snapshot
    pub fn with_after(mut self, after: Value) -> Self {
        self.after = Some(after);
        self
    }
}
