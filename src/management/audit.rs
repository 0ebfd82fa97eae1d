//! Best-effort audit emission

use crate::model::AuditEvent;
use crate::storage::AuditSink;
use std::sync::Arc;
use tracing::warn;

/// Emit an audit event. Audit is not transactional with the mutation: a
/// sink failure is surfaced in logs and never rolls back state.
pub(super) async fn emit(sink: &Arc<dyn AuditSink>, event: AuditEvent) {
    let action = event.action.clone();
    if let Err(err) = sink.record(event).await {
        warn!(action = %action, error = %err, "failed to record audit event");
    }
}
