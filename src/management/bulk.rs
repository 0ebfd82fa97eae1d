//! Bulk role mutation

use super::manager::RoleService;
use super::types::{
    AssignRoleRequest, BulkItemResult, BulkOutcome, CancelFlag, RemoveRoleRequest,
};
use tracing::info;

impl RoleService {
    /// Assign roles in bulk. Items are processed independently: one
    /// item's failure never aborts the batch. After cancellation,
    /// already-committed items stay committed and the remainder report
    /// `cancelled`.
    pub async fn bulk_assign_roles(
        &self,
        items: Vec<AssignRoleRequest>,
        cancel: &CancelFlag,
    ) -> BulkOutcome {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                results.push(BulkItemResult::cancelled(index));
                continue;
            }
            match self.membership_ops.assign_role(item).await {
                Ok(_) => results.push(BulkItemResult::success(index)),
                Err(err) => results.push(BulkItemResult::error(index, err.to_string())),
            }
        }
        let outcome = BulkOutcome::from_results(results);
        info!(
            total = items.len(),
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            cancelled = outcome.cancelled,
            "bulk role assignment finished"
        );
        outcome
    }

    /// Remove roles in bulk, with the same partial-failure contract as
    /// `bulk_assign_roles`.
    pub async fn bulk_remove_roles(
        &self,
        items: Vec<RemoveRoleRequest>,
        cancel: &CancelFlag,
    ) -> BulkOutcome {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                results.push(BulkItemResult::cancelled(index));
                continue;
            }
            match self.membership_ops.remove_role(item).await {
                Ok(()) => results.push(BulkItemResult::success(index)),
                Err(err) => results.push(BulkItemResult::error(index, err.to_string())),
            }
        }
        let outcome = BulkOutcome::from_results(results);
        info!(
            total = items.len(),
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            cancelled = outcome.cancelled,
            "bulk role removal finished"
        );
        outcome
    }
}
