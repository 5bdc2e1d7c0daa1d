//! Approval decisions and bulk trigger mutations.
//!
//! Bulk operations are deliberately sequential: this bounds backend
//! concurrency and keeps the audit log ordering deterministic. A mid-batch
//! failure is recorded and the batch continues; the caller gets exactly one
//! aggregate outcome, never one notice per item.

use tracing::{info, warn};

use crate::api::{ApiDecide, ApiRead, ApiTriggerWrite};
use crate::error::{FleetrunError, FleetrunResult};
use crate::models::{Approval, ApprovalStatus, DecisionOutcome, Trigger};
use crate::store::Store;
use crate::view::Selection;

/// Role of the acting operator. Decisions require `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

/// Aggregate result of a best-effort batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// Items dropped before any request (not pending); not counted as
    /// failures.
    pub skipped: usize,
}

impl BatchOutcome {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    /// One aggregate notice line, distinguishing full success from partial
    /// failure.
    pub fn notice(&self, verb: &str) -> String {
        if self.failed == 0 {
            format!("{verb}: all {} succeeded", self.succeeded)
        } else {
            format!(
                "{verb}: {} failed out of {}",
                self.failed,
                self.attempted()
            )
        }
    }
}

pub struct ApprovalWorkflow {
    role: Role,
}

impl ApprovalWorkflow {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    fn require_admin(&self) -> FleetrunResult<()> {
        if self.role != Role::Admin {
            return Err(FleetrunError::precondition(
                "deciding approvals requires the admin role",
            ));
        }
        Ok(())
    }

    /// Decide a single approval, then refresh the store so effective run
    /// statuses are re-derived.
    ///
    /// Preconditions (pending status, admin role) are checked client-side;
    /// a violation is a warning no-op and no request is issued.
    pub async fn decide<A>(
        &self,
        api: &A,
        store: &mut Store,
        approval: &Approval,
        outcome: DecisionOutcome,
        reason: Option<String>,
    ) -> FleetrunResult<()>
    where
        A: ApiDecide + ApiRead,
    {
        self.require_admin()?;
        if approval.status != ApprovalStatus::Pending {
            warn!(
                approval_id = approval.id,
                status = %approval.status,
                "approval already decided, skipping"
            );
            return Err(FleetrunError::precondition(format!(
                "approval {} is already {}",
                approval.id, approval.status
            )));
        }

        api.decide_approval(approval.id, outcome, reason).await?;
        info!(approval_id = approval.id, %outcome, "approval decided");
        store.refresh_all(api).await
    }

    /// Decide every pending approval in the selection, sequentially and
    /// best-effort. Non-pending selections are silently skipped; a failure
    /// on one item never blocks the rest. The selection is cleared after
    /// the batch regardless of outcome.
    pub async fn bulk_decide<A>(
        &self,
        api: &A,
        store: &mut Store,
        selection: &mut Selection,
        outcome: DecisionOutcome,
        reason: Option<String>,
    ) -> FleetrunResult<BatchOutcome>
    where
        A: ApiDecide + ApiRead,
    {
        self.require_admin()?;
        if selection.is_empty() {
            return Err(FleetrunError::precondition("no approvals selected"));
        }

        let targets: Vec<Approval> = selection
            .ids()
            .iter()
            .filter_map(|id| store.approval_by_id(*id).cloned())
            .collect();
        let mut result = BatchOutcome::default();

        for approval in &targets {
            if approval.status != ApprovalStatus::Pending {
                result.skipped += 1;
                continue;
            }
            match api
                .decide_approval(approval.id, outcome, reason.clone())
                .await
            {
                Ok(()) => result.succeeded += 1,
                Err(e) => {
                    warn!(approval_id = approval.id, error = %e, "bulk decision item failed");
                    result.failed += 1;
                }
            }
        }

        selection.clear();
        self.refresh_after_batch(api, store).await;
        Ok(result)
    }

    /// Enable or disable every selected trigger, same best-effort batch
    /// pattern as bulk decisions.
    pub async fn bulk_set_triggers_enabled<A>(
        &self,
        api: &A,
        store: &mut Store,
        selection: &mut Selection,
        enabled: bool,
    ) -> FleetrunResult<BatchOutcome>
    where
        A: ApiTriggerWrite + ApiRead,
    {
        if selection.is_empty() {
            return Err(FleetrunError::precondition("no triggers selected"));
        }

        let targets: Vec<Trigger> = selection
            .ids()
            .iter()
            .filter_map(|id| store.trigger_by_id(*id).cloned())
            .collect();
        let mut result = BatchOutcome::default();

        for trigger in &targets {
            if trigger.enabled == enabled {
                result.skipped += 1;
                continue;
            }
            match api.set_trigger_enabled(trigger, enabled).await {
                Ok(()) => result.succeeded += 1,
                Err(e) => {
                    warn!(trigger_id = trigger.id, error = %e, "bulk trigger update failed");
                    result.failed += 1;
                }
            }
        }

        selection.clear();
        self.refresh_after_batch(api, store).await;
        Ok(result)
    }

    /// Delete every selected trigger, best-effort.
    pub async fn bulk_delete_triggers<A>(
        &self,
        api: &A,
        store: &mut Store,
        selection: &mut Selection,
    ) -> FleetrunResult<BatchOutcome>
    where
        A: ApiTriggerWrite + ApiRead,
    {
        if selection.is_empty() {
            return Err(FleetrunError::precondition("no triggers selected"));
        }

        let ids = selection.ids();
        let mut result = BatchOutcome::default();

        for id in ids {
            if store.trigger_by_id(id).is_none() {
                result.skipped += 1;
                continue;
            }
            match api.delete_trigger(id).await {
                Ok(()) => result.succeeded += 1,
                Err(e) => {
                    warn!(trigger_id = id, error = %e, "bulk trigger delete failed");
                    result.failed += 1;
                }
            }
        }

        selection.clear();
        self.refresh_after_batch(api, store).await;
        Ok(result)
    }

    /// Batch outcomes stand on their own; a failed refresh afterwards is
    /// logged, not surfaced, and the stale cache stays intact.
    async fn refresh_after_batch<A: ApiRead>(&self, api: &A, store: &mut Store) {
        if let Err(e) = store.refresh_all(api).await {
            warn!(error = %e, "refresh after batch failed, cache left as-is");
        }
    }
}
