//! In-memory reactive cache of the six orchestration collections.
//!
//! The backend owns every entity; this store is a non-authoritative
//! projection refreshed by one bulk fan-out. A refresh failure leaves the
//! previous cache untouched (stale-but-present beats blank), and overlapping
//! refreshes resolve last-completed-wins: each refresh draws a monotonic
//! generation number and a completion older than the last committed one is
//! discarded.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::api::ApiRead;
use crate::error::FleetrunResult;
use crate::models::{Approval, Instance, Playbook, Run, Template, Trigger};

/// One coherent snapshot of all six collections.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub playbooks: Vec<Playbook>,
    pub runs: Vec<Run>,
    pub approvals: Vec<Approval>,
    pub triggers: Vec<Trigger>,
    pub templates: Vec<Template>,
    pub instances: Vec<Instance>,
}

#[derive(Debug, Default)]
pub struct Store {
    cache: Snapshot,
    /// Generation handed to the most recently started refresh.
    issued: u64,
    /// Generation of the refresh that last committed.
    committed: u64,
    has_data: bool,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch all six collections and commit the result.
    ///
    /// The fan-out is order-independent; a single failure surfaces as one
    /// aggregate error and no collection is partially overwritten.
    pub async fn refresh_all(&mut self, api: &dyn ApiRead) -> FleetrunResult<()> {
        let generation = self.begin_refresh();
        let snapshot = Self::fetch(api).await?;
        self.commit(generation, snapshot);
        Ok(())
    }

    /// Draw a generation number for a refresh that is about to start.
    pub fn begin_refresh(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Run the read fan-out without touching the cache.
    pub async fn fetch(api: &dyn ApiRead) -> FleetrunResult<Snapshot> {
        let (playbooks, runs, approvals, triggers, templates, instances) = tokio::try_join!(
            api.list_playbooks(),
            api.list_runs(),
            api.list_approvals(),
            api.list_triggers(),
            api.list_templates(),
            api.list_instances(),
        )?;
        Ok(Snapshot {
            playbooks,
            runs,
            approvals,
            triggers,
            templates,
            instances,
        })
    }

    /// Commit a completed refresh. Returns false when the completion lost
    /// the race to a newer one and was discarded.
    pub fn commit(&mut self, generation: u64, snapshot: Snapshot) -> bool {
        if generation <= self.committed {
            debug!(generation, committed = self.committed, "discarding stale refresh");
            return false;
        }
        info!(
            generation,
            runs = snapshot.runs.len(),
            approvals = snapshot.approvals.len(),
            "store refreshed"
        );
        self.committed = generation;
        self.cache = snapshot;
        self.has_data = true;
        true
    }

    /// Drop everything. Called on project switch; no partial merge is safe
    /// across that boundary.
    pub fn invalidate(&mut self) {
        self.cache = Snapshot::default();
        self.has_data = false;
        // Generations keep counting so an in-flight refresh started before
        // the switch can never commit over the cleared cache.
        self.committed = self.issued;
    }

    /// Whether at least one refresh has committed since the last invalidate.
    pub fn is_loaded(&self) -> bool {
        self.has_data
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.cache
    }

    pub fn playbooks(&self) -> &[Playbook] {
        &self.cache.playbooks
    }

    pub fn runs(&self) -> &[Run] {
        &self.cache.runs
    }

    pub fn approvals(&self) -> &[Approval] {
        &self.cache.approvals
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.cache.triggers
    }

    pub fn templates(&self) -> &[Template] {
        &self.cache.templates
    }

    pub fn instances(&self) -> &[Instance] {
        &self.cache.instances
    }

    // ------------------------------------------------------------------
    // Derived views: pure projections recomputed from the cache.
    // ------------------------------------------------------------------

    /// Run count per playbook id.
    pub fn runs_by_playbook(&self) -> HashMap<i64, usize> {
        let mut counts = HashMap::new();
        for run in &self.cache.runs {
            *counts.entry(run.playbook_id).or_insert(0) += 1;
        }
        counts
    }

    pub fn playbook_by_id(&self, playbook_id: i64) -> Option<&Playbook> {
        self.cache.playbooks.iter().find(|p| p.id == playbook_id)
    }

    pub fn run_by_id(&self, run_id: i64) -> Option<&Run> {
        self.cache.runs.iter().find(|r| r.id == run_id)
    }

    pub fn approval_by_id(&self, approval_id: i64) -> Option<&Approval> {
        self.cache.approvals.iter().find(|a| a.id == approval_id)
    }

    pub fn trigger_by_id(&self, trigger_id: i64) -> Option<&Trigger> {
        self.cache.triggers.iter().find(|t| t.id == trigger_id)
    }
}
