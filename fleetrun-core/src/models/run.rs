use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Execution status reported by the backend for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One execution attempt of a playbook against a target set.
///
/// `target_snapshot` is the frozen record of hosts/groups/parameters captured
/// when the run was created. For approval-gated runs it also carries
/// `approval_status`, `params_before` and `params_after`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub project_id: i64,
    pub playbook_id: i64,
    pub triggered_by: String,
    pub status: RunStatus,
    #[serde(default)]
    pub target_snapshot: Value,
    #[serde(default)]
    pub logs: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Run {
    /// The status shown to the user. While the gating approval is still
    /// pending, the run projects as `pending` regardless of its raw
    /// execution status.
    pub fn effective_status(&self) -> RunStatus {
        if self.approval_status() == Some("pending") {
            RunStatus::Pending
        } else {
            self.status
        }
    }

    /// The `approval_status` recorded in the target snapshot, if any.
    pub fn approval_status(&self) -> Option<&str> {
        self.target_snapshot.get("approval_status")?.as_str()
    }

    /// Whether this run is gated by an approval at all.
    pub fn is_gated(&self) -> bool {
        self.approval_status().is_some()
    }

    /// Parameter maps audited by an approval decision: what the playbook
    /// would have run with before the change, and what it will run with.
    pub fn params_before(&self) -> Value {
        self.target_snapshot
            .get("params_before")
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn params_after(&self) -> Value {
        self.target_snapshot
            .get("params_after")
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Resolved host count captured at creation time, when present.
    pub fn resolved_host_count(&self) -> Option<u64> {
        self.target_snapshot.get("host_count")?.as_u64()
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

/// Payload for run submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCreateRequest {
    #[serde(default)]
    pub host_ids: Vec<i64>,
    #[serde(default)]
    pub group_ids: Vec<i64>,
    #[serde(default)]
    pub extra_vars: serde_json::Map<String, Value>,
    #[serde(default)]
    pub dry_run: bool,
}

/// One artifact produced by a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    pub name: String,
    pub size: u64,
    pub mtime: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_with(status: RunStatus, snapshot: Value) -> Run {
        Run {
            id: 1,
            project_id: 1,
            playbook_id: 7,
            triggered_by: "manual:admin".to_string(),
            status,
            target_snapshot: snapshot,
            logs: String::new(),
            started_at: None,
            finished_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RunStatus::Pending.to_string(), "pending");
        assert_eq!(RunStatus::Running.to_string(), "running");
        assert_eq!(RunStatus::Success.to_string(), "success");
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_pending_approval_overrides_execution_status() {
        let run = run_with(RunStatus::Running, json!({"approval_status": "pending"}));
        assert_eq!(run.effective_status(), RunStatus::Pending);
    }

    #[test]
    fn test_decided_approval_passes_execution_status_through() {
        let run = run_with(RunStatus::Success, json!({"approval_status": "approved"}));
        assert_eq!(run.effective_status(), RunStatus::Success);

        let run = run_with(RunStatus::Failed, json!({"approval_status": "rejected"}));
        assert_eq!(run.effective_status(), RunStatus::Failed);
    }

    #[test]
    fn test_ungated_run_uses_raw_status() {
        let run = run_with(RunStatus::Running, json!({"host_ids": [1, 2]}));
        assert!(!run.is_gated());
        assert_eq!(run.effective_status(), RunStatus::Running);
    }

    #[test]
    fn test_snapshot_param_accessors() {
        let run = run_with(
            RunStatus::Pending,
            json!({
                "approval_status": "pending",
                "params_before": {"retries": 1},
                "params_after": {"retries": 5},
                "host_count": 12
            }),
        );
        assert_eq!(run.params_before(), json!({"retries": 1}));
        assert_eq!(run.params_after(), json!({"retries": 5}));
        assert_eq!(run.resolved_host_count(), Some(12));
    }

    #[test]
    fn test_run_deserializes_from_wire_shape() {
        let raw = json!({
            "id": 3,
            "project_id": 1,
            "playbook_id": 9,
            "triggered_by": "schedule",
            "status": "running",
            "target_snapshot": {"host_ids": [4]},
            "logs": "PLAY [all]\n",
            "started_at": "2026-08-01T10:00:00Z",
            "finished_at": null,
            "created_at": "2026-08-01T09:59:00Z"
        });
        let run: Run = serde_json::from_value(raw).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.started_at.is_some());
        assert!(run.duration_seconds().is_none());
    }
}
