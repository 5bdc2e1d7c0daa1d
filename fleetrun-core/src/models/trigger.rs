use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FleetrunError, FleetrunResult};

/// Backend event a trigger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    HostCreated,
    HostTagsChanged,
    SecretRotated,
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEvent::HostCreated => write!(f, "host_created"),
            TriggerEvent::HostTagsChanged => write!(f, "host_tags_changed"),
            TriggerEvent::SecretRotated => write!(f, "secret_rotated"),
        }
    }
}

/// A rule that auto-starts a playbook run in response to a backend event.
/// Evaluation happens server-side; this client only manages the rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: i64,
    pub project_id: i64,
    pub playbook_id: i64,
    #[serde(rename = "type")]
    pub event: TriggerEvent,
    pub enabled: bool,
    #[serde(default)]
    pub filters: serde_json::Map<String, Value>,
    #[serde(default)]
    pub extra_vars: serde_json::Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for trigger create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerWriteRequest {
    pub playbook_id: i64,
    #[serde(rename = "type")]
    pub event: TriggerEvent,
    pub enabled: bool,
    #[serde(default)]
    pub filters: serde_json::Map<String, Value>,
    #[serde(default)]
    pub extra_vars: serde_json::Map<String, Value>,
}

/// Top-level filter keys accepted per event type. Anything outside the
/// whitelist is rejected before submission.
fn allowed_filter_keys(event: TriggerEvent) -> &'static [&'static str] {
    match event {
        TriggerEvent::HostCreated => &["tags", "group_ids"],
        TriggerEvent::HostTagsChanged => &["tags", "added_tags", "removed_tags"],
        TriggerEvent::SecretRotated => &["secret_names"],
    }
}

/// Validate a trigger filter map against the event-specific key whitelist.
pub fn validate_trigger_filters(
    event: TriggerEvent,
    filters: &serde_json::Map<String, Value>,
) -> FleetrunResult<()> {
    let allowed = allowed_filter_keys(event);
    for key in filters.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(FleetrunError::validation(
                "trigger filters",
                format!("unknown key '{}' for event {}", key, event),
            ));
        }
    }
    Ok(())
}
