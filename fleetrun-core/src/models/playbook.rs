use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FleetrunError, FleetrunResult};

/// How a schedule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Interval,
    Cron,
}

/// Recurring run schedule attached to a playbook. Evaluated server-side;
/// carried here as data only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type")]
    pub schedule_type: ScheduleType,
    /// Interval: seconds. Cron: five-field expression.
    pub value: String,
    #[serde(default)]
    pub host_ids: Vec<i64>,
    #[serde(default)]
    pub group_ids: Vec<i64>,
    #[serde(default)]
    pub extra_vars: serde_json::Map<String, Value>,
    #[serde(default)]
    pub dry_run: bool,
    /// Written by the execution backend, never by this client.
    pub last_run_at: Option<String>,
}

/// A configuration playbook: stored execution script plus variables and an
/// optional schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub stored_content: Option<String>,
    pub repo_path: Option<String>,
    #[serde(default)]
    pub variables: serde_json::Map<String, Value>,
    pub schedule: Option<Schedule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for playbook create/update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybookWriteRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<String>,
    #[serde(default)]
    pub variables: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

/// Webhook token issued for a playbook-scoped trigger URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookToken {
    pub token: String,
    pub url_path: String,
}

/// Validate playbook content as YAML before it is sent anywhere.
///
/// A validation failure blocks the action and is rendered inline; it never
/// reaches the server.
pub fn validate_playbook_content(content: &str) -> FleetrunResult<()> {
    if content.trim().is_empty() {
        return Err(FleetrunError::validation(
            "playbook content",
            "content is empty",
        ));
    }
    serde_yaml::from_str::<serde_yaml::Value>(content)
        .map(|_| ())
        .map_err(|e| FleetrunError::validation("playbook content", e.to_string()))
}

/// Validate a user-supplied extra-vars blob: must parse as a JSON object.
pub fn parse_extra_vars(raw: &str) -> FleetrunResult<serde_json::Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| FleetrunError::validation("extra_vars", e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(FleetrunError::validation(
            "extra_vars",
            format!("expected a JSON object, got {}", value_kind(&other)),
        )),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_playbook_content_accepts_yaml() {
        let content = "---\n- hosts: all\n  tasks:\n    - ping:\n";
        assert!(validate_playbook_content(content).is_ok());
    }

    #[test]
    fn test_validate_playbook_content_rejects_empty_and_broken() {
        assert!(validate_playbook_content("   ").is_err());
        assert!(validate_playbook_content("- hosts: [unclosed").is_err());
    }

    #[test]
    fn test_parse_extra_vars() {
        let vars = parse_extra_vars(r#"{"env": "prod", "retries": 3}"#).unwrap();
        assert_eq!(vars.get("env"), Some(&json!("prod")));

        assert!(parse_extra_vars("").unwrap().is_empty());
        assert!(parse_extra_vars("[1, 2]").is_err());
        assert!(parse_extra_vars("{broken").is_err());
    }

    #[test]
    fn test_schedule_wire_shape() {
        let raw = json!({
            "enabled": true,
            "type": "cron",
            "value": "0 3 * * *",
            "host_ids": [1],
            "group_ids": [],
            "extra_vars": {},
            "dry_run": false,
            "last_run_at": null
        });
        let schedule: Schedule = serde_json::from_value(raw).unwrap();
        assert_eq!(schedule.schedule_type, ScheduleType::Cron);
        assert_eq!(schedule.value, "0 3 * * *");
    }
}
