use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reusable variable schema with defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub vars_schema: serde_json::Map<String, Value>,
    #[serde(default)]
    pub vars_defaults: serde_json::Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A named binding of a template to concrete values and explicit targets,
/// runnable against a chosen playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub template_id: i64,
    pub description: Option<String>,
    #[serde(default)]
    pub values: serde_json::Map<String, Value>,
    #[serde(default)]
    pub host_ids: Vec<i64>,
    #[serde(default)]
    pub group_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Instance {
    /// Effective variables for a run: template defaults with the instance's
    /// explicit values layered on top.
    pub fn effective_vars(&self, template: &Template) -> serde_json::Map<String, Value> {
        let mut merged = template.vars_defaults.clone();
        for (key, value) in &self.values {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}
