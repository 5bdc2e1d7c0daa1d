//! HTTP collaborator for the orchestration backend.
//!
//! Every call is scoped by the ambient project id (`X-Project-Id` header)
//! and carries a generated `X-Request-ID` so server-side audit lines can be
//! correlated with client notices. Surfaces that open plain hyperlinks (log
//! stream, artifact download) cannot attach headers, so those URLs carry the
//! token and project id as query parameters instead.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{FleetrunError, FleetrunResult};
use crate::models::{
    Approval, ApprovalDecisionRequest, DecisionOutcome, Instance, Playbook, PlaybookWriteRequest,
    Run, RunArtifact, RunCreateRequest, Template, Trigger, TriggerWriteRequest, WebhookToken,
};

const API_PREFIX: &str = "/api/v1";

/// Read side of the collaborator, split out so the store can be driven by an
/// in-process fake in tests.
#[async_trait]
pub trait ApiRead: Send + Sync {
    async fn list_playbooks(&self) -> FleetrunResult<Vec<Playbook>>;
    async fn list_runs(&self) -> FleetrunResult<Vec<Run>>;
    async fn list_approvals(&self) -> FleetrunResult<Vec<Approval>>;
    async fn list_triggers(&self) -> FleetrunResult<Vec<Trigger>>;
    async fn list_templates(&self) -> FleetrunResult<Vec<Template>>;
    async fn list_instances(&self) -> FleetrunResult<Vec<Instance>>;
}

/// Decision side of the collaborator, split out for the approval workflow.
#[async_trait]
pub trait ApiDecide: Send + Sync {
    async fn decide_approval(
        &self,
        approval_id: i64,
        outcome: DecisionOutcome,
        reason: Option<String>,
    ) -> FleetrunResult<()>;
}

/// Trigger mutation side, used by the bulk trigger workflows.
#[async_trait]
pub trait ApiTriggerWrite: Send + Sync {
    async fn set_trigger_enabled(&self, trigger: &Trigger, enabled: bool) -> FleetrunResult<()>;
    async fn delete_trigger(&self, trigger_id: i64) -> FleetrunResult<()>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
    project_id: Option<i64>,
}

impl ApiClient {
    pub fn new(config: &ServerConfig) -> FleetrunResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FleetrunError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            project_id: config.project_id,
        })
    }

    /// Switch the ambient project. Callers are responsible for invalidating
    /// caches and closing streams first (see the store and stream manager).
    pub fn with_project(&self, project_id: Option<i64>) -> Self {
        Self {
            project_id,
            ..self.clone()
        }
    }

    pub fn project_id(&self) -> Option<i64> {
        self.project_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn decorate(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder
            .bearer_auth(&self.token)
            .header("X-Request-ID", Uuid::new_v4().to_string());
        if let Some(project_id) = self.project_id {
            builder = builder.header("X-Project-Id", project_id.to_string());
        }
        builder
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FleetrunResult<T> {
        let response = self.decorate(self.client.get(self.url(path))).send().await?;
        Self::parse(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> FleetrunResult<T> {
        let response = self
            .decorate(self.client.post(self.url(path)).json(body))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> FleetrunResult<()> {
        let response = self
            .decorate(self.client.post(self.url(path)).json(body))
            .send()
            .await?;
        Self::expect_success(response).await
    }

    async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> FleetrunResult<T> {
        let response = self
            .decorate(self.client.put(self.url(path)).json(body))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn delete(&self, path: &str) -> FleetrunResult<()> {
        let response = self
            .decorate(self.client.delete(self.url(path)))
            .send()
            .await?;
        Self::expect_success(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> FleetrunResult<T> {
        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| FleetrunError::MalformedResponse(e.to_string()))
    }

    async fn expect_success(response: Response) -> FleetrunResult<()> {
        Self::check_status(response).await.map(|_| ())
    }

    /// Turn a non-2xx response into an application error: the message comes
    /// from a structured `{detail}` body when present, else the raw body
    /// text; the server-echoed request id rides along when supplied.
    async fn check_status(response: Response) -> FleetrunResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let correlation_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body.clone()
                }
            });
        warn!(status = status.as_u16(), %message, "server rejected request");
        if status == StatusCode::NOT_FOUND {
            return Err(FleetrunError::NotFound(message));
        }
        Err(FleetrunError::Api {
            status: status.as_u16(),
            message,
            correlation_id,
        })
    }

    // ------------------------------------------------------------------
    // Reads beyond the bulk fan-out
    // ------------------------------------------------------------------

    /// Full run record including accumulated log text, the non-streaming
    /// fallback for log viewing.
    pub async fn get_run(&self, run_id: i64) -> FleetrunResult<Run> {
        self.get_json(&format!("/runs/{run_id}")).await
    }

    pub async fn get_playbook(&self, playbook_id: i64) -> FleetrunResult<Playbook> {
        self.get_json(&format!("/playbooks/{playbook_id}")).await
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub async fn submit_run(
        &self,
        playbook_id: i64,
        request: &RunCreateRequest,
    ) -> FleetrunResult<Run> {
        debug!(playbook_id, dry_run = request.dry_run, "submitting run");
        self.post_json(&format!("/playbooks/{playbook_id}/run"), request)
            .await
    }

    pub async fn create_playbook(&self, request: &PlaybookWriteRequest) -> FleetrunResult<Playbook> {
        self.post_json("/playbooks/", request).await
    }

    pub async fn update_playbook(
        &self,
        playbook_id: i64,
        request: &PlaybookWriteRequest,
    ) -> FleetrunResult<Playbook> {
        self.put_json(&format!("/playbooks/{playbook_id}"), request)
            .await
    }

    pub async fn delete_playbook(&self, playbook_id: i64) -> FleetrunResult<()> {
        self.delete(&format!("/playbooks/{playbook_id}")).await
    }

    pub async fn create_trigger(&self, request: &TriggerWriteRequest) -> FleetrunResult<Trigger> {
        self.post_json("/playbook-triggers/", request).await
    }

    pub async fn update_trigger(
        &self,
        trigger_id: i64,
        request: &TriggerWriteRequest,
    ) -> FleetrunResult<Trigger> {
        self.put_json(&format!("/playbook-triggers/{trigger_id}"), request)
            .await
    }

    // ------------------------------------------------------------------
    // Webhook tokens and artifacts
    // ------------------------------------------------------------------

    pub async fn get_webhook_token(&self, playbook_id: i64) -> FleetrunResult<WebhookToken> {
        self.get_json(&format!("/playbooks/{playbook_id}/webhook-token"))
            .await
    }

    pub async fn rotate_webhook_token(&self, playbook_id: i64) -> FleetrunResult<WebhookToken> {
        self.post_json(
            &format!("/playbooks/{playbook_id}/webhook-token"),
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn list_artifacts(&self, run_id: i64) -> FleetrunResult<Vec<RunArtifact>> {
        self.get_json(&format!("/runs/{run_id}/artifacts")).await
    }

    /// Download URL for an artifact, opened as a plain hyperlink. Custom
    /// headers are impossible there, so auth travels in the query string.
    pub fn artifact_url(&self, run_id: i64, name: &str) -> String {
        self.query_authed_url(&format!("/runs/{run_id}/artifacts/{name}"))
    }

    /// Streaming endpoint URL for a run, same header-less constraint as
    /// artifact downloads.
    pub fn stream_url(&self, run_id: i64) -> String {
        self.query_authed_url(&format!("/runs/{run_id}/stream"))
    }

    fn query_authed_url(&self, path: &str) -> String {
        let mut url = format!("{}?token={}", self.url(path), urlencode(&self.token));
        if let Some(project_id) = self.project_id {
            url.push_str(&format!("&project_id={project_id}"));
        }
        url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }
}

/// Percent-encode the characters that matter inside a query value.
fn urlencode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

#[async_trait]
impl ApiRead for ApiClient {
    async fn list_playbooks(&self) -> FleetrunResult<Vec<Playbook>> {
        self.get_json("/playbooks/").await
    }

    async fn list_runs(&self) -> FleetrunResult<Vec<Run>> {
        self.get_json("/runs/").await
    }

    async fn list_approvals(&self) -> FleetrunResult<Vec<Approval>> {
        self.get_json("/approvals/").await
    }

    async fn list_triggers(&self) -> FleetrunResult<Vec<Trigger>> {
        self.get_json("/playbook-triggers/").await
    }

    async fn list_templates(&self) -> FleetrunResult<Vec<Template>> {
        self.get_json("/playbook-templates/").await
    }

    async fn list_instances(&self) -> FleetrunResult<Vec<Instance>> {
        self.get_json("/playbook-instances/").await
    }
}

#[async_trait]
impl ApiDecide for ApiClient {
    async fn decide_approval(
        &self,
        approval_id: i64,
        outcome: DecisionOutcome,
        reason: Option<String>,
    ) -> FleetrunResult<()> {
        let request = ApprovalDecisionRequest {
            status: outcome,
            reason,
        };
        self.post_no_content(&format!("/approvals/{approval_id}/decision"), &request)
            .await
    }
}

#[async_trait]
impl ApiTriggerWrite for ApiClient {
    async fn set_trigger_enabled(&self, trigger: &Trigger, enabled: bool) -> FleetrunResult<()> {
        let request = TriggerWriteRequest {
            playbook_id: trigger.playbook_id,
            event: trigger.event,
            enabled,
            filters: trigger.filters.clone(),
            extra_vars: trigger.extra_vars.clone(),
        };
        self.update_trigger(trigger.id, &request).await.map(|_| ())
    }

    async fn delete_trigger(&self, trigger_id: i64) -> FleetrunResult<()> {
        self.delete(&format!("/playbook-triggers/{trigger_id}"))
            .await
    }
}
