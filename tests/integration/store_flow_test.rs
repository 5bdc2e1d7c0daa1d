use fleetrun_core::{ApiClient, RunStatus, ServerConfig, Store};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&ServerConfig {
        base_url: server.uri(),
        token: "test-token".to_string(),
        project_id: Some(7),
        request_timeout_secs: 5,
    })
    .unwrap()
}

fn empty_list(endpoint: &str) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{endpoint}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
}

fn sample_playbooks() -> serde_json::Value {
    json!([{
        "id": 1,
        "project_id": 7,
        "name": "provision-web",
        "description": null,
        "stored_content": "---\n- hosts: all\n",
        "repo_path": null,
        "variables": {},
        "schedule": null,
        "created_at": "2026-08-01T00:00:00Z",
        "updated_at": null
    }])
}

fn sample_runs() -> serde_json::Value {
    json!([
        {
            "id": 10,
            "project_id": 7,
            "playbook_id": 1,
            "triggered_by": "manual:ops",
            "status": "running",
            "target_snapshot": {"approval_status": "pending", "host_count": 3},
            "logs": "",
            "started_at": null,
            "finished_at": null,
            "created_at": "2026-08-02T09:00:00Z"
        },
        {
            "id": 11,
            "project_id": 7,
            "playbook_id": 1,
            "triggered_by": "schedule",
            "status": "success",
            "target_snapshot": {"host_ids": [4]},
            "logs": "ok\n",
            "started_at": "2026-08-02T10:00:00Z",
            "finished_at": "2026-08-02T10:01:00Z",
            "created_at": "2026-08-02T09:59:00Z"
        }
    ])
}

mod refresh {
    use super::*;

    #[tokio::test]
    async fn fans_out_and_commits_all_collections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/playbooks/"))
            .and(header("X-Project-Id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_playbooks()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/runs/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_runs()))
            .mount(&server)
            .await;
        for endpoint in [
            "approvals",
            "playbook-triggers",
            "playbook-templates",
            "playbook-instances",
        ] {
            empty_list(endpoint).mount(&server).await;
        }

        let api = client_for(&server);
        let mut store = Store::new();
        store.refresh_all(&api).await.unwrap();

        assert!(store.is_loaded());
        assert_eq!(store.playbooks().len(), 1);
        assert_eq!(store.runs().len(), 2);
        assert_eq!(store.runs_by_playbook().get(&1), Some(&2));
        assert_eq!(store.playbook_by_id(1).unwrap().name, "provision-web");
    }

    #[tokio::test]
    async fn effective_status_projects_pending_gate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/runs/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_runs()))
            .mount(&server)
            .await;
        for endpoint in [
            "playbooks",
            "approvals",
            "playbook-triggers",
            "playbook-templates",
            "playbook-instances",
        ] {
            empty_list(endpoint).mount(&server).await;
        }

        let api = client_for(&server);
        let mut store = Store::new();
        store.refresh_all(&api).await.unwrap();

        let gated = store.run_by_id(10).unwrap();
        assert_eq!(gated.status, RunStatus::Running);
        assert_eq!(gated.effective_status(), RunStatus::Pending);

        let plain = store.run_by_id(11).unwrap();
        assert_eq!(plain.effective_status(), RunStatus::Success);
    }

    #[tokio::test]
    async fn single_failure_leaves_previous_cache_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/runs/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_runs()))
            .mount(&server)
            .await;
        for endpoint in [
            "playbooks",
            "playbook-triggers",
            "playbook-templates",
            "playbook-instances",
        ] {
            empty_list(endpoint).mount(&server).await;
        }

        // First refresh succeeds.
        let ok = Mock::given(method("GET"))
            .and(path("/api/v1/approvals/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .up_to_n_times(1)
            .mount_as_scoped(&server)
            .await;

        let api = client_for(&server);
        let mut store = Store::new();
        store.refresh_all(&api).await.unwrap();
        assert_eq!(store.runs().len(), 2);
        drop(ok);

        // Second refresh hits a 500 on one endpoint of the fan-out.
        Mock::given(method("GET"))
            .and(path("/api/v1/approvals/"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"detail": "db unavailable"})),
            )
            .mount(&server)
            .await;

        let err = store.refresh_all(&api).await.unwrap_err();
        assert!(err.to_string().contains("db unavailable"));
        // Stale-but-present beats blank.
        assert_eq!(store.runs().len(), 2);
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn application_error_extracts_detail_and_correlation_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/runs/99"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"detail": "no project access"}))
                    .insert_header("x-request-id", "req-abc"),
            )
            .mount(&server)
            .await;

        let api = client_for(&server);
        let err = api.get_run(99).await.unwrap_err();
        assert_eq!(err.correlation_id(), Some("req-abc"));
        assert!(err.to_string().contains("no project access"));
    }
}
