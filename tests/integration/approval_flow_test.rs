use fleetrun_core::{
    ApiClient, ApprovalWorkflow, DecisionOutcome, FleetrunError, Role, Selection, ServerConfig,
    Store, TableQuery,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
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

fn approval_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "project_id": 7,
        "run_id": 100 + id,
        "status": status,
        "reason": null,
        "requested_by": 2,
        "decided_by": null,
        "created_at": "2026-08-02T09:00:00Z",
        "decided_at": null
    })
}

async fn mount_lists(server: &MockServer, approvals: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/approvals/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(approvals))
        .mount(server)
        .await;
    for endpoint in [
        "playbooks",
        "runs",
        "playbook-triggers",
        "playbook-templates",
        "playbook-instances",
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/{endpoint}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(server)
            .await;
    }
}

fn select_all(store: &Store) -> Selection {
    let query = TableQuery::default();
    let mut selection = Selection::new();
    let len = store.approvals().len();
    for approval in store.approvals() {
        selection.toggle(approval.id, &query, len);
    }
    selection
}

mod single_decision {
    use super::*;

    #[tokio::test]
    async fn decide_posts_outcome_and_refreshes() {
        let server = MockServer::start().await;
        mount_lists(&server, json!([approval_json(1, "pending")])).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/approvals/1/decision"))
            .and(body_partial_json(
                json!({"status": "approved", "reason": "window open"}),
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server);
        let mut store = Store::new();
        store.refresh_all(&api).await.unwrap();
        let approval = store.approval_by_id(1).unwrap().clone();

        let workflow = ApprovalWorkflow::new(Role::Admin);
        workflow
            .decide(
                &api,
                &mut store,
                &approval,
                DecisionOutcome::Approved,
                Some("window open".to_string()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn already_decided_short_circuits_without_request() {
        let server = MockServer::start().await;
        mount_lists(&server, json!([approval_json(1, "approved")])).await;
        // No decision mock mounted: a request would 404 and fail the test
        // through the returned error type below.

        let api = client_for(&server);
        let mut store = Store::new();
        store.refresh_all(&api).await.unwrap();
        let approval = store.approval_by_id(1).unwrap().clone();

        let workflow = ApprovalWorkflow::new(Role::Admin);
        let err = workflow
            .decide(&api, &mut store, &approval, DecisionOutcome::Rejected, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FleetrunError::Precondition(_)));
    }
}

mod bulk_decision {
    use super::*;

    #[tokio::test]
    async fn partial_failure_attempts_every_item() {
        let server = MockServer::start().await;
        mount_lists(
            &server,
            json!([
                approval_json(1, "pending"),
                approval_json(2, "pending"),
                approval_json(3, "pending"),
            ]),
        )
        .await;

        // Second decision fails server-side; the batch must continue.
        Mock::given(method("POST"))
            .and(path("/api/v1/approvals/1/decision"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/approvals/2/decision"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"detail": "audit log write failed"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/approvals/3/decision"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server);
        let mut store = Store::new();
        store.refresh_all(&api).await.unwrap();
        let mut selection = select_all(&store);

        let workflow = ApprovalWorkflow::new(Role::Admin);
        let outcome = workflow
            .bulk_decide(
                &api,
                &mut store,
                &mut selection,
                DecisionOutcome::Approved,
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.attempted(), 3);
        assert!(selection.is_empty());
        assert_eq!(outcome.notice("approve"), "approve: 1 failed out of 3");
    }

    #[tokio::test]
    async fn non_pending_items_are_silently_skipped() {
        let server = MockServer::start().await;
        mount_lists(
            &server,
            json!([
                approval_json(1, "pending"),
                approval_json(2, "rejected"),
            ]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/approvals/1/decision"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        // Approval 2 must never be posted.
        Mock::given(method("POST"))
            .and(path("/api/v1/approvals/2/decision"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let api = client_for(&server);
        let mut store = Store::new();
        store.refresh_all(&api).await.unwrap();
        let mut selection = select_all(&store);

        let workflow = ApprovalWorkflow::new(Role::Admin);
        let outcome = workflow
            .bulk_decide(
                &api,
                &mut store,
                &mut selection,
                DecisionOutcome::Approved,
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test]
    async fn empty_selection_never_reaches_the_server() {
        let server = MockServer::start().await;
        mount_lists(&server, json!([])).await;

        let api = client_for(&server);
        let mut store = Store::new();
        store.refresh_all(&api).await.unwrap();
        let mut selection = Selection::new();

        let workflow = ApprovalWorkflow::new(Role::Admin);
        let err = workflow
            .bulk_decide(
                &api,
                &mut store,
                &mut selection,
                DecisionOutcome::Rejected,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FleetrunError::Precondition(_)));
    }
}
