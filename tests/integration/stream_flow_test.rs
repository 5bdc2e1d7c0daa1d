use fleetrun_core::{ApiClient, ServerConfig, StreamManager, StreamState, TailEvent};
use wiremock::matchers::{method, path, query_param};
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

fn sse_response(frames: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(frames.as_bytes().to_vec(), "text/event-stream")
}

async fn mount_stream(server: &MockServer, run_id: i64, frames: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/runs/{run_id}/stream")))
        .and(query_param("token", "test-token"))
        .and(query_param("project_id", "7"))
        .respond_with(sse_response(frames))
        .mount(server)
        .await;
}

#[tokio::test]
async fn tail_accumulates_in_order_and_closes_on_done() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        10,
        "data: line1\\n\n\ndata: line2\\n\n\nevent: done\ndata: success\n\n",
    )
    .await;

    let api = client_for(&server);
    let mut streams = StreamManager::new();
    let stream = streams.open(&api, 10).await.unwrap();
    assert_eq!(stream.state(), StreamState::Streaming);

    let mut done_status = None;
    while let Some(event) = stream.next_event().await.unwrap() {
        if let TailEvent::Done(status) = event {
            done_status = Some(status);
        }
    }

    assert_eq!(stream.log(), "line1\nline2\n");
    assert_eq!(done_status.as_deref(), Some("success"));
    assert_eq!(stream.state(), StreamState::Closed);
}

#[tokio::test]
async fn server_error_event_surfaces_once() {
    let server = MockServer::start().await;
    mount_stream(&server, 10, "data: boot\\n\n\nevent: error\ndata: run not found\n\n").await;

    let api = client_for(&server);
    let mut streams = StreamManager::new();
    let stream = streams.open(&api, 10).await.unwrap();

    assert_eq!(
        stream.next_event().await.unwrap(),
        Some(TailEvent::Appended)
    );
    let err = stream.next_event().await.unwrap_err();
    assert!(err.to_string().contains("run not found"));
    assert_eq!(stream.state(), StreamState::Errored);
    // Terminal: no further events, no retry.
    assert_eq!(stream.next_event().await.unwrap(), None);
}

#[tokio::test]
async fn eof_without_done_closes_cleanly() {
    let server = MockServer::start().await;
    mount_stream(&server, 10, "data: partial output\\n\n\n").await;

    let api = client_for(&server);
    let mut streams = StreamManager::new();
    let stream = streams.open(&api, 10).await.unwrap();

    assert_eq!(
        stream.next_event().await.unwrap(),
        Some(TailEvent::Appended)
    );
    assert_eq!(stream.next_event().await.unwrap(), None);
    assert_eq!(stream.state(), StreamState::Closed);
    assert_eq!(stream.log(), "partial output\n");
}

#[tokio::test]
async fn opening_a_second_stream_replaces_the_first() {
    let server = MockServer::start().await;
    mount_stream(&server, 10, "data: first run\\n\n\n").await;
    mount_stream(&server, 11, "data: second run\\n\n\n").await;

    let api = client_for(&server);
    let mut streams = StreamManager::new();
    streams.open(&api, 10).await.unwrap();
    assert_eq!(streams.active_run(), Some(10));

    streams.open(&api, 11).await.unwrap();
    assert_eq!(streams.active_run(), Some(11));

    let stream = streams.active_mut().unwrap();
    stream.next_event().await.unwrap();
    // Nothing from run 10 bleeds into the replacement's buffer.
    assert_eq!(stream.log(), "second run\n");
}

#[tokio::test]
async fn rejected_connection_is_a_connect_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/runs/10/stream"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let api = client_for(&server);
    let mut streams = StreamManager::new();
    let err = match streams.open(&api, 10).await {
        Ok(_) => panic!("expected the connection to be refused"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("403"));
    assert_eq!(streams.active_run(), None);
}

#[tokio::test]
async fn project_switch_closes_and_clears_the_active_stream() {
    let server = MockServer::start().await;
    mount_stream(&server, 10, "data: scoped log\\n\n\n").await;

    let api = client_for(&server);
    let mut streams = StreamManager::new();
    let stream = streams.open(&api, 10).await.unwrap();
    stream.next_event().await.unwrap();
    assert_eq!(stream.log(), "scoped log\n");

    streams.on_project_changed();
    assert_eq!(streams.active_run(), None);
}
