use std::sync::Arc;
use std::time::Duration;

use alertwire::error::{RelayError, TransportError};
use alertwire::events::{Event, EventKind, Source, decode_event, encode_frame};
use alertwire::observability::NoopObserver;
use alertwire::relay::{HttpUpstream, Upstream};
use alertwire::task::{Submission, TaskRegistry, TaskState};
use alertwire::transport::SseClient;
use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SseClient {
    SseClient::new(&server.uri(), Duration::from_secs(2)).expect("client should build")
}

fn started(id: u64) -> Event {
    Event::new(
        id,
        "t-1",
        Source::ReasoningLoop,
        EventKind::AnalysisStarted {
            agent: "scripted".into(),
            max_iterations: 10,
        },
        false,
    )
}

fn failed(id: u64) -> Event {
    Event::new(
        id,
        "t-1",
        Source::CapabilityInvoker,
        EventKind::Error {
            message: "feed offline".into(),
            capability: Some("fail".into()),
            stage: "capability".into(),
        },
        true,
    )
}

fn sse_body(events: &[Event]) -> String {
    events.iter().map(|event| encode_frame(event, 3000)).collect()
}

fn snapshot_body() -> serde_json::Value {
    json!({
        "task_id": "t-1",
        "state": "working",
        "created_at": "2026-01-01T00:00:00Z",
        "event_log": []
    })
}

fn upstream(server: &MockServer, registry: &Arc<TaskRegistry>) -> HttpUpstream {
    HttpUpstream::new(
        client(server),
        Arc::clone(registry),
        Arc::new(NoopObserver),
        "coordinator",
        Source::Coordinator,
    )
}

async fn wait_terminal(registry: &TaskRegistry, task_id: &str) -> TaskState {
    let mut head = registry.watch(task_id).expect("task should be registered");
    loop {
        let state = registry.get_state(task_id).unwrap();
        if state.is_terminal() {
            return state;
        }
        tokio::time::timeout(Duration::from_secs(5), head.changed())
            .await
            .expect("pump should finish")
            .unwrap();
    }
}

#[tokio::test]
async fn submit_posts_the_submission_and_reads_the_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(body_json(json!({"alert": {"alert_id": "A-1"}, "agent": "specialist"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "t-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let task_id = client(&server)
        .submit(&Submission {
            alert: json!({"alert_id": "A-1"}),
            agent: Some("specialist".into()),
        })
        .await
        .unwrap();
    assert_eq!(task_id, "t-1");
}

#[tokio::test]
async fn status_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "unknown"})))
        .mount(&server)
        .await;

    let error = client(&server).status("missing").await.unwrap_err();
    assert!(matches!(error, TransportError::NotFound(id) if id == "missing"));
}

#[tokio::test]
async fn open_events_sends_last_event_id_and_parses_frames() {
    let server = MockServer::start().await;
    let terminal = failed(2);
    Mock::given(method("GET"))
        .and(path("/tasks/t-1/events"))
        .and(header("last-event-id", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(std::slice::from_ref(&terminal))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let frames: Vec<_> = client(&server)
        .open_events("t-1", 1)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(frames.len(), 1);
    let frame = frames.into_iter().next().unwrap().unwrap();
    assert_eq!(frame.retry, Some(3000));
    assert_eq!(decode_event(&frame).unwrap(), terminal);
}

#[tokio::test]
async fn upstream_400_is_an_invalid_submission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "unknown agent x"})))
        .mount(&server)
        .await;

    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
    let error = upstream(&server, &registry)
        .submit(Submission {
            alert: json!({}),
            agent: Some("x".into()),
        })
        .await
        .unwrap_err();
    assert!(matches!(error, RelayError::InvalidSubmission(_)));
    assert_eq!(registry.task_count(), 0);
}

#[tokio::test]
async fn ensure_adopts_a_task_found_upstream_and_mirrors_its_log() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .mount(&server)
        .await;
    let (first, last) = (started(1), failed(2));
    let keep_alive = Event::keep_alive("t-1", Source::Worker);
    Mock::given(method("GET"))
        .and(path("/tasks/t-1/events"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&[
                    first.clone(),
                    keep_alive,
                    first.clone(),
                    last.clone(),
                ])),
        )
        .mount(&server)
        .await;

    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
    let relay = upstream(&server, &registry);
    relay.ensure("t-1").await.unwrap();
    // A second probe finds it locally.
    relay.ensure("t-1").await.unwrap();

    assert_eq!(wait_terminal(&registry, "t-1").await, TaskState::Failed);
    assert_eq!(registry.get_log("t-1").unwrap(), vec![first, last]);
}

#[tokio::test]
async fn ensure_maps_upstream_404_to_unknown_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
    let error = upstream(&server, &registry).ensure("ghost").await.unwrap_err();
    assert!(matches!(error, RelayError::UnknownTask(id) if id == "ghost"));
    assert!(!registry.contains("ghost"));
}

#[tokio::test]
async fn stream_ending_before_final_synthesizes_a_relay_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/t-1/events"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&[started(1)])),
        )
        .mount(&server)
        .await;

    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
    upstream(&server, &registry).ensure("t-1").await.unwrap();

    assert_eq!(wait_terminal(&registry, "t-1").await, TaskState::Failed);
    let log = registry.get_log("t-1").unwrap();
    assert_eq!(log.len(), 2);
    let last = &log[1];
    assert_eq!(last.event_id, 2);
    assert!(last.is_final);
    assert_eq!(last.source, Source::Coordinator);
    assert!(matches!(
        &last.kind,
        EventKind::Error { stage, message, .. }
            if stage == "relay" && message.starts_with("coordinator: upstream failed")
    ));
}

#[tokio::test]
async fn gap_in_upstream_ids_synthesizes_a_relay_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/t-1/events"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&[started(1), failed(3)])),
        )
        .mount(&server)
        .await;

    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
    upstream(&server, &registry).ensure("t-1").await.unwrap();

    assert_eq!(wait_terminal(&registry, "t-1").await, TaskState::Failed);
    let log = registry.get_log("t-1").unwrap();
    assert_eq!(log.iter().map(|event| event.event_id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(matches!(&log[1].kind, EventKind::Error { stage, .. } if stage == "relay"));
}
