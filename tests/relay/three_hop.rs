use crate::cluster::{Cluster, Recorder, failing_alert, ids, three_step_alert};
use alertwire::error::ClientError;
use alertwire::events::{EventKind, EventType, TerminationReason};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn three_capabilities_reach_the_client_in_order_through_every_hop() {
    let cluster = Cluster::start().await;
    let task_id = cluster.submit_at_gateway(three_step_alert()).await;

    let mut recorder = Recorder::default();
    let timeline = cluster
        .gateway
        .consumer()
        .connect(&task_id, &mut recorder)
        .await
        .expect("task should complete");

    assert!(recorder.completed);
    assert!(recorder.errors.is_empty());
    assert_eq!(ids(&timeline.events), (1..=timeline.events.len() as u64).collect::<Vec<_>>());

    let substantive: Vec<EventType> = timeline
        .events
        .iter()
        .map(|event| event.event_type())
        .filter(|kind| *kind != EventType::AgentThinking)
        .collect();
    assert_eq!(
        substantive,
        vec![
            EventType::AnalysisStarted,
            EventType::ToolStarted,
            EventType::ToolCompleted,
            EventType::ToolStarted,
            EventType::ToolCompleted,
            EventType::ToolStarted,
            EventType::ToolCompleted,
            EventType::AnalysisComplete,
        ]
    );

    let terminal = timeline.terminal().expect("timeline should have a terminal event");
    assert!(terminal.is_final);
    assert!(matches!(
        &terminal.kind,
        EventKind::AnalysisComplete {
            termination_reason: TerminationReason::ExplicitAnswer,
            ..
        }
    ));
    assert_eq!(timeline.events.iter().filter(|event| event.is_final).count(), 1);

    // Every hop holds the same log the worker produced.
    let worker_log = cluster.worker.client().status(&task_id).await.unwrap().event_log;
    let coordinator_log = cluster
        .coordinator
        .client()
        .status(&task_id)
        .await
        .unwrap()
        .event_log;
    assert_eq!(worker_log, timeline.events);
    assert_eq!(coordinator_log, timeline.events);
}

#[tokio::test]
async fn capability_failure_surfaces_as_a_terminal_error_at_the_client() {
    let cluster = Cluster::start().await;
    let task_id = cluster.submit_at_gateway(failing_alert()).await;

    let mut recorder = Recorder::default();
    let error = cluster
        .gateway
        .consumer()
        .connect(&task_id, &mut recorder)
        .await
        .expect_err("task should fail");

    match &error {
        ClientError::TaskFailed {
            message,
            capability,
        } => {
            assert_eq!(message, "market data feed offline");
            assert_eq!(capability.as_deref(), Some("fail"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!recorder.completed);
    assert_eq!(recorder.errors.len(), 1);

    let last = recorder.events.last().unwrap();
    assert!(last.is_final);
    assert!(last.is_error());
    assert!(!recorder
        .events
        .iter()
        .any(|event| event.event_type() == EventType::AnalysisComplete));
    let tool_starts = recorder
        .events
        .iter()
        .filter(|event| event.event_type() == EventType::ToolStarted)
        .count();
    assert_eq!(tool_starts, 2);
}

#[tokio::test]
async fn concurrent_subscribers_see_the_same_sequence() {
    let cluster = Cluster::start().await;
    let task_id = cluster
        .submit_at_gateway(json!({"script": [
            {"invoke": [{"capability": "wait", "input": {"ms": 200}}]},
            {"invoke": [{"capability": "echo", "input": {}}]}
        ]}))
        .await;

    let first = cluster.gateway.consumer();
    let second = cluster.gateway.consumer();
    let (a, b) = tokio::join!(
        async {
            let mut recorder = Recorder::default();
            first.connect(&task_id, &mut recorder).await.map(|_| recorder)
        },
        async {
            let mut recorder = Recorder::default();
            second.connect(&task_id, &mut recorder).await.map(|_| recorder)
        }
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.events, b.events);
    let progress = a
        .events
        .iter()
        .filter(|event| event.event_type() == EventType::ToolProgress)
        .count();
    assert_eq!(progress, 4);
}

#[tokio::test]
async fn subscriber_attached_before_events_sees_them_live() {
    let cluster = Cluster::start().await;
    let task_id = cluster
        .submit_at_gateway(json!({"script": [
            {"invoke": [{"capability": "wait", "input": {"ms": 400}}]}
        ]}))
        .await;

    let mut recorder = Recorder::default();
    let timeline = tokio::time::timeout(
        Duration::from_secs(10),
        cluster.gateway.consumer().connect(&task_id, &mut recorder),
    )
    .await
    .expect("stream should finish")
    .expect("task should complete");

    assert_eq!(timeline.events[0].event_type(), EventType::AnalysisStarted);
    assert!(timeline.is_complete());
}

#[tokio::test]
async fn unknown_agent_is_rejected_through_relays() {
    let cluster = Cluster::start().await;
    let response = reqwest::Client::new()
        .post(cluster.gateway.url("/tasks"))
        .json(&json!({"alert": {}, "agent": "nobody"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
