use crate::cluster::{Cluster, Recorder, failing_alert, three_step_alert};
use alertwire::task::TaskState;
use reqwest::StatusCode;

#[tokio::test]
async fn gateway_status_reports_completed_task_and_full_log() {
    let cluster = Cluster::start().await;
    let task_id = cluster.submit_at_gateway(three_step_alert()).await;
    let consumer = cluster.gateway.consumer();
    let timeline = consumer
        .connect(&task_id, &mut Recorder::default())
        .await
        .unwrap();

    let snapshot = consumer.fetch_status(&task_id).await.unwrap();
    assert_eq!(snapshot.task_id, task_id);
    assert_eq!(snapshot.state, TaskState::Completed);
    assert_eq!(snapshot.event_log, timeline.events);
}

#[tokio::test]
async fn failed_task_status_is_failed_at_every_hop() {
    let cluster = Cluster::start().await;
    let task_id = cluster.submit_at_gateway(failing_alert()).await;
    let _ = cluster
        .gateway
        .consumer()
        .connect(&task_id, &mut Recorder::default())
        .await;

    for node in [&cluster.worker, &cluster.coordinator, &cluster.gateway] {
        let snapshot = node.client().status(&task_id).await.unwrap();
        assert_eq!(snapshot.state, TaskState::Failed, "{} disagrees", node.role);
    }
}

#[tokio::test]
async fn unknown_task_is_404_at_every_hop() {
    let cluster = Cluster::start().await;
    let http = reqwest::Client::new();
    for node in [&cluster.worker, &cluster.coordinator, &cluster.gateway] {
        let status = http
            .get(node.url("/tasks/does-not-exist"))
            .send()
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::NOT_FOUND);

        let events = http
            .get(node.url("/tasks/does-not-exist/events"))
            .send()
            .await
            .unwrap();
        assert_eq!(events.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = events.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("does-not-exist"));
    }
}

#[tokio::test]
async fn health_reports_each_role() {
    let cluster = Cluster::start().await;
    for (node, role) in [
        (&cluster.worker, "worker"),
        (&cluster.coordinator, "coordinator"),
        (&cluster.gateway, "gateway"),
    ] {
        let body: serde_json::Value = reqwest::get(node.url("/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["role"], role);
    }
}
