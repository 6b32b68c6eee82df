use crate::cluster::{Cluster, Recorder, ids, three_step_alert};
use alertwire::transport::LAST_EVENT_ID;

#[tokio::test]
async fn reconnect_after_two_events_resumes_at_three() {
    let cluster = Cluster::start().await;
    let task_id = cluster.submit_at_gateway(three_step_alert()).await;
    let consumer = cluster.gateway.consumer();

    let mut full = Recorder::default();
    let uninterrupted = consumer.connect(&task_id, &mut full).await.unwrap();

    let mut resumed = Recorder::default();
    let tail = consumer
        .connect_after(&task_id, 2, &mut resumed)
        .await
        .unwrap();

    assert_eq!(ids(&tail.events).first(), Some(&3));
    assert_eq!(tail.events, uninterrupted.events[2..].to_vec());
    assert_eq!(tail.terminal(), uninterrupted.terminal());
    assert!(resumed.completed);
}

#[tokio::test]
async fn last_event_id_header_skips_delivered_frames() {
    let cluster = Cluster::start().await;
    let task_id = cluster.submit_at_gateway(three_step_alert()).await;
    let timeline = cluster
        .gateway
        .consumer()
        .connect(&task_id, &mut Recorder::default())
        .await
        .unwrap();
    let last = timeline.last_event_id();

    let body = reqwest::Client::new()
        .get(cluster.gateway.url(&format!("/tasks/{task_id}/events")))
        .header(LAST_EVENT_ID, "2")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let frame_ids: Vec<u64> = body
        .lines()
        .filter_map(|line| line.strip_prefix("id: "))
        .map(|id| id.parse().unwrap())
        .collect();
    assert_eq!(frame_ids, (3..=last).collect::<Vec<_>>());
    assert!(body.contains("retry: 50\n"));
}

#[tokio::test]
async fn resume_past_the_final_event_closes_immediately() {
    let cluster = Cluster::start().await;
    let task_id = cluster.submit_at_gateway(three_step_alert()).await;
    let timeline = cluster
        .gateway
        .consumer()
        .connect(&task_id, &mut Recorder::default())
        .await
        .unwrap();

    let body = reqwest::Client::new()
        .get(cluster.gateway.url(&format!(
            "/tasks/{task_id}/events?after={}",
            timeline.last_event_id()
        )))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn watching_after_the_final_event_reports_completion() {
    let cluster = Cluster::start().await;
    let task_id = cluster.submit_at_gateway(three_step_alert()).await;
    let consumer = cluster.gateway.consumer();
    let finished = consumer
        .connect(&task_id, &mut Recorder::default())
        .await
        .unwrap();

    let mut recorder = Recorder::default();
    let tail = consumer
        .connect_after(&task_id, finished.last_event_id() + 10, &mut recorder)
        .await
        .unwrap();

    assert!(tail.events.is_empty());
    assert!(recorder.completed);
    assert!(recorder.errors.is_empty());
}
