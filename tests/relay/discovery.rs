use crate::cluster::{Cluster, Recorder, three_step_alert};
use alertwire::task::Submission;

#[tokio::test]
async fn task_submitted_at_the_worker_can_be_watched_at_the_gateway() {
    let cluster = Cluster::start().await;
    let task_id = cluster
        .worker
        .client()
        .submit(&Submission {
            alert: three_step_alert(),
            agent: None,
        })
        .await
        .unwrap();

    let mut recorder = Recorder::default();
    let timeline = cluster
        .gateway
        .consumer()
        .connect(&task_id, &mut recorder)
        .await
        .expect("gateway should discover the task upstream");

    assert!(recorder.completed);
    let worker_log = cluster.worker.client().status(&task_id).await.unwrap().event_log;
    assert_eq!(timeline.events, worker_log);
}
