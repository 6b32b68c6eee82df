use super::*;
use crate::events::{EventKind, EventType};
use crate::observability::NoopObserver;
use crate::task::{Submission, TaskState};
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use std::time::Instant;

/// Upstream that only knows what is already in the registry.
struct RegistryOnly(Arc<TaskRegistry>);

impl Upstream for RegistryOnly {
    fn name(&self) -> &str {
        "registry-only"
    }

    fn submit(&self, _submission: Submission) -> BoxFuture<'_, Result<String, RelayError>> {
        Box::pin(async { Err(RelayError::Upstream("read-only".into())) })
    }

    fn ensure<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<(), RelayError>> {
        Box::pin(async move {
            if self.0.contains(task_id) {
                Ok(())
            } else {
                Err(RelayError::UnknownTask(task_id.to_string()))
            }
        })
    }
}

fn hop_with(keep_alive: Duration, buffer: usize) -> RelayHop {
    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
    RelayHop::new(
        HopSettings {
            name: "worker".into(),
            source: Source::Worker,
            keep_alive,
            subscriber_buffer: buffer,
        },
        Arc::clone(&registry),
        Arc::new(RegistryOnly(registry)),
        Arc::new(NoopObserver),
    )
}

fn hop() -> RelayHop {
    hop_with(Duration::from_secs(25), 16)
}

fn step(id: u64) -> Event {
    Event::new(
        id,
        "t-1",
        Source::CapabilityInvoker,
        EventKind::ToolStarted {
            name: format!("cap-{id}"),
        },
        false,
    )
}

fn done(id: u64) -> Event {
    Event::new(
        id,
        "t-1",
        Source::ReasoningLoop,
        EventKind::AnalysisComplete {
            determination: crate::events::Determination {
                determination: "close".into(),
                confidence: None,
                summary: String::new(),
            },
            termination_reason: crate::events::TerminationReason::ExplicitAnswer,
            iterations: 1,
        },
        true,
    )
}

async fn next(sub: &mut Subscription) -> Option<Event> {
    tokio::time::timeout(Duration::from_secs(5), sub.next_event())
        .await
        .expect("subscription stalled")
}

#[tokio::test]
async fn replays_backlog_then_forwards_live_until_final() {
    let hop = hop();
    let registry = hop.registry();
    registry.register("t-1").unwrap();
    registry.append("t-1", step(1)).unwrap();
    registry.append("t-1", step(2)).unwrap();

    let mut sub = hop.subscribe("t-1", None).await.unwrap();
    assert_eq!(next(&mut sub).await.unwrap().event_id, 1);
    assert_eq!(next(&mut sub).await.unwrap().event_id, 2);

    registry.append("t-1", step(3)).unwrap();
    registry.append("t-1", done(4)).unwrap();
    assert_eq!(next(&mut sub).await.unwrap().event_id, 3);
    let last = next(&mut sub).await.unwrap();
    assert!(last.is_final);
    assert!(next(&mut sub).await.is_none());
}

#[tokio::test]
async fn resume_starts_right_after_the_given_id() {
    let hop = hop();
    let registry = hop.registry();
    registry.register("t-1").unwrap();
    for id in 1..=4 {
        registry.append("t-1", step(id)).unwrap();
    }
    registry.append("t-1", done(5)).unwrap();

    let sub = hop.subscribe("t-1", Some(2)).await.unwrap();
    let ids: Vec<u64> = sub.map(|event| event.event_id).collect().await;
    assert_eq!(ids, vec![3, 4, 5]);
}

#[tokio::test]
async fn resume_past_the_final_event_ends_immediately() {
    let hop = hop();
    let registry = hop.registry();
    registry.register("t-1").unwrap();
    registry.append("t-1", done(1)).unwrap();

    let mut sub = hop.subscribe("t-1", Some(1)).await.unwrap();
    assert!(next(&mut sub).await.is_none());
}

#[tokio::test]
async fn idle_stream_gets_keep_alives_that_are_not_logged() {
    let hop = hop_with(Duration::from_millis(50), 16);
    let registry = hop.registry();
    registry.register("t-1").unwrap();

    let started = Instant::now();
    let mut sub = hop.subscribe("t-1", None).await.unwrap();
    let event = next(&mut sub).await.unwrap();

    assert_eq!(event.event_type(), EventType::KeepAlive);
    assert_eq!(event.event_id, 0);
    assert!(!event.is_final);
    assert!(started.elapsed() < Duration::from_millis(100 * 10));
    assert!(registry.get_log("t-1").unwrap().is_empty());

    registry.append("t-1", step(1)).unwrap();
    let mut saw_step = false;
    while let Some(event) = next(&mut sub).await {
        if event.event_id == 1 {
            saw_step = true;
            break;
        }
    }
    assert!(saw_step);
}

#[tokio::test]
async fn dropping_one_subscriber_does_not_affect_another() {
    let hop = hop();
    let registry = hop.registry();
    registry.register("t-1").unwrap();

    let first = hop.subscribe("t-1", None).await.unwrap();
    let mut second = hop.subscribe("t-1", None).await.unwrap();
    drop(first);

    registry.append("t-1", step(1)).unwrap();
    registry.append("t-1", done(2)).unwrap();

    assert_eq!(next(&mut second).await.unwrap().event_id, 1);
    assert_eq!(next(&mut second).await.unwrap().event_id, 2);
    assert_eq!(registry.get_state("t-1"), Some(TaskState::Completed));
}

#[tokio::test]
async fn stalled_subscriber_never_blocks_the_producer_or_others() {
    let hop = hop_with(Duration::from_secs(25), 1);
    let registry = hop.registry();
    registry.register("t-1").unwrap();

    let _stalled = hop.subscribe("t-1", None).await.unwrap();
    let reader = hop.subscribe("t-1", None).await.unwrap();

    for id in 1..=20 {
        registry.append("t-1", step(id)).unwrap();
    }
    registry.append("t-1", done(21)).unwrap();

    let ids: Vec<u64> = tokio::time::timeout(
        Duration::from_secs(5),
        reader.map(|event| event.event_id).collect::<Vec<_>>(),
    )
    .await
    .unwrap();
    assert_eq!(ids, (1..=21).collect::<Vec<_>>());
}

#[tokio::test]
async fn unknown_task_is_rejected() {
    let hop = hop();
    assert!(matches!(
        hop.subscribe("ghost", None).await,
        Err(RelayError::UnknownTask(id)) if id == "ghost"
    ));
}

#[tokio::test]
async fn lagging_subscriber_of_an_evicted_task_gets_a_relay_error() {
    let registry = Arc::new(TaskRegistry::new(Duration::ZERO));
    registry.register("t-1").unwrap();
    registry.append("t-1", step(1)).unwrap();
    registry.append("t-1", done(2)).unwrap();
    let head = registry.watch("t-1").unwrap();
    assert_eq!(registry.evict_expired(), vec!["t-1".to_string()]);

    // A subscriber that had only seen event 1 when the task was evicted.
    let (tx, mut rx) = mpsc::channel(4);
    Forwarder {
        settings: HopSettings {
            name: "coordinator".into(),
            source: Source::Coordinator,
            keep_alive: Duration::from_secs(25),
            subscriber_buffer: 4,
        },
        registry,
        observer: Arc::new(NoopObserver),
        task_id: "t-1".into(),
        cursor: 1,
        delivered: 1,
        tx,
        cancel: CancellationToken::new(),
    }
    .run(head)
    .await;

    let failure = rx.recv().await.unwrap();
    assert_eq!(failure.event_id, 2);
    assert!(failure.is_final);
    assert_eq!(failure.source, Source::Coordinator);
    assert!(matches!(
        &failure.kind,
        EventKind::Error { stage, message, .. } if stage == "relay" && message.starts_with("coordinator:")
    ));
    assert!(rx.recv().await.is_none());
}
