use crate::error::{RelayError, TransportError};
use crate::events::{Event, Source, decode_event};
use crate::observability::{Observer, ObserverEvent};
use crate::task::TaskRegistry;
use crate::transport::SseClient;
use futures_util::StreamExt;
use std::sync::Arc;

/// Mirror one upstream task into the local registry until its final event.
///
/// Events keep their upstream ids. Keep-alives are consumed here; duplicates
/// are skipped. Anything else that ends the stream early is appended as a
/// terminal `relay` error so local subscribers are never left waiting.
/// There is no automatic retry.
pub(crate) async fn pump_upstream(
    client: SseClient,
    registry: Arc<TaskRegistry>,
    observer: Arc<dyn Observer>,
    task_id: String,
    hop: String,
    source: Source,
) {
    let mut last = registry.last_event_id(&task_id).unwrap_or(0);
    let result = mirror(&client, &registry, &task_id, &mut last).await;

    let Err(error) = result else {
        tracing::debug!(hop = %hop, task_id = %task_id, last, "upstream pump finished");
        return;
    };

    let message = format!("{hop}: upstream failed: {error}");
    observer.record_event(&ObserverEvent::UpstreamFailure {
        task_id: task_id.clone(),
        message: message.clone(),
    });
    let failure = Event::synthetic_error(last + 1, task_id.as_str(), source, "relay", message);
    if let Err(error) = registry.append(&task_id, failure) {
        tracing::error!(hop = %hop, task_id = %task_id, error = %error, "could not record upstream failure");
    }
}

async fn mirror(
    client: &SseClient,
    registry: &TaskRegistry,
    task_id: &str,
    last: &mut u64,
) -> Result<(), RelayError> {
    let mut frames = client.open_events(task_id, *last).await?;

    while let Some(frame) = frames.next().await {
        let event = decode_event(&frame?)?;
        if event.is_keep_alive() {
            continue;
        }
        if event.event_id <= *last {
            tracing::debug!(task_id, event_id = event.event_id, "duplicate upstream event skipped");
            continue;
        }
        if event.event_id != *last + 1 {
            return Err(RelayError::Upstream(format!(
                "event stream skipped from {} to {}",
                *last + 1,
                event.event_id
            )));
        }

        let event_id = event.event_id;
        let is_final = event.is_final;
        registry.append(task_id, event)?;
        *last = event_id;
        if is_final {
            return Ok(());
        }
    }

    Err(TransportError::Stream("upstream closed before the final event".to_string()).into())
}
