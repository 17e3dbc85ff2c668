use crate::AppState;
use axum::response::sse::Event;
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

/// Small-interval poll loop backing `GET /logs/stream`: each tick asks the
/// façade for events newer than the last one seen and emits them as SSE
/// frames. `last_id` starts at whatever is newest when the client connects
/// so a fresh stream doesn't replay history.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub fn poll_new_events(facade: AppState) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(
        (facade, None::<i64>),
        |(facade, mut last_id)| async move {
            loop {
                tokio::time::sleep(POLL_INTERVAL).await;
                let recent = match facade.logs(200).await {
                    Ok(events) => events,
                    Err(err) => {
                        tracing::warn!(error = %err, "logs/stream poll failed");
                        continue;
                    }
                };
                let mut fresh: Vec<_> = recent
                    .into_iter()
                    .filter(|event| last_id.is_none_or(|seen| event.id > seen))
                    .collect();
                if fresh.is_empty() {
                    continue;
                }
                fresh.sort_by_key(|event| event.id);
                last_id = fresh.last().map(|event| event.id).or(last_id);
                let payload = serde_json::to_string(&fresh).unwrap_or_else(|_| "[]".to_string());
                return Some((Ok(Event::default().data(payload)), (facade, last_id)));
            }
        },
    )
}
