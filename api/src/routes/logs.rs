use crate::error::ApiResult;
use crate::sse::poll_new_events;
use crate::AppState;
use axum::extract::Query;
use axum::extract::State;
use axum::response::sse::Sse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logs", get(logs))
        .route("/logs/stream", get(logs_stream))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<i64>,
}

async fn logs(
    State(facade): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let limit = query.limit.unwrap_or(100);
    let events = facade.logs(limit).await?;
    Ok(Json(json!({ "ok": true, "events": events })))
}

/// `GET /logs/stream`: spec.md §6 calls for "streamed new events, polled at
/// a small interval" rather than a push-based tail, so this wraps a short
/// polling loop in an SSE response instead of subscribing to a broadcast
/// channel the store doesn't have.
async fn logs_stream(
    State(facade): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    Sse::new(poll_new_events(facade))
        .keep_alive(axum::response::sse::KeepAlive::default())
}
