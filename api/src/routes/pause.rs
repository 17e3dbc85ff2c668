use crate::error::ApiError;
use crate::error::ApiResult;
use crate::AppState;
use agentloop_supervisor::PauseAction;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pause", post(pause))
        .route("/restart-worker", post(restart_worker))
}

#[derive(Debug, Deserialize)]
struct PauseBody {
    action: String,
}

async fn pause(
    State(facade): State<AppState>,
    Json(body): Json<PauseBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let action = PauseAction::parse(&body.action).ok_or_else(|| {
        ApiError::from(agentloop_supervisor::SupervisorError::Configuration(format!(
            "invalid pause action {:?}",
            body.action
        )))
    })?;
    let is_paused = facade.pause(action);
    Ok(Json(json!({ "ok": true, "is_paused": is_paused })))
}

#[derive(Debug, Deserialize)]
struct RestartWorkerBody {
    worker_id: String,
}

async fn restart_worker(
    State(facade): State<AppState>,
    Json(body): Json<RestartWorkerBody>,
) -> ApiResult<Json<serde_json::Value>> {
    facade.restart_worker(&body.worker_id).await?;
    Ok(Json(json!({ "ok": true })))
}
