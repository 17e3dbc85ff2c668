use crate::error::ApiError;
use crate::error::ApiResult;
use crate::AppState;
use agentloop_models::BackendKind;
use agentloop_supervisor::SupervisorError;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", post(settings))
}

/// `POST /settings {model_type?...}`. Only `model_type` takes effect at
/// runtime (switching the active adapter); every other key named in
/// spec.md §6's configuration table requires a process restart and is
/// accepted here only to be echoed back, never applied.
#[derive(Debug, Deserialize)]
struct SettingsBody {
    model_type: Option<String>,
}

async fn settings(
    State(facade): State<AppState>,
    Json(body): Json<SettingsBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let Some(raw) = body.model_type else {
        return Ok(Json(json!({ "ok": true, "changed": [] })));
    };
    let kind = BackendKind::parse(&raw)
        .ok_or_else(|| ApiError::from(SupervisorError::Configuration(format!("invalid model_type {raw:?}"))))?;
    let switched = facade.switch_model(kind).await;
    if !switched {
        return Err(ApiError::from(SupervisorError::Configuration(format!(
            "model backend {raw:?} is unavailable"
        ))));
    }
    Ok(Json(json!({ "ok": true, "changed": ["model_type"], "model_type": raw })))
}
