use crate::error::ApiResult;
use crate::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

async fn status(State(facade): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let snapshot = facade.status().await?;
    Ok(Json(json!({ "ok": true, "status": snapshot })))
}
