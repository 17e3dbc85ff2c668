use crate::error::ApiResult;
use crate::AppState;
use axum::extract::Path;
use axum::extract::State;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tireless-reviewer/status", get(reviewer_status))
        .route("/tireless-reviewer/force/{task_id}", post(force_review))
        .route("/tireless-reviewer/results/{task_id}", get(review_results))
}

async fn reviewer_status(State(facade): State<AppState>) -> Json<serde_json::Value> {
    let stats = facade.reviewer_status().await;
    Json(json!({ "ok": true, "stats": stats }))
}

async fn force_review(
    State(facade): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let findings = facade.force_review(&task_id).await?;
    Ok(Json(json!({ "ok": true, "findings": findings })))
}

async fn review_results(
    State(facade): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let findings = facade.review_results(&task_id).await?;
    Ok(Json(json!({ "ok": true, "findings": findings })))
}
