use crate::error::ApiResult;
use crate::AppState;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/task", post(create_task))
        .route("/task/with-repo", post(create_task_with_repo))
}

#[derive(Debug, Deserialize)]
struct CreateTaskBody {
    description: String,
    #[serde(default)]
    priority: i64,
}

async fn create_task(
    State(facade): State<AppState>,
    Json(body): Json<CreateTaskBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let task_id = facade.enqueue_task(body.description, body.priority, None).await?;
    Ok(Json(json!({ "ok": true, "task_id": task_id })))
}

#[derive(Debug, Deserialize)]
struct CreateTaskWithRepoBody {
    description: String,
    target_repo: String,
    #[serde(default)]
    priority: i64,
}

async fn create_task_with_repo(
    State(facade): State<AppState>,
    Json(body): Json<CreateTaskWithRepoBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let task_id = facade
        .enqueue_task(body.description, body.priority, Some(body.target_repo))
        .await?;
    Ok(Json(json!({ "ok": true, "task_id": task_id })))
}
