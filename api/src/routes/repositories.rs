use crate::error::ApiResult;
use crate::AppState;
use agentloop_supervisor::ConnectRequest;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/git/commits", get(recent_commits))
        .route("/repositories", get(list_repositories))
        .route("/repositories/connect", post(connect_repository))
        .route("/repositories/{alias}/disconnect", post(disconnect_repository))
        .route("/repositories/{alias}/pull", post(pull_repository))
        .route("/repositories/{alias}/push", post(push_repository))
        .route("/repositories/{alias}/scan", post(scan_repository))
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<i64>,
}

async fn recent_commits(
    State(facade): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let commits = facade.recent_commits(query.limit.unwrap_or(20)).await?;
    Ok(Json(json!({ "ok": true, "commits": commits })))
}

async fn list_repositories(State(facade): State<AppState>) -> Json<serde_json::Value> {
    let repositories = facade.list_repositories().await;
    Json(json!({ "ok": true, "repositories": repositories }))
}

#[derive(Debug, Deserialize)]
struct ConnectBody {
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
    path: Option<String>,
    alias: Option<String>,
    branch: Option<String>,
    #[serde(default)]
    initialize_git: bool,
}

async fn connect_repository(
    State(facade): State<AppState>,
    Json(body): Json<ConnectBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let remote = body.kind == "remote";
    let location = if remote {
        body.url.unwrap_or_default()
    } else {
        body.path.unwrap_or_default()
    };
    let binding = facade
        .connect_repository(ConnectRequest {
            remote,
            location,
            alias: body.alias,
            branch: body.branch,
            initialize_git: body.initialize_git,
        })
        .await?;
    Ok(Json(json!({ "ok": true, "repository": binding })))
}

async fn disconnect_repository(
    State(facade): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    facade.disconnect_repository(&alias).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn pull_repository(
    State(facade): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let outcome = facade.pull_repository(&alias).await?;
    Ok(Json(json!({ "ok": outcome.ok, "error": outcome.error })))
}

async fn push_repository(
    State(facade): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let outcome = facade.push_repository(&alias).await?;
    Ok(Json(json!({
        "ok": outcome.ok,
        "commit": outcome.commit,
        "noop": outcome.noop,
        "remoteless": outcome.remoteless,
        "error": outcome.error,
    })))
}

async fn scan_repository(
    State(facade): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let result = facade.scan_repository(&alias).await?;
    Ok(Json(json!({ "ok": true, "tasks": result.tasks, "issues": result.issues })))
}
