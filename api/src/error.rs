use agentloop_supervisor::SupervisorError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

/// Wraps [`SupervisorError`] so every handler can return it directly via
/// `?`; every response still carries spec.md §6's `{ok: bool, ...}` shape
/// even on failure.
pub struct ApiError(SupervisorError);

impl From<SupervisorError> for ApiError {
    fn from(err: SupervisorError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SupervisorError::Repo(agentloop_repo::RepoError::NotFound { .. })
            | SupervisorError::Repo(agentloop_repo::RepoError::PathNotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            SupervisorError::Repo(agentloop_repo::RepoError::AliasExists { .. })
            | SupervisorError::Configuration(_) => StatusCode::BAD_REQUEST,
            SupervisorError::Executor(agentloop_executor::ExecutorError::WorkerNotFound {
                ..
            }) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error = %self.0, "control API call failed");
        (
            status,
            Json(ErrorBody {
                ok: false,
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
