//! The HTTP control plane from spec.md §6. A thin axum transport over
//! [`agentloop_supervisor::CommandFacade`]: every handler below maps one
//! route to one façade method and re-shapes the result into the
//! `{ok: bool, ...}` envelope every endpoint promises.

mod error;
mod routes;
mod sse;

use agentloop_supervisor::CommandFacade;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use error::ApiResult;

pub type AppState = Arc<CommandFacade>;

/// Builds the full router. Callers (the `serve` CLI subcommand, or an
/// integration test) supply the already-initialized façade and own the
/// listener/shutdown signal themselves.
pub fn router(facade: AppState) -> Router {
    Router::new()
        .merge(routes::status::router())
        .merge(routes::logs::router())
        .merge(routes::tasks::router())
        .merge(routes::pause::router())
        .merge(routes::settings::router())
        .merge(routes::repositories::router())
        .merge(routes::reviewer::router())
        .layer(TraceLayer::new_for_http())
        .with_state(facade)
}
