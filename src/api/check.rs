use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::relay::{CycleReport, Relay};

#[derive(Clone)]
pub struct CheckState {
    pub relay: Arc<Relay>,
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    /// Treat every current notification-worthy disruption as new, bypassing
    /// the already-notified dedup. Diagnostic opt-in; never the default.
    #[serde(default)]
    pub force: bool,
}

/// Run one check cycle synchronously and report the result.
///
/// A trigger arriving while a cycle is in flight is coalesced and reported
/// with the `skipped` outcome rather than queued.
#[utoipa::path(
    post,
    path = "/api/check",
    params(
        ("force" = Option<bool>, Query, description = "Re-dispatch every current notification-worthy disruption (duplicate notifications will be sent)")
    ),
    responses(
        (status = 200, description = "Report of the executed cycle", body = CycleReport)
    ),
    tag = "check"
)]
pub async fn run_check(
    State(state): State<CheckState>,
    Query(params): Query<CheckParams>,
) -> Json<CycleReport> {
    if params.force {
        tracing::warn!("Manual check with force=true; subscribers will be re-notified");
    }

    Json(state.relay.run_cycle(params.force).await)
}

pub fn router(relay: Arc<Relay>) -> Router {
    let state = CheckState { relay };
    Router::new().route("/", post(run_check)).with_state(state)
}
