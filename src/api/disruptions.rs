use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Disruption;
use crate::relay::SnapshotStore;

#[derive(Clone)]
pub struct DisruptionsState {
    pub snapshot_store: SnapshotStore,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DisruptionListResponse {
    pub disruptions: Vec<Disruption>,
    pub count: usize,
}

/// List the disruptions in the committed snapshot.
///
/// Serves the last committed snapshot, not a live fetch; clients get the
/// same view the diffing ran against, without hitting the upstream feed.
#[utoipa::path(
    get,
    path = "/api/disruptions",
    responses(
        (status = 200, description = "Currently active disruptions", body = DisruptionListResponse)
    ),
    tag = "disruptions"
)]
pub async fn list_disruptions(
    State(state): State<DisruptionsState>,
) -> Json<DisruptionListResponse> {
    let snapshot = state.snapshot_store.current().await;
    let mut disruptions: Vec<Disruption> = snapshot.disruptions().cloned().collect();
    disruptions.sort_by_key(|d| (d.order, d.id));

    Json(DisruptionListResponse {
        count: disruptions.len(),
        disruptions,
    })
}

pub fn router(snapshot_store: SnapshotStore) -> Router {
    let state = DisruptionsState { snapshot_store };
    Router::new()
        .route("/", get(list_disruptions))
        .with_state(state)
}
