use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::relay::{CycleOutcome, Relay, SnapshotStore};

#[derive(Clone)]
pub struct HealthState {
    pub relay: Arc<Relay>,
    pub snapshot_store: SnapshotStore,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running
    pub healthy: bool,
    /// Whether the snapshot store has been seeded by a first successful fetch
    pub seeded: bool,
    /// Number of disruptions in the committed snapshot
    pub snapshot_size: usize,
    /// Summary of the most recent check cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<LastCycle>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LastCycle {
    pub outcome: CycleOutcome,
    pub started_at: String,
    pub fetched: usize,
    pub new_count: usize,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    let last_cycle = state.relay.last_report().await.map(|r| LastCycle {
        outcome: r.outcome,
        started_at: r.started_at,
        fetched: r.fetched,
        new_count: r.new_count,
    });

    Json(HealthResponse {
        healthy: true,
        seeded: state.snapshot_store.is_seeded().await,
        snapshot_size: state.snapshot_store.len().await,
        last_cycle,
    })
}

pub fn router(relay: Arc<Relay>, snapshot_store: SnapshotStore) -> Router {
    let state = HealthState {
        relay,
        snapshot_store,
    };
    Router::new().route("/", get(health_check)).with_state(state)
}
