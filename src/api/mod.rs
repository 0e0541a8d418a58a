pub mod check;
pub mod devices;
pub mod disruptions;
pub mod error;
pub mod health;
pub mod notifications;
pub mod ws;

pub use error::{internal_error, ErrorResponse};

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

use crate::relay::{CycleReportSender, Relay, SnapshotStore};

pub fn router(
    pool: SqlitePool,
    relay: Arc<Relay>,
    snapshot_store: SnapshotStore,
    cycle_tx: CycleReportSender,
) -> Router {
    let ws_state = ws::CycleWsState { cycle_tx };

    Router::new()
        .nest("/disruptions", disruptions::router(snapshot_store.clone()))
        .nest("/check", check::router(relay.clone()))
        .nest("/devices", devices::router(pool, relay.clone()))
        .nest("/notifications", notifications::router(relay.clone()))
        .nest("/health", health::router(relay, snapshot_store))
        .route("/ws/cycles", get(ws::ws_cycles).with_state(ws_state))
}
