//! Disruption change detection and notification dispatch.
//!
//! This module owns the check cycle: fetch the active disruption set, diff it
//! against the previously committed snapshot, publish one notification per
//! (new disruption, resolved topic) pair, then commit the new snapshot. The
//! feed and push backend are reached through the [`DisruptionSource`] and
//! [`TopicPublisher`] seams so hosts and tests can supply their own adapters.

mod detector;
mod dispatch;
mod store;
mod topics;

pub use detector::detect_new;
pub use dispatch::{
    build_message, dispatch_disruption, DispatchReport, PublishError, PushMessage, TopicDispatch,
};
pub use store::{Snapshot, SnapshotStore};
pub use topics::{TopicRouter, GLOBAL_TOPIC};

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::models::Disruption;
use crate::providers::fcm::FcmClient;
use crate::providers::feed::FeedClient;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("API error: {0}")]
    ApiError(String),
}

/// Supplies the current disruption set. Implemented by the HTTP feed client;
/// tests and other hosts provide their own.
#[async_trait::async_trait]
pub trait DisruptionSource: Send + Sync {
    async fn fetch_active(&self) -> Result<Vec<Disruption>, FetchError>;
}

/// Publishes one message to one topic. Implemented by the FCM adapter.
#[async_trait::async_trait]
pub trait TopicPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        message: &PushMessage,
    ) -> Result<Option<String>, PublishError>;
}

/// The relay wired to its production adapters.
pub type Relay = RelayManager<FeedClient, FcmClient>;

/// How a check cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// First successful cycle: snapshot committed, nothing dispatched.
    Seeded,
    /// Fetch succeeded and the snapshot was committed.
    Completed,
    /// Fetch failed; no state was mutated and nothing was dispatched.
    FetchFailed,
    /// A cycle was already in flight; this trigger was coalesced.
    Skipped,
}

/// Record of one check cycle.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CycleReport {
    pub cycle_id: String,
    pub outcome: CycleOutcome,
    /// When the cycle started (ISO 8601)
    pub started_at: String,
    pub duration_ms: u64,
    /// Number of disruptions returned by the feed
    pub fetched: usize,
    /// Number of newly-appeared, notification-worthy disruptions
    pub new_count: usize,
    /// Per-disruption dispatch results
    pub dispatches: Vec<DispatchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the check cycle on a fixed interval and on demand.
///
/// At most one cycle is ever in flight: a trigger arriving while a cycle runs
/// is coalesced, not queued. The first successful cycle seeds the snapshot
/// store without dispatching, so a process restart never mass-notifies.
pub struct RelayManager<S, P> {
    source: S,
    publisher: P,
    store: SnapshotStore,
    router: TopicRouter,
    pool: SqlitePool,
    interval_secs: u64,
    cycle_guard: Mutex<()>,
    last_report: RwLock<Option<CycleReport>>,
    cycle_tx: broadcast::Sender<CycleReport>,
}

/// Sender for completed cycle reports (diagnostics stream and health).
pub type CycleReportSender = broadcast::Sender<CycleReport>;

impl<S: DisruptionSource, P: TopicPublisher> RelayManager<S, P> {
    pub fn new(source: S, publisher: P, pool: SqlitePool, config: &Config) -> Self {
        // Capacity 16: diagnostics consumers only ever want recent reports
        let (cycle_tx, _) = broadcast::channel(16);

        Self {
            source,
            publisher,
            store: SnapshotStore::new(),
            router: TopicRouter::new(config.feed.routes.clone()),
            pool,
            interval_secs: config.feed.interval_secs,
            cycle_guard: Mutex::new(()),
            last_report: RwLock::new(None),
            cycle_tx,
        }
    }

    /// Get a handle to the snapshot store for API access
    pub fn snapshot_store(&self) -> SnapshotStore {
        self.store.clone()
    }

    /// Get the cycle report sender for the diagnostics WebSocket
    pub fn cycle_report_sender(&self) -> CycleReportSender {
        self.cycle_tx.clone()
    }

    /// The push backend adapter, for API handlers that address devices
    /// directly (registration, test sends).
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn topic_router(&self) -> &TopicRouter {
        &self.router
    }

    /// The most recent non-skipped cycle report, if any cycle has run.
    pub async fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().await.clone()
    }

    /// Run the check loop forever. The first pass seeds the snapshot store.
    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval_secs, "Starting disruption relay");

        // Initial fetch-only pass on startup
        self.run_cycle(false).await;

        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(self.interval_secs));
        // Skip the first tick which fires immediately (we already ran above)
        interval.tick().await;

        loop {
            interval.tick().await;
            self.run_cycle(false).await;
        }
    }

    /// Run one check cycle: fetch, diff, dispatch, commit.
    ///
    /// `force` treats every current notification-worthy disruption as new,
    /// bypassing the diff. Diagnostic use only; it will re-notify
    /// subscribers for disruptions they have already seen.
    pub async fn run_cycle(&self, force: bool) -> CycleReport {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            info!("Check cycle already in flight; coalescing trigger");
            return CycleReport {
                cycle_id: Uuid::new_v4().to_string(),
                outcome: CycleOutcome::Skipped,
                started_at: Utc::now().to_rfc3339(),
                duration_ms: 0,
                fetched: 0,
                new_count: 0,
                dispatches: Vec::new(),
                error: None,
            };
        };

        let cycle_id = Uuid::new_v4().to_string();
        let started_at = Utc::now().to_rfc3339();
        let started = Instant::now();

        let current = match self.source.fetch_active().await {
            Ok(disruptions) => disruptions,
            Err(e) => {
                // The stale snapshot stays in place; whatever appeared during
                // this window is still caught by the next cycle's diff.
                error!(error = %e, "Failed to fetch disruptions; cycle aborted");
                return self
                    .finish_cycle(CycleReport {
                        cycle_id,
                        outcome: CycleOutcome::FetchFailed,
                        started_at,
                        duration_ms: started.elapsed().as_millis() as u64,
                        fetched: 0,
                        new_count: 0,
                        dispatches: Vec::new(),
                        error: Some(e.to_string()),
                    })
                    .await;
            }
        };

        let seeded = self.store.is_seeded().await;

        let new_disruptions: Vec<Disruption> = if force {
            current
                .iter()
                .filter(|d| d.is_notification_worthy())
                .cloned()
                .collect()
        } else if !seeded {
            // Cold start: seed the store without dispatching, regardless of
            // how many disruptions the feed currently reports.
            Vec::new()
        } else {
            let previous = self.store.current().await;
            detect_new(&previous, &current)
        };

        let mut dispatches = Vec::with_capacity(new_disruptions.len());
        for disruption in &new_disruptions {
            let topics = self.router.topics_for(disruption);
            let report = dispatch_disruption(&self.publisher, disruption, &topics).await;
            info!(
                disruption_id = disruption.id,
                priority_level = disruption.priority_level.as_str(),
                succeeded = report.succeeded(),
                failed = report.failed(),
                "Dispatched disruption notification"
            );
            dispatches.push(report);
        }

        // Commit is unconditional once the fetch succeeded, even on an empty
        // diff. A crash before this point re-diffs against the old snapshot
        // next cycle; duplicate notifications are accepted over lost ones.
        self.store
            .commit(Snapshot::from_disruptions(current.clone()))
            .await;

        if let Err(e) = self.archive_snapshot(&current).await {
            warn!(error = %e, "Failed to archive snapshot; in-memory state is committed");
        }

        let outcome = if seeded || force {
            CycleOutcome::Completed
        } else {
            CycleOutcome::Seeded
        };

        self.finish_cycle(CycleReport {
            cycle_id,
            outcome,
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            fetched: current.len(),
            new_count: new_disruptions.len(),
            dispatches,
            error: None,
        })
        .await
    }

    /// Record and broadcast a finished cycle.
    async fn finish_cycle(&self, report: CycleReport) -> CycleReport {
        info!(
            cycle_id = %report.cycle_id,
            outcome = ?report.outcome,
            fetched = report.fetched,
            new_count = report.new_count,
            duration_ms = report.duration_ms,
            "Completed check cycle"
        );

        *self.last_report.write().await = Some(report.clone());
        // Ignore send errors - they just mean no one is listening
        let _ = self.cycle_tx.send(report.clone());

        report
    }

    /// Replace the durable copy of the snapshot in a single transaction.
    async fn archive_snapshot(&self, disruptions: &[Disruption]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM disruptions").execute(&mut *tx).await?;

        let archived_at = Utc::now().to_rfc3339();
        for disruption in disruptions {
            let payload = serde_json::to_string(disruption)
                .map_err(|e| {
                    warn!(disruption_id = disruption.id, error = %e, "Failed to serialize disruption payload")
                })
                .ok();

            sqlx::query(
                r#"
                INSERT INTO disruptions (
                    id, created_at, title, content, priority_level,
                    all_routes, all_stations,
                    impacted_routes, impacted_stations, impacted_facilities,
                    display_order, payload, archived_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(disruption.id)
            .bind(&disruption.created_at)
            .bind(&disruption.title)
            .bind(&disruption.content)
            .bind(disruption.priority_level.as_str())
            .bind(disruption.all_routes)
            .bind(disruption.all_stations)
            .bind(serde_json::to_string(&disruption.impacted_routes).ok())
            .bind(serde_json::to_string(&disruption.impacted_stations).ok())
            .bind(serde_json::to_string(&disruption.impacted_facilities).ok())
            .bind(disruption.order)
            .bind(payload)
            .bind(&archived_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}
