use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::Disruption;

/// The full disruption set observed at the end of the most recent cycle.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    disruptions: HashMap<i64, Disruption>,
}

impl Snapshot {
    pub fn from_disruptions(disruptions: Vec<Disruption>) -> Self {
        Self {
            disruptions: disruptions.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.disruptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disruptions.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.disruptions.contains_key(&id)
    }

    pub fn disruptions(&self) -> impl Iterator<Item = &Disruption> {
        self.disruptions.values()
    }

    /// Ids of the notification-worthy members, the set diffing runs against.
    pub fn notification_worthy_ids(&self) -> HashSet<i64> {
        self.disruptions
            .values()
            .filter(|d| d.is_notification_worthy())
            .map(|d| d.id)
            .collect()
    }
}

/// Holds zero or one committed snapshot.
///
/// `current` returns the empty set until the first commit; whether that first
/// commit has happened is observable through `is_seeded`, so the scheduler
/// can run its fetch-only seeding pass instead of treating a cold start as
/// "everything is new".
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Option<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// The committed snapshot, or the empty set if none has been committed.
    pub async fn current(&self) -> Snapshot {
        self.inner.read().await.clone().unwrap_or_default()
    }

    /// Atomically replace the held snapshot.
    pub async fn commit(&self, snapshot: Snapshot) {
        *self.inner.write().await = Some(snapshot);
    }

    /// Whether any snapshot has ever been committed.
    pub async fn is_seeded(&self) -> bool {
        self.inner.read().await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.as_ref().map_or(0, |s| s.len())
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriorityLevel;

    fn disruption(id: i64, priority_level: PriorityLevel) -> Disruption {
        Disruption {
            id,
            created_at: "2025-03-24T08:00:00Z".to_string(),
            title: format!("Disruption {}", id),
            content: String::new(),
            important: false,
            version: 1,
            order: id,
            topics: String::new(),
            additional_info_title: None,
            additional_info_url: None,
            guid: String::new(),
            active: true,
            all_routes: false,
            all_stations: false,
            impacted_stations: Vec::new(),
            impacted_routes: Vec::new(),
            impacted_facilities: Vec::new(),
            priority_level,
        }
    }

    #[tokio::test]
    async fn cold_store_serves_empty_snapshot() {
        let store = SnapshotStore::new();
        assert!(!store.is_seeded().await);
        assert!(store.current().await.is_empty());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn commit_replaces_snapshot_wholesale() {
        let store = SnapshotStore::new();
        store
            .commit(Snapshot::from_disruptions(vec![
                disruption(1, PriorityLevel::ServiceDisruption),
                disruption(2, PriorityLevel::StationClosure),
            ]))
            .await;
        assert!(store.is_seeded().await);
        assert_eq!(store.len().await, 2);

        store
            .commit(Snapshot::from_disruptions(vec![disruption(
                3,
                PriorityLevel::ServiceSuspension,
            )]))
            .await;
        let current = store.current().await;
        assert_eq!(current.len(), 1);
        assert!(current.contains(3));
        assert!(!current.contains(1));
    }

    #[tokio::test]
    async fn worthy_ids_exclude_informational() {
        let snapshot = Snapshot::from_disruptions(vec![
            disruption(1, PriorityLevel::ServiceDisruption),
            disruption(2, PriorityLevel::ForInformationOnly),
        ]);
        let ids = snapshot.notification_worthy_ids();
        assert!(ids.contains(&1));
        assert!(!ids.contains(&2));
    }
}
