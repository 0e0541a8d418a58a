use std::collections::BTreeSet;

use crate::models::Disruption;

/// Topic every subscriber receives, regardless of route.
pub const GLOBAL_TOPIC: &str = "metro_disruptions";

/// Maps a disruption to the set of notification topics it must be published
/// to. Deterministic: the same disruption always resolves to the same set.
pub struct TopicRouter {
    route_topics: Vec<String>,
}

impl TopicRouter {
    pub fn new(route_topics: Vec<String>) -> Self {
        Self { route_topics }
    }

    /// The known per-route topics (from configuration).
    pub fn route_topics(&self) -> &[String] {
        &self.route_topics
    }

    /// Resolve the topics for one disruption: always the global topic, plus
    /// the known route topics the disruption affects. Unknown route
    /// identifiers are ignored; if none of the impacted routes is known the
    /// dispatch falls back to the global topic alone.
    pub fn topics_for(&self, disruption: &Disruption) -> BTreeSet<String> {
        let mut topics = BTreeSet::new();
        topics.insert(GLOBAL_TOPIC.to_string());

        if disruption.all_routes {
            topics.extend(self.route_topics.iter().cloned());
            return topics;
        }

        let mut matched_any = false;
        for route in &disruption.impacted_routes {
            if self.route_topics.iter().any(|known| known == route) {
                topics.insert(route.clone());
                matched_any = true;
            } else {
                tracing::debug!(
                    disruption_id = disruption.id,
                    route = %route,
                    "Ignoring unknown route identifier"
                );
            }
        }

        if !matched_any && !disruption.impacted_routes.is_empty() {
            tracing::warn!(
                disruption_id = disruption.id,
                routes = ?disruption.impacted_routes,
                "No impacted route matches a known topic; publishing to the global topic only"
            );
        }

        topics
    }
}
