use crate::models::Disruption;

use super::store::Snapshot;

/// Newly-appeared, notification-worthy disruptions since the previous
/// snapshot.
///
/// Informational disruptions never appear in the result, and disruptions
/// that left the feed are not reported. Callers must seed the store with a
/// fetch-only pass before the first diff; against a never-committed snapshot
/// this would report the entire feed as new.
pub fn detect_new(previous: &Snapshot, current: &[Disruption]) -> Vec<Disruption> {
    let previous_worthy = previous.notification_worthy_ids();

    current
        .iter()
        .filter(|d| d.is_notification_worthy())
        .filter(|d| !previous_worthy.contains(&d.id))
        .cloned()
        .collect()
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

    #[test]
    fn reports_only_newly_appeared_ids() {
        let previous =
            Snapshot::from_disruptions(vec![disruption(1, PriorityLevel::ServiceDisruption)]);
        let current = vec![
            disruption(1, PriorityLevel::ServiceDisruption),
            disruption(2, PriorityLevel::StationClosure),
        ];

        let new = detect_new(&previous, &current);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, 2);
    }

    #[test]
    fn informational_disruptions_are_never_reported() {
        let previous =
            Snapshot::from_disruptions(vec![disruption(1, PriorityLevel::ServiceDisruption)]);
        let current = vec![
            disruption(1, PriorityLevel::ServiceDisruption),
            disruption(3, PriorityLevel::ForInformationOnly),
        ];

        assert!(detect_new(&previous, &current).is_empty());
    }

    #[test]
    fn unchanged_state_yields_empty_diff() {
        let current = vec![
            disruption(1, PriorityLevel::ServiceDisruption),
            disruption(2, PriorityLevel::ImprovementWorks),
        ];
        let previous = Snapshot::from_disruptions(current.clone());

        assert!(detect_new(&previous, &current).is_empty());
    }

    #[test]
    fn removed_disruptions_are_not_reported() {
        let previous = Snapshot::from_disruptions(vec![
            disruption(1, PriorityLevel::ServiceDisruption),
            disruption(2, PriorityLevel::StationClosure),
        ]);
        let current = vec![disruption(1, PriorityLevel::ServiceDisruption)];

        assert!(detect_new(&previous, &current).is_empty());
    }

    #[test]
    fn previously_informational_id_counts_as_new_when_upgraded() {
        // A disruption that was stored as informational and later escalates
        // was never in the worthy set, so it is reported.
        let previous =
            Snapshot::from_disruptions(vec![disruption(4, PriorityLevel::ForInformationOnly)]);
        let current = vec![disruption(4, PriorityLevel::ServiceSuspension)];

        let new = detect_new(&previous, &current);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, 4);
    }
}
