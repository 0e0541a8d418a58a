use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Severity/category of a disruption. Drives both notification-worthiness
/// and topic routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    ServiceSuspension,
    ServiceDisruption,
    StationClosure,
    FacilitiesOutOfUse,
    ImprovementWorks,
    ForInformationOnly,
    /// Used when the feed reports a level this build does not know
    #[serde(other)]
    Other,
}

impl PriorityLevel {
    /// All levels the feed is queried for.
    pub const ALL: [PriorityLevel; 7] = [
        PriorityLevel::ServiceSuspension,
        PriorityLevel::ServiceDisruption,
        PriorityLevel::StationClosure,
        PriorityLevel::FacilitiesOutOfUse,
        PriorityLevel::ImprovementWorks,
        PriorityLevel::ForInformationOnly,
        PriorityLevel::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::ServiceSuspension => "service_suspension",
            PriorityLevel::ServiceDisruption => "service_disruption",
            PriorityLevel::StationClosure => "station_closure",
            PriorityLevel::FacilitiesOutOfUse => "facilities_out_of_use",
            PriorityLevel::ImprovementWorks => "improvement_works",
            PriorityLevel::ForInformationOnly => "for_information_only",
            PriorityLevel::Other => "other",
        }
    }

    /// Accent color carried in the Android notification block.
    pub fn accent_color(&self) -> &'static str {
        match self {
            PriorityLevel::ServiceSuspension => "#FF0000",
            PriorityLevel::ServiceDisruption => "#FFA500",
            PriorityLevel::StationClosure => "#FF0000",
            PriorityLevel::FacilitiesOutOfUse => "#FFFF00",
            PriorityLevel::ImprovementWorks => "#0000FF",
            PriorityLevel::ForInformationOnly => "#00FF00",
            PriorityLevel::Other => "#808080",
        }
    }
}

/// One active service event reported by the upstream feed.
///
/// Wire format is snake_case JSON. `id` is assigned by the feed and is the
/// sole diffing key; a disruption that is removed and re-added under a new id
/// is two distinct events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Disruption {
    pub id: i64,
    /// Server-assigned creation timestamp (ISO 8601)
    pub created_at: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub version: i64,
    /// Display-priority hint. Not relevant to dispatch logic.
    pub order: i64,
    #[serde(default)]
    pub topics: String,
    #[serde(default)]
    pub additional_info_title: Option<String>,
    #[serde(default)]
    pub additional_info_url: Option<String>,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub active: bool,
    /// When true, impacted_routes is considered exhaustive regardless of its
    /// literal contents.
    #[serde(default)]
    pub all_routes: bool,
    /// When true, impacted_stations is considered exhaustive regardless of
    /// its literal contents.
    #[serde(default)]
    pub all_stations: bool,
    #[serde(default)]
    pub impacted_stations: Vec<String>,
    #[serde(default)]
    pub impacted_routes: Vec<String>,
    #[serde(default)]
    pub impacted_facilities: Vec<String>,
    pub priority_level: PriorityLevel,
}

impl Disruption {
    /// Whether this disruption should ever trigger a push. Informational
    /// disruptions are fetched and stored but never dispatched.
    pub fn is_notification_worthy(&self) -> bool {
        self.priority_level != PriorityLevel::ForInformationOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "id": 42,
            "created_at": "2025-03-24T08:15:00Z",
            "title": "Trains running at reduced frequency",
            "content": "Due to a points failure at Pelaw, trains are running at a reduced frequency.",
            "important": true,
            "version": 3,
            "order": 1,
            "topics": "",
            "additional_info_title": null,
            "additional_info_url": null,
            "guid": "d5f0a7c2",
            "active": true,
            "all_routes": false,
            "all_stations": false,
            "impacted_stations": ["pelaw", "heworth"],
            "impacted_routes": ["yellow_line"],
            "impacted_facilities": ["train_service"],
            "priority_level": "service_disruption"
        }"#
    }

    #[test]
    fn decodes_wire_format() {
        let d: Disruption = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(d.id, 42);
        assert_eq!(d.priority_level, PriorityLevel::ServiceDisruption);
        assert_eq!(d.impacted_routes, vec!["yellow_line"]);
        assert!(!d.all_routes);
        assert!(d.is_notification_worthy());
    }

    #[test]
    fn unknown_priority_level_decodes_as_other() {
        let json = sample_json().replace("service_disruption", "weather_advisory");
        let d: Disruption = serde_json::from_str(&json).unwrap();
        assert_eq!(d.priority_level, PriorityLevel::Other);
        assert!(d.is_notification_worthy());
    }

    #[test]
    fn informational_is_not_notification_worthy() {
        let json = sample_json().replace("service_disruption", "for_information_only");
        let d: Disruption = serde_json::from_str(&json).unwrap();
        assert!(!d.is_notification_worthy());
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let json = r#"{
            "id": 7,
            "created_at": "2025-03-24T08:15:00Z",
            "title": "Lift out of use",
            "content": "The lift at Monument is out of use.",
            "order": 5,
            "priority_level": "facilities_out_of_use"
        }"#;
        let d: Disruption = serde_json::from_str(json).unwrap();
        assert!(d.impacted_routes.is_empty());
        assert!(!d.all_routes);
        assert_eq!(d.priority_level.as_str(), "facilities_out_of_use");
    }
}
