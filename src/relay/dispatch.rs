use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::Disruption;

use super::TopicPublisher;

/// Fixed notification title for every disruption push.
const NOTIFICATION_TITLE: &str = "Metro Status Update";

/// Android status-bar icon shipped with the client apps.
const ANDROID_ICON: &str = "ic_stat_metro";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Publish rejected: {0}")]
    Rejected(String),
}

/// One push message, as handed to the push backend. The backend adapter adds
/// its own addressing (topic or token).
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub notification: NotificationBlock,
    pub data: DataBlock,
    pub android: AndroidBlock,
    pub apns: ApnsBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationBlock {
    pub title: String,
    pub body: String,
}

/// Data payload delivered to the client. All values are strings, per the
/// push backend's data-message rules. `disruptionId` is what the client uses
/// to navigate to the detail view.
#[derive(Debug, Clone, Serialize)]
pub struct DataBlock {
    #[serde(rename = "disruptionId")]
    pub disruption_id: String,
    #[serde(rename = "priorityLevel")]
    pub priority_level: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AndroidBlock {
    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, Serialize)]
pub struct AndroidNotification {
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApnsBlock {
    pub payload: ApnsPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApnsPayload {
    pub aps: ApsBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApsBlock {
    pub sound: String,
}

/// Build the push message for one disruption.
pub fn build_message(disruption: &Disruption) -> PushMessage {
    PushMessage {
        notification: NotificationBlock {
            title: NOTIFICATION_TITLE.to_string(),
            body: disruption.title.clone(),
        },
        data: DataBlock {
            disruption_id: disruption.id.to_string(),
            priority_level: disruption.priority_level.as_str().to_string(),
            title: disruption.title.clone(),
            content: disruption.content.clone(),
            created_at: disruption.created_at.clone(),
        },
        android: AndroidBlock {
            notification: AndroidNotification {
                icon: ANDROID_ICON.to_string(),
                color: disruption.priority_level.accent_color().to_string(),
            },
        },
        apns: ApnsBlock {
            payload: ApnsPayload {
                aps: ApsBlock {
                    sound: "default".to_string(),
                },
            },
        },
    }
}

/// Outcome of one per-topic publish attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopicDispatch {
    pub topic: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-disruption dispatch record: one entry per resolved topic.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DispatchReport {
    pub disruption_id: i64,
    pub title: String,
    pub topics: Vec<TopicDispatch>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.topics.iter().filter(|t| t.success).count()
    }

    pub fn failed(&self) -> usize {
        self.topics.iter().filter(|t| !t.success).count()
    }
}

/// Publish one disruption to every resolved topic.
///
/// Each per-topic publish is independent: a failure is recorded in the
/// report and the remaining topics are still attempted. The publishes run
/// concurrently; the future resolves once every topic has been attempted.
pub async fn dispatch_disruption<P: TopicPublisher>(
    publisher: &P,
    disruption: &Disruption,
    topics: &BTreeSet<String>,
) -> DispatchReport {
    let message = build_message(disruption);

    let attempts = topics.iter().map(|topic| {
        let message = &message;
        async move {
            match publisher.publish(topic, message).await {
                Ok(message_id) => TopicDispatch {
                    topic: topic.clone(),
                    success: true,
                    message_id,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(
                        disruption_id = disruption.id,
                        topic = %topic,
                        error = %e,
                        "Failed to publish notification"
                    );
                    TopicDispatch {
                        topic: topic.clone(),
                        success: false,
                        message_id: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        }
    });

    DispatchReport {
        disruption_id: disruption.id,
        title: disruption.title.clone(),
        topics: futures::future::join_all(attempts).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriorityLevel;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    fn disruption() -> Disruption {
        Disruption {
            id: 9,
            created_at: "2025-03-24T08:00:00Z".to_string(),
            title: "Line suspended".to_string(),
            content: "No service between Pelaw and South Shields.".to_string(),
            important: true,
            version: 1,
            order: 1,
            topics: String::new(),
            additional_info_title: None,
            additional_info_url: None,
            guid: String::new(),
            active: true,
            all_routes: false,
            all_stations: false,
            impacted_stations: Vec::new(),
            impacted_routes: vec!["yellow_line".to_string()],
            impacted_facilities: Vec::new(),
            priority_level: PriorityLevel::ServiceSuspension,
        }
    }

    struct FakePublisher {
        published: Mutex<Vec<String>>,
        fail_topics: HashSet<String>,
    }

    impl FakePublisher {
        fn new(fail_topics: &[&str]) -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                fail_topics: fail_topics.iter().map(|t| t.to_string()).collect(),
            }
        }
    }

    #[async_trait::async_trait]
    impl TopicPublisher for FakePublisher {
        async fn publish(
            &self,
            topic: &str,
            _message: &PushMessage,
        ) -> Result<Option<String>, PublishError> {
            self.published.lock().await.push(topic.to_string());
            if self.fail_topics.contains(topic) {
                Err(PublishError::Rejected(format!("refused {}", topic)))
            } else {
                Ok(Some("msg-1".to_string()))
            }
        }
    }

    fn topic_set(topics: &[&str]) -> BTreeSet<String> {
        topics.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn message_carries_notification_and_data_blocks() {
        let message = build_message(&disruption());
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["notification"]["title"], "Metro Status Update");
        assert_eq!(value["notification"]["body"], "Line suspended");
        assert_eq!(value["data"]["disruptionId"], "9");
        assert_eq!(value["data"]["priorityLevel"], "service_suspension");
        assert_eq!(value["data"]["createdAt"], "2025-03-24T08:00:00Z");
        assert_eq!(value["android"]["notification"]["color"], "#FF0000");
        assert_eq!(value["apns"]["payload"]["aps"]["sound"], "default");
    }

    #[tokio::test]
    async fn every_topic_receives_one_publish() {
        let publisher = FakePublisher::new(&[]);
        let topics = topic_set(&["metro_disruptions", "yellow_line"]);

        let report = dispatch_disruption(&publisher, &disruption(), &topics).await;

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 0);
        let mut published = publisher.published.lock().await.clone();
        published.sort();
        assert_eq!(published, vec!["metro_disruptions", "yellow_line"]);
    }

    #[tokio::test]
    async fn failed_topic_does_not_block_the_others() {
        let publisher = FakePublisher::new(&["green_line"]);
        let topics = topic_set(&["green_line", "metro_disruptions"]);

        let report = dispatch_disruption(&publisher, &disruption(), &topics).await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(publisher.published.lock().await.len(), 2);

        let failed: Vec<_> = report.topics.iter().filter(|t| !t.success).collect();
        assert_eq!(failed[0].topic, "green_line");
        assert!(failed[0].error.as_deref().unwrap().contains("refused"));
    }
}
