use reqwest::Client;
use std::time::Duration;

use crate::config::PushConfig;
use crate::relay::{PublishError, PushMessage, TopicPublisher};

/// FCM adapter for topic publishes, direct test sends, and topic
/// subscription of registered device tokens.
///
/// Uses the legacy HTTP send endpoint with server-key authorization; both
/// endpoints are configurable so tests and staging can point elsewhere.
pub struct FcmClient {
    client: Client,
    send_endpoint: String,
    subscribe_endpoint: String,
    server_key: String,
}

impl FcmClient {
    pub fn new(config: &PushConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                PublishError::NetworkError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            send_endpoint: config.send_endpoint.clone(),
            subscribe_endpoint: config.subscribe_endpoint.clone(),
            server_key: config.server_key.clone(),
        })
    }

    /// POST a message body to the send endpoint and extract the message id.
    async fn send(&self, body: serde_json::Value) -> Result<Option<String>, PublishError> {
        let response = self
            .client
            .post(&self.send_endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                &body[..body.len().min(200)]
            )));
        }

        // The send endpoint reports a numeric message_id on success. Missing
        // or unparseable bodies are not an error; the publish went through.
        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| {
                v.get("message_id").map(|id| match id {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            });

        Ok(message_id)
    }

    /// Send a direct test notification to a single device token.
    pub async fn send_to_token(
        &self,
        token: &str,
        title: &str,
        body: &str,
    ) -> Result<Option<String>, PublishError> {
        let payload = serde_json::json!({
            "to": token,
            "notification": {
                "title": title,
                "body": body,
            },
        });
        self.send(payload).await
    }

    /// Subscribe a device token to a topic via the instance-id API.
    pub async fn subscribe_token(&self, token: &str, topic: &str) -> Result<(), PublishError> {
        let url = format!(
            "{}/iid/v1/{}/rel/topics/{}",
            self.subscribe_endpoint,
            urlencoding::encode(token),
            urlencoding::encode(topic)
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("key={}", self.server_key))
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| PublishError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected(format!(
                "HTTP {} subscribing to {}",
                status.as_u16(),
                topic
            )));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl TopicPublisher for FcmClient {
    async fn publish(
        &self,
        topic: &str,
        message: &PushMessage,
    ) -> Result<Option<String>, PublishError> {
        let mut body = serde_json::to_value(message)
            .map_err(|e| PublishError::NetworkError(format!("Failed to encode message: {}", e)))?;

        if let serde_json::Value::Object(ref mut fields) = body {
            fields.insert(
                "to".to_string(),
                serde_json::Value::String(format!("/topics/{}", topic)),
            );
        }

        self.send(body).await
    }
}
