use reqwest::Client;
use std::time::Duration;

use crate::config::FeedConfig;
use crate::models::{Disruption, PriorityLevel};
use crate::relay::{DisruptionSource, FetchError};

/// Client for the upstream disruption feed.
///
/// Issues a single GET per cycle against the active-disruptions endpoint with
/// the configured feed-side filters. Retry policy lives in the scheduler; a
/// failed fetch simply ends the cycle.
pub struct FeedClient {
    client: Client,
    url: String,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| FetchError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: Self::build_url(config),
        })
    }

    /// Build the feed URL once; the query is fixed for the process lifetime.
    fn build_url(config: &FeedConfig) -> String {
        let priority_levels: Vec<&str> =
            PriorityLevel::ALL.iter().map(|p| p.as_str()).collect();

        format!(
            "{}?facilities={}&routes={}&stations={}&priority_levels={}",
            config.base_url,
            urlencoding::encode(&config.facilities.join(",")),
            urlencoding::encode(&config.routes.join(",")),
            urlencoding::encode(&config.stations.join(",")),
            urlencoding::encode(&priority_levels.join(",")),
        )
    }

    async fn fetch(&self) -> Result<Vec<Disruption>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ApiError(format!("HTTP error: {}", status.as_u16())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(
                "Failed to parse disruption feed response: {} - body: {}",
                e,
                &body[..body.len().min(500)]
            );
            FetchError::ParseError(e.to_string())
        })
    }
}

#[async_trait::async_trait]
impl DisruptionSource for FeedClient {
    async fn fetch_active(&self) -> Result<Vec<Disruption>, FetchError> {
        self.fetch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_all_feed_filters() {
        let config = FeedConfig {
            base_url: "https://feed.example/disruption/active/".to_string(),
            facilities: vec!["lift".to_string(), "escalator".to_string()],
            routes: vec!["green_line".to_string(), "yellow_line".to_string()],
            stations: vec!["monument".to_string()],
            ..FeedConfig::default()
        };

        let url = FeedClient::build_url(&config);
        assert!(url.starts_with("https://feed.example/disruption/active/?"));
        assert!(url.contains("facilities=lift%2Cescalator"));
        assert!(url.contains("routes=green_line%2Cyellow_line"));
        assert!(url.contains("stations=monument"));
        assert!(url.contains("priority_levels="));
        assert!(url.contains("for_information_only"));
    }
}
