use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Disruption feed polling configuration
    pub feed: FeedConfig,
    /// Push backend (FCM) configuration
    pub push: PushConfig,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
}

/// Configuration for the upstream disruption feed poll
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Feed endpoint serving the active disruption set
    #[serde(default = "FeedConfig::default_base_url")]
    pub base_url: String,
    /// Interval in seconds between check cycles (default: 900, i.e. 15 minutes)
    #[serde(default = "FeedConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// Overall request timeout in seconds (default: 30)
    #[serde(default = "FeedConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds (default: 10)
    #[serde(default = "FeedConfig::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Route identifiers to filter the feed by. Also the set of known
    /// per-route notification topics.
    #[serde(default = "FeedConfig::default_routes")]
    pub routes: Vec<String>,
    /// Facility identifiers to filter the feed by (feed-side filter only)
    #[serde(default)]
    pub facilities: Vec<String>,
    /// Station identifiers to filter the feed by (feed-side filter only)
    #[serde(default)]
    pub stations: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            interval_secs: Self::default_interval_secs(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
            routes: Self::default_routes(),
            facilities: Vec::new(),
            stations: Vec::new(),
        }
    }
}

impl FeedConfig {
    fn default_base_url() -> String {
        "https://ken.nebulalabs.cc/disruption/active/".to_string()
    }
    fn default_interval_secs() -> u64 {
        900
    }
    fn default_request_timeout_secs() -> u64 {
        30
    }
    fn default_connect_timeout_secs() -> u64 {
        10
    }
    fn default_routes() -> Vec<String> {
        vec!["green_line".to_string(), "yellow_line".to_string()]
    }

    /// Warn about configurations that are valid but probably unintended.
    pub fn validate(&self) {
        if self.interval_secs < 60 {
            tracing::warn!(
                interval_secs = self.interval_secs,
                "Feed poll interval is under a minute; the upstream feed is polled politely at 15 minutes"
            );
        }
        if self.routes.is_empty() {
            tracing::warn!("No routes configured; only the global topic will ever be resolved");
        }
    }
}

/// Configuration for the FCM push backend
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// FCM legacy send endpoint
    #[serde(default = "PushConfig::default_send_endpoint")]
    pub send_endpoint: String,
    /// FCM instance-id endpoint for topic subscription
    #[serde(default = "PushConfig::default_subscribe_endpoint")]
    pub subscribe_endpoint: String,
    /// FCM server key used for Authorization
    pub server_key: String,
    /// Per-publish request timeout in seconds (default: 10)
    #[serde(default = "PushConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl PushConfig {
    fn default_send_endpoint() -> String {
        "https://fcm.googleapis.com/fcm/send".to_string()
    }
    fn default_subscribe_endpoint() -> String {
        "https://iid.googleapis.com".to_string()
    }
    fn default_request_timeout_secs() -> u64 {
        10
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let yaml = r#"
feed: {}
push:
  server_key: "test-key"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.feed.interval_secs, 900);
        assert_eq!(config.feed.routes, vec!["green_line", "yellow_line"]);
        assert_eq!(config.push.send_endpoint, "https://fcm.googleapis.com/fcm/send");
        assert!(!config.cors_permissive);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let yaml = r#"
feed:
  interval_secs: 60
  routes: [green_line]
push:
  server_key: "k"
  request_timeout_secs: 5
cors_permissive: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.feed.interval_secs, 60);
        assert_eq!(config.feed.routes, vec!["green_line"]);
        assert_eq!(config.push.request_timeout_secs, 5);
        assert!(config.cors_permissive);
    }
}
