//! Media server connection settings

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::MediaError;

/// Default media server URL
pub const DEFAULT_KURENTO_URL: &str = "ws://localhost:8888/kurento";

/// Default time to wait for a media server response
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default interval between keepalive pings
pub const DEFAULT_KEEPALIVE_INTERVAL_MS: u64 = 240_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KurentoConfig {
    /// WebSocket URL of the media server
    pub url: String,
    /// Time to wait for each response, in milliseconds
    pub request_timeout_ms: u64,
    /// Interval between keepalive pings, in milliseconds
    pub keepalive_interval_ms: u64,
}

impl Default for KurentoConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_KURENTO_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            keepalive_interval_ms: DEFAULT_KEEPALIVE_INTERVAL_MS,
        }
    }
}

impl KurentoConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// Check the URL scheme and that both intervals are non-zero
    pub fn validate(&self) -> Result<(), MediaError> {
        let url = Url::parse(&self.url)
            .map_err(|e| MediaError::Config(format!("invalid url '{}': {}", self.url, e)))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(MediaError::Config(format!(
                "url '{}' must use ws:// or wss://",
                self.url
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(MediaError::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.keepalive_interval_ms == 0 {
            return Err(MediaError::Config(
                "keepalive_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_media_server() {
        let config = KurentoConfig::default();
        assert_eq!(config.url, "ws://localhost:8888/kurento");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn secure_websocket_is_accepted() {
        assert!(KurentoConfig::new("wss://kms.example.com:8433/kurento")
            .validate()
            .is_ok());
    }

    #[test]
    fn http_scheme_is_rejected() {
        let result = KurentoConfig::new("http://localhost:8888/kurento").validate();
        assert!(matches!(result, Err(MediaError::Config(msg)) if msg.contains("ws://")));
    }

    #[test]
    fn garbage_url_is_rejected() {
        assert!(KurentoConfig::new("not a url").validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = KurentoConfig {
            request_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
