//! Configuration for OTA index sources and HTTP behaviour

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OtaError, Result};

/// Main upgrade index of the Koenkk/zigbee-OTA repository.
pub const DEFAULT_INDEX_URL: &str =
    "https://raw.githubusercontent.com/Koenkk/zigbee-OTA/master/index.json";

/// Downgrade index (previous versions, archived automatically).
pub const DEFAULT_DOWNGRADE_INDEX_URL: &str =
    "https://raw.githubusercontent.com/Koenkk/zigbee-OTA/master/index1.json";

/// Default staleness window for both indexes.
pub const DEFAULT_INDEX_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Configuration for index URLs, cache lifetimes and the HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtaSourceConfig {
    /// URL of the primary (upgrade) index
    pub index_url: String,

    /// URL of the downgrade index
    pub downgrade_index_url: String,

    /// How long a fetched primary index stays fresh
    #[serde(with = "duration_secs")]
    pub index_ttl: Duration,

    /// How long a fetched downgrade index stays fresh
    #[serde(with = "duration_secs")]
    pub downgrade_index_ttl: Duration,

    /// Per-request timeout for index and image downloads
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for OtaSourceConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            downgrade_index_url: DEFAULT_DOWNGRADE_INDEX_URL.to_string(),
            index_ttl: DEFAULT_INDEX_TTL,
            downgrade_index_ttl: DEFAULT_INDEX_TTL,
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("zigbee-ota-update/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl OtaSourceConfig {
    /// Create a configuration with the specified primary index URL
    pub fn new(index_url: impl Into<String>) -> Self {
        Self {
            index_url: index_url.into(),
            ..Default::default()
        }
    }

    /// Set the downgrade index URL
    pub fn with_downgrade_index_url(mut self, url: impl Into<String>) -> Self {
        self.downgrade_index_url = url.into();
        self
    }

    /// Set the primary index TTL
    pub fn with_index_ttl(mut self, ttl: Duration) -> Self {
        self.index_ttl = ttl;
        self
    }

    /// Set the downgrade index TTL
    pub fn with_downgrade_index_ttl(mut self, ttl: Duration) -> Self {
        self.downgrade_index_ttl = ttl;
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Parse a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Config`] if the JSON is malformed or the result
    /// fails [`OtaSourceConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OtaError::config(format!("invalid OTA source config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both index URLs are absolute http(s) URLs.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        validate_url("index_url", &self.index_url)?;
        validate_url("downgrade_index_url", &self.downgrade_index_url)?;
        if self.request_timeout.is_zero() {
            return Err(OtaError::config("request_timeout must be non-zero"));
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| OtaError::config(format!("{field} is not a valid URL ({value}): {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(OtaError::config(format!(
            "{field} must use http or https, got '{other}'"
        ))),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> Result<()> {
        let config = OtaSourceConfig::default();
        assert_eq!(config.index_url, DEFAULT_INDEX_URL);
        assert_eq!(config.downgrade_index_url, DEFAULT_DOWNGRADE_INDEX_URL);
        assert_eq!(config.index_ttl, Duration::from_secs(21_600));
        assert_eq!(config.downgrade_index_ttl, Duration::from_secs(21_600));
        assert!(config.user_agent.starts_with("zigbee-ota-update/"));
        config.validate()
    }

    #[test]
    fn test_config_builder() {
        let config = OtaSourceConfig::new("http://localhost:8080/index.json")
            .with_downgrade_index_url("http://localhost:8080/index1.json")
            .with_index_ttl(Duration::from_secs(60))
            .with_downgrade_index_ttl(Duration::from_secs(120))
            .with_request_timeout(Duration::from_secs(5))
            .with_user_agent("fleet-test");

        assert_eq!(config.index_url, "http://localhost:8080/index.json");
        assert_eq!(config.downgrade_index_url, "http://localhost:8080/index1.json");
        assert_eq!(config.index_ttl, Duration::from_secs(60));
        assert_eq!(config.downgrade_index_ttl, Duration::from_secs(120));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "fleet-test");
    }

    #[test]
    fn test_partial_json_uses_defaults() -> Result<()> {
        let config = OtaSourceConfig::from_json_str(
            r#"{"index_url": "https://mirror.example/index.json", "index_ttl": 600}"#,
        )?;
        assert_eq!(config.index_url, "https://mirror.example/index.json");
        assert_eq!(config.index_ttl, Duration::from_secs(600));
        assert_eq!(config.downgrade_index_url, DEFAULT_DOWNGRADE_INDEX_URL);
        Ok(())
    }

    #[test]
    fn test_json_roundtrip_keeps_seconds() -> std::result::Result<(), serde_json::Error> {
        let config = OtaSourceConfig::default().with_index_ttl(Duration::from_secs(42));
        let json = serde_json::to_string(&config)?;
        assert!(json.contains("\"index_ttl\":42"));
        let restored: OtaSourceConfig = serde_json::from_str(&json)?;
        assert_eq!(restored, config);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let relative = OtaSourceConfig::new("index.json").validate();
        assert!(matches!(relative, Err(OtaError::Config(msg)) if msg.contains("index_url")));

        let ftp = OtaSourceConfig::default()
            .with_downgrade_index_url("ftp://example.com/index1.json")
            .validate();
        assert!(matches!(ftp, Err(OtaError::Config(msg)) if msg.contains("downgrade_index_url")));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let result = OtaSourceConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate();
        assert!(matches!(result, Err(OtaError::Config(_))));
    }
}
