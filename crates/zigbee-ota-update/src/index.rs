//! TTL cache for the remote OTA indexes
//!
//! Holds the primary (upgrade) and downgrade index as shared, immutable
//! record lists. A successful fetch replaces the whole list; a failed fetch
//! leaves whatever was cached before untouched.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::OtaSourceConfig;
use crate::error::{ParseError, Result};
use crate::record::FirmwareImageRecord;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Shared, immutable snapshot of an index
pub type IndexSnapshot = Arc<Vec<FirmwareImageRecord>>;

/// Cached payload with the time it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Cached value
    pub payload: T,
    /// When the value was fetched
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Wrap a freshly fetched payload.
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            fetched_at: Instant::now(),
        }
    }

    /// Time since the payload was fetched.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }

    /// An entry is stale once its age reaches `ttl`.
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexKind {
    Primary,
    Downgrade,
}

impl IndexKind {
    fn label(self) -> &'static str {
        match self {
            IndexKind::Primary => "OTA index",
            IndexKind::Downgrade => "downgrade OTA index",
        }
    }
}

/// Fetches and caches the primary and downgrade OTA indexes
pub struct IndexCache {
    config: OtaSourceConfig,
    transport: Arc<dyn HttpTransport>,
    primary: RwLock<Option<CacheEntry<IndexSnapshot>>>,
    downgrade: RwLock<Option<CacheEntry<IndexSnapshot>>>,
}

impl IndexCache {
    /// Create a cache that fetches through `transport`.
    pub fn new(config: OtaSourceConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            primary: RwLock::new(None),
            downgrade: RwLock::new(None),
        }
    }

    /// Create a cache with a `reqwest` transport built from `config`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the HTTP client cannot be built.
    pub fn with_reqwest(config: OtaSourceConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Get the current configuration
    pub fn config(&self) -> &OtaSourceConfig {
        &self.config
    }

    /// Return the primary index, fetching it if absent, stale, or forced.
    ///
    /// # Errors
    ///
    /// Returns a network error on transport failure or non-2xx status and a
    /// parse error on malformed JSON. The previous cache is kept on failure.
    pub async fn fetch_index(&self, force_refresh: bool) -> Result<IndexSnapshot> {
        self.fetch(IndexKind::Primary, force_refresh).await
    }

    /// Return the downgrade index, or an empty list if it cannot be fetched.
    pub async fn fetch_downgrade_index(&self, force_refresh: bool) -> IndexSnapshot {
        match self.fetch(IndexKind::Downgrade, force_refresh).await {
            Ok(index) => index,
            Err(e) => {
                warn!("Failed to fetch downgrade OTA index: {}", e);
                Arc::new(Vec::new())
            }
        }
    }

    /// Drop both cached indexes and their timestamps.
    pub fn clear_cache(&self) {
        *self.primary.write() = None;
        *self.downgrade.write() = None;
        info!("OTA index cache cleared");
    }

    /// Age of the cached primary index, if any.
    pub fn primary_cache_age(&self) -> Option<Duration> {
        self.primary.read().as_ref().map(CacheEntry::age)
    }

    /// Age of the cached downgrade index, if any.
    pub fn downgrade_cache_age(&self) -> Option<Duration> {
        self.downgrade.read().as_ref().map(CacheEntry::age)
    }

    fn slot(&self, kind: IndexKind) -> &RwLock<Option<CacheEntry<IndexSnapshot>>> {
        match kind {
            IndexKind::Primary => &self.primary,
            IndexKind::Downgrade => &self.downgrade,
        }
    }

    fn url(&self, kind: IndexKind) -> &str {
        match kind {
            IndexKind::Primary => &self.config.index_url,
            IndexKind::Downgrade => &self.config.downgrade_index_url,
        }
    }

    fn ttl(&self, kind: IndexKind) -> Duration {
        match kind {
            IndexKind::Primary => self.config.index_ttl,
            IndexKind::Downgrade => self.config.downgrade_index_ttl,
        }
    }

    fn cached(&self, kind: IndexKind) -> Option<IndexSnapshot> {
        let slot = self.slot(kind).read();
        slot.as_ref()
            .filter(|entry| !entry.is_stale(self.ttl(kind)))
            .map(|entry| Arc::clone(&entry.payload))
    }

    async fn fetch(&self, kind: IndexKind, force_refresh: bool) -> Result<IndexSnapshot> {
        if !force_refresh && let Some(index) = self.cached(kind) {
            debug!("Using cached {} ({} images)", kind.label(), index.len());
            return Ok(index);
        }

        let url = self.url(kind);
        info!("Fetching {} from: {}", kind.label(), url);

        let body = self.transport.get(url).await?;
        let records: Vec<FirmwareImageRecord> =
            serde_json::from_slice(&body).map_err(|source| ParseError {
                url: url.to_string(),
                source,
            })?;

        let index = Arc::new(records);
        *self.slot(kind).write() = Some(CacheEntry::new(Arc::clone(&index)));

        info!("{} loaded: {} images available", kind.label(), index.len());
        Ok(index)
    }
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("config", &self.config)
            .field("primary_cache_age", &self.primary_cache_age())
            .field("downgrade_cache_age", &self.downgrade_cache_age())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, OtaError};
    use crate::test_support::{ScriptedTransport, body};

    const DEFAULT_TTL: Duration = crate::config::DEFAULT_INDEX_TTL;

    const ONE_RECORD: &str = r#"[{"manufacturerCode":4417,"imageType":10,"fileVersion":5,"fileSize":100,"url":"https://example.com/a.ota","fileName":"a.ota"}]"#;
    const TWO_RECORDS: &str = r#"[
        {"manufacturerCode":4417,"imageType":10,"fileVersion":5,"fileSize":100,"url":"https://example.com/a.ota","fileName":"a.ota"},
        {"manufacturerCode":4447,"imageType":195,"fileVersion":9,"fileSize":100,"url":"https://example.com/b.ota","fileName":"b.ota"}
    ]"#;

    fn status_error(status: u16) -> NetworkError {
        NetworkError::Status {
            url: "https://example.com/index.json".to_string(),
            status,
        }
    }

    fn cache_with(transport: Arc<ScriptedTransport>) -> IndexCache {
        IndexCache::new(OtaSourceConfig::default(), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_fetch_within_ttl_uses_cache() -> Result<()> {
        let transport = ScriptedTransport::new(vec![body(ONE_RECORD)]);
        let cache = cache_with(Arc::clone(&transport));

        let first = cache.fetch_index(false).await?;
        let second = cache.fetch_index(false).await?;

        assert_eq!(transport.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_refresh_always_fetches() -> Result<()> {
        let transport = ScriptedTransport::new(vec![body(ONE_RECORD), body(TWO_RECORDS)]);
        let cache = cache_with(Arc::clone(&transport));

        cache.fetch_index(false).await?;
        let refreshed = cache.fetch_index(true).await?;

        assert_eq!(transport.calls(), 2);
        assert_eq!(refreshed.len(), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_goes_stale_exactly_at_ttl() -> Result<()> {
        let transport = ScriptedTransport::new(vec![body(ONE_RECORD), body(TWO_RECORDS)]);
        let cache = cache_with(Arc::clone(&transport));

        cache.fetch_index(false).await?;
        tokio::time::advance(DEFAULT_TTL - Duration::from_secs(1)).await;
        assert_eq!(cache.fetch_index(false).await?.len(), 1);
        assert_eq!(transport.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.fetch_index(false).await?.len(), 2);
        assert_eq!(transport.calls(), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_forced_refresh_restarts_ttl() -> Result<()> {
        let transport = ScriptedTransport::new(vec![body(ONE_RECORD), body(TWO_RECORDS)]);
        let cache = cache_with(Arc::clone(&transport));

        cache.fetch_index(false).await?;
        tokio::time::advance(Duration::from_secs(5 * 60 * 60)).await;
        cache.fetch_index(true).await?;
        assert_eq!(cache.primary_cache_age(), Some(Duration::ZERO));

        tokio::time::advance(Duration::from_secs(60 * 60 + 1)).await;
        let cached = cache.fetch_index(false).await?;

        assert_eq!(cached.len(), 2);
        assert_eq!(transport.calls(), 2);
        assert_eq!(
            cache.primary_cache_age(),
            Some(Duration::from_secs(60 * 60 + 1))
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_cache() -> Result<()> {
        let transport = ScriptedTransport::new(vec![body(ONE_RECORD), Err(status_error(500))]);
        let cache = cache_with(Arc::clone(&transport));

        cache.fetch_index(false).await?;
        let age_before = cache.primary_cache_age();

        let result = cache.fetch_index(true).await;
        assert!(matches!(
            result,
            Err(OtaError::Network(NetworkError::Status { status: 500, .. }))
        ));
        assert_eq!(cache.primary_cache_age(), age_before);

        let cached = cache.fetch_index(false).await?;
        assert_eq!(cached.len(), 1);
        assert_eq!(transport.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let transport = ScriptedTransport::new(vec![body(r#"{"not": "an array"}"#)]);
        let cache = cache_with(transport);

        let result = cache.fetch_index(false).await;
        assert!(matches!(
            result,
            Err(OtaError::Parse(ParseError { url, .. })) if url.ends_with("index.json")
        ));
        assert_eq!(cache.primary_cache_age(), None);
    }

    #[tokio::test]
    async fn test_downgrade_failure_returns_empty() {
        let transport = ScriptedTransport::new(vec![Err(status_error(404))]);
        let cache = cache_with(Arc::clone(&transport));

        let index = cache.fetch_downgrade_index(false).await;
        assert!(index.is_empty());
        assert_eq!(cache.downgrade_cache_age(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_downgrade_cache_is_separate() -> Result<()> {
        let transport = ScriptedTransport::new(vec![body(ONE_RECORD), body(TWO_RECORDS)]);
        let cache = cache_with(Arc::clone(&transport));

        let primary = cache.fetch_index(false).await?;
        let downgrade = cache.fetch_downgrade_index(false).await;
        let downgrade_again = cache.fetch_downgrade_index(false).await;

        assert_eq!(primary.len(), 1);
        assert_eq!(downgrade.len(), 2);
        assert!(Arc::ptr_eq(&downgrade, &downgrade_again));
        assert_eq!(transport.calls(), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cache_forces_refetch() -> Result<()> {
        let transport =
            ScriptedTransport::new(vec![body(ONE_RECORD), body(ONE_RECORD), body(TWO_RECORDS)]);
        let cache = cache_with(Arc::clone(&transport));

        cache.fetch_index(false).await?;
        cache.fetch_downgrade_index(false).await;
        cache.clear_cache();
        assert_eq!(cache.primary_cache_age(), None);
        assert_eq!(cache.downgrade_cache_age(), None);

        assert_eq!(cache.fetch_index(false).await?.len(), 2);
        assert_eq!(transport.calls(), 3);
        Ok(())
    }

    #[test]
    fn test_cache_entry_staleness() {
        let entry = CacheEntry::new(());
        assert!(!entry.is_stale(Duration::from_secs(60)));
        assert!(entry.is_stale(Duration::ZERO));
    }
}
