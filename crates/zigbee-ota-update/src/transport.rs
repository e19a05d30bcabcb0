//! HTTP transport seam for index and image downloads

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::config::OtaSourceConfig;
use crate::error::NetworkError;

/// Fetches the full body of a URL
///
/// Every network call in this crate goes through this trait so callers can
/// substitute their own client or a test double.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` and return the complete body.
    ///
    /// Implementations must fail with [`NetworkError::Status`] for non-2xx
    /// responses and never retry.
    async fn get(&self, url: &str) -> Result<Bytes, NetworkError>;
}

/// [`HttpTransport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport using the timeout and user agent from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ClientInit`] if the TLS backend fails to initialize.
    pub fn new(config: &OtaSourceConfig) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| NetworkError::ClientInit(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<Bytes, NetworkError> {
        let transport_err = |e: reqwest::Error| NetworkError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport_err)?;
        debug!("GET {} -> {} bytes", url, body.len());
        Ok(body)
    }
}
