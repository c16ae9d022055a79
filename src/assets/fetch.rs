//! Fetching shell assets from their origin.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, Url};

use super::{AssetError, AssetResponse};

/// Where cache misses and passthrough requests go.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Perform `method` on `path` (path plus optional query).
    async fn fetch(&self, method: &str, path: &str) -> Result<AssetResponse, AssetError>;
}

/// Fetches from an HTTP origin.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    origin: Url,
}

impl HttpFetcher {
    pub fn new(origin: &str) -> Result<Self, AssetError> {
        let origin = Url::parse(origin).map_err(|e| AssetError::Origin(e.to_string()))?;
        Ok(Self {
            client: Client::new(),
            origin,
        })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, method: &str, path: &str) -> Result<AssetResponse, AssetError> {
        let url = self
            .origin
            .join(path)
            .map_err(|e| AssetError::Origin(e.to_string()))?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| AssetError::Method(method.to_string()))?;

        tracing::debug!("Fetching {} {}", method, url);
        let response = self.client.request(method, url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: Bytes = response.bytes().await?;

        Ok(AssetResponse {
            status,
            content_type,
            body,
        })
    }
}
