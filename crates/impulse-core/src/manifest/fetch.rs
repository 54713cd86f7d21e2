//! HTTP access used to retrieve manifests

use crate::{error::Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Capability to download a manifest body
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, url: &Url, headers: &BTreeMap<String, String>) -> Result<Bytes>;
}

/// `HttpFetch` backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    #[instrument(skip(self, headers))]
    async fn fetch(&self, url: &Url, headers: &BTreeMap<String, String>) -> Result<Bytes> {
        debug!("Fetching manifest: {}", url);

        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::ManifestFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::ManifestFetch(e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::ManifestFetch(e.to_string()))?;

        debug!(bytes = body.len(), "Manifest fetched");
        Ok(body)
    }
}
