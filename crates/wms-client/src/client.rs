//! HTTP client for WMS endpoints with bounded retry.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Client, Response};
use tracing::{debug, info, warn};

use harvest_common::{HarvestError, HarvestResult};

use crate::capabilities::{parse_capabilities, WmsCapabilities};
use crate::exceptions;
use crate::getmap::{append_query, GetMapRequest};

/// Configuration for the WMS client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_retry_delay: Duration,
    /// Maximum retry delay
    pub max_retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            max_retries: 3,
            initial_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

/// Client bound to one WMS endpoint.
pub struct WmsClient {
    client: Client,
    base_url: String,
    config: ClientConfig,
}

impl WmsClient {
    pub fn new(base_url: impl Into<String>, config: ClientConfig) -> HarvestResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| HarvestError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and parse the service's capabilities document.
    pub async fn get_capabilities(&self) -> HarvestResult<WmsCapabilities> {
        let url = append_query(&self.base_url, "SERVICE=WMS&REQUEST=GetCapabilities");
        debug!(url = %url, "Requesting capabilities");

        let response = self.fetch_with_retry(&url).await?;
        let xml = response
            .text()
            .await
            .map_err(|e| HarvestError::Http(e.to_string()))?;

        let caps = parse_capabilities(&xml)?;
        info!(
            service = %caps.service_title,
            version = %caps.version,
            layers = caps.root.leaves().len(),
            "Connected to WMS service"
        );
        Ok(caps)
    }

    /// Fetch a rendered map image.
    ///
    /// Servers report GetMap failures in-band as XML with a 200 status;
    /// those are surfaced as [`HarvestError::ServiceException`].
    pub async fn fetch_map(&self, request: &GetMapRequest) -> HarvestResult<Bytes> {
        let url = request.to_query_url(&self.base_url);
        debug!(url = %url, "Requesting map image");

        let response = self.fetch_with_retry(&url).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HarvestError::Http(e.to_string()))?;

        if content_type.starts_with("image/") {
            return Ok(bytes);
        }

        if let Ok(text) = std::str::from_utf8(&bytes) {
            if let Some(err) = exceptions::detect(text) {
                return Err(err);
            }
        }

        Err(HarvestError::UnexpectedContentType(content_type))
    }

    async fn fetch_with_retry(&self, url: &str) -> HarvestResult<Response> {
        let mut delay = self.config.initial_retry_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let outcome = self.client.get(url).send().await;

            match outcome {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    // Client errors will not improve on retry.
                    if status.is_client_error() || attempt > self.config.max_retries {
                        return Err(HarvestError::Http(format!(
                            "{} returned status {}",
                            url, status
                        )));
                    }
                    warn!(
                        status = %status,
                        attempt = attempt,
                        "Request failed, retrying"
                    );
                }
                Err(e) => {
                    if attempt > self.config.max_retries {
                        return Err(HarvestError::Http(e.to_string()));
                    }
                    warn!(error = %e, attempt = attempt, "Request error, retrying");
                }
            }

            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.config.max_retry_delay);
        }
    }
}
