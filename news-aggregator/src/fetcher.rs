use crate::types::{FetchConfig, HttpTransport, Result, TransportError, TransportRequest};
use crate::utils::url::endpoint_url;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// HTTP transport backed by reqwest.
///
/// Issues exactly one attempt per request. Failures are reported to the caller
/// and only retried when the caller asks again.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    async fn send(&self, request: TransportRequest) -> std::result::Result<String, TransportError> {
        let url = endpoint_url(&request.base_url, &request.path)
            .map_err(|e| TransportError::Network(format!("invalid endpoint: {}", e)))?;

        let mut builder = self.client.get(url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        // Query strings carry API keys; keep URLs out of error text.
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status { status: status.as_u16(), body });
        }
        Ok(body)
    }
}

#[async_trait]
impl HttpTransport for Fetcher {
    async fn request(&self, request: TransportRequest, cancel: CancellationToken) -> std::result::Result<String, TransportError> {
        let start_time = Instant::now();
        let target = format!("{}{}", request.base_url, request.path);
        debug!("GET {}", target);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Canceled),
            result = self.send(request) => result,
        };

        match &result {
            Ok(body) => debug!("GET {} -> {} bytes in {}ms", target, body.len(), start_time.elapsed().as_millis()),
            Err(TransportError::Canceled) => debug!("GET {} canceled", target),
            Err(e) => warn!("GET {} failed after {}ms: {}", target, start_time.elapsed().as_millis(), e),
        }
        result
    }
}
