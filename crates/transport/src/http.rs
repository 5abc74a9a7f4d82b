//! HTTP adapters backed by `reqwest`.
//!
//! Endpoints:
//! - `POST /api/chat`              : whole JSON answer
//! - `POST /api/chat/stream`       : NDJSON answer, one frame per line
//! - `GET  /api/blobstorage/file`  : cited document bytes

use async_trait::async_trait;
use easychat_config::ClientConfig;
use easychat_core::document::{Document, DocumentSource, StorageLocator};
use easychat_core::error::{DocumentError, Error, Result, TransportError};
use easychat_core::message::ChatRequest;
use easychat_core::transport::{ChatTransport, ChunkReceiver};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Chat transport for the EasyChat backend.
pub struct HttpChatTransport {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpChatTransport {
    /// Create a transport rooted at `base_url`.
    ///
    /// `timeout` bounds non-streamed requests; streamed bodies may run for
    /// as long as the backend keeps sending.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: build_client()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::TransportFailure(TransportError::Network(e.to_string())))
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::TransportFailure(TransportError::Timeout(e.to_string()))
    } else if e.is_builder() {
        Error::TransportFailure(TransportError::InvalidEndpoint(e.to_string()))
    } else {
        Error::TransportFailure(TransportError::Network(e.to_string()))
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<serde_json::Value> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(%url, turns = request.messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            // The body still decides success or failure.
            warn!(status = status.as_u16(), "Received unexpected status");
        }

        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| {
            Error::malformed(&String::from_utf8_lossy(&body), format!("Invalid JSON body: {e}"))
        })
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkReceiver> {
        let url = format!("{}/api/chat/stream", self.base_url);
        debug!(%url, turns = request.messages.len(), "Sending streaming chat request");

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/x-ndjson")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(status = status.as_u16(), "Received unexpected status on stream");
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Forward raw body chunks; decoding happens on the receiving side.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            while let Some(chunk) = byte_stream.next().await {
                let item = match chunk {
                    Ok(bytes) => Ok(bytes.to_vec()),
                    Err(e) => Err(TransportError::StreamInterrupted(e.to_string())),
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() {
                    trace!("Chunk receiver dropped, abandoning stream");
                    return;
                }
                if failed {
                    return;
                }
            }
            trace!("Stream body finished");
        });

        Ok(rx)
    }
}

/// Document source for `GET /api/blobstorage/file`.
pub struct HttpDocumentSource {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpDocumentSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: build_client()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    fn name(&self) -> &str {
        "blobstorage"
    }

    async fn fetch(&self, locator: &StorageLocator) -> std::result::Result<Document, DocumentError> {
        let url = format!("{}/api/blobstorage/file", self.base_url);
        debug!(blob = %locator.blob, container = %locator.container, "Fetching document");

        let response = self
            .client
            .get(&url)
            .query(&locator.query_pairs())
            .header("Cache-Control", "no-cache")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DocumentError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocumentError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(|e| DocumentError::Unreachable(e.to_string()))?;

        trace!(bytes = data.len(), %content_type, "Document downloaded");
        Ok(Document::new(content_type, data.to_vec()))
    }
}
