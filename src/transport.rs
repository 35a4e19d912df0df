//! Transport trait abstraction for the streaming chat endpoint.
//!
//! Abstracts the HTTP layer behind a trait so the exchange driver can be
//! exercised against scripted chunk sequences in tests. The production
//! implementation is reqwest-based; the SSE decoding itself lives in
//! [`crate::sse`] and only ever sees the chunk stream.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

use crate::models::ChatRequest;

/// Stream of raw response-body chunks from the transport.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Transport-level failure: the exchange cannot proceed.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// The request could not be sent or the connection failed
    Connect(String),
    /// Server returned an error status
    Status { status: u16, message: String },
    /// The body stream failed mid-transfer
    Read(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connect(msg) => write!(f, "Connection failed: {}", msg),
            TransportError::Status { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            TransportError::Read(msg) => write!(f, "Stream read failed: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Posts one chat request and exposes the response body as a chunk stream.
///
/// Implementations must resolve non-success statuses into
/// [`TransportError::Status`] before handing out a stream; a returned
/// stream always corresponds to a 2xx response.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request and open the streaming response body.
    ///
    /// # Arguments
    /// * `url` - Full URL of the chat endpoint
    /// * `body` - Request body, serialized as JSON
    async fn post_chat(&self, url: &str, body: &ChatRequest)
        -> Result<ChunkStream, TransportError>;
}

/// Production transport backed by a reusable [`reqwest::Client`].
#[derive(Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh HTTP client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatTransport for ReqwestTransport {
    async fn post_chat(
        &self,
        url: &str,
        body: &ChatRequest,
    ) -> Result<ChunkStream, TransportError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Status { status, message });
        }

        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| TransportError::Read(e.to_string())));

        Ok(Box::pin(stream))
    }
}
