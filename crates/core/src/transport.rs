//! Transport trait: the abstraction over the completion backend.
//!
//! A transport knows how to send the conversation to the backend and hand
//! back either the whole JSON body or the raw bytes of a streamed body.
//! Decoding those bytes into frames is the session's job, so transports stay
//! thin and easy to fake in tests.

use crate::error::{Result, TransportError};
use crate::message::ChatRequest;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Raw body chunks of a streamed response, in arrival order.
///
/// The channel closes when the body ends; an `Err` item means the stream
/// broke mid-way.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<Vec<u8>, TransportError>>;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// A human-readable name for this transport (e.g., "http").
    fn name(&self) -> &str;

    /// One request/response round trip. Returns the decoded JSON body.
    ///
    /// The status code does not decide success: the body's shape does.
    async fn complete(&self, request: &ChatRequest) -> Result<serde_json::Value>;

    /// Start a streamed request and return its body chunks.
    async fn stream(&self, request: &ChatRequest) -> Result<ChunkReceiver>;
}
