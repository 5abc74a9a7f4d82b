//! Transport layer for EasyChat.
//!
//! - [`StreamFrameDecoder`] turns raw body chunks into complete NDJSON lines
//! - [`HttpChatTransport`] talks to `/api/chat` and `/api/chat/stream`
//! - [`HttpDocumentSource`] downloads cited documents from blob storage
//! - [`DocumentFetcher`] puts a bounded LRU cache in front of a document source

pub mod decoder;
pub mod documents;
pub mod http;

pub use decoder::StreamFrameDecoder;
pub use documents::DocumentFetcher;
pub use http::{HttpChatTransport, HttpDocumentSource};
