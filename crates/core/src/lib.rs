//! # EasyChat Core
//!
//! Domain types, traits, and error definitions for the EasyChat client.
//! This crate has **no transport or UI dependencies**: it defines the domain
//! model that the transport, session, and CLI crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`ChatTransport`] talks to the completion backend
//! - [`DocumentSource`] retrieves cited documents
//! - [`ChatView`] and [`DocumentSurface`] present results to the user
//!
//! Implementations live in their respective crates, so sessions can be
//! composed from real HTTP adapters or from scripted test doubles.

pub mod citation;
pub mod document;
pub mod error;
pub mod frame;
pub mod message;
pub mod transport;
pub mod view;

// Re-export key types at crate root for ergonomics
pub use citation::{Citation, CITATION_HOST, citation_href, reference_footer};
pub use document::{Document, DocumentSource, PDF_MIME, StorageLocator};
pub use error::{DocumentError, Error, Result, TransportError};
pub use frame::{DeltaFragment, FullMessage, StreamFrame};
pub use message::{ChatRequest, ChatTurn, History, Role};
pub use transport::{ChatTransport, ChunkReceiver};
pub use view::{ChatView, CitationEntry, DocumentSurface, RenderEvent};
