//! Error types for the EasyChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Transport and document retrieval each have their own error enum; the
//! top-level [`Error`] wraps them alongside the frame-level failures.

use thiserror::Error;

/// The top-level error type for all EasyChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Construction ---
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // --- Stream decoding ---
    #[error("Malformed frame: {reason} (line: {line})")]
    MalformedFrame { line: String, reason: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // --- Network ---
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    // --- Documents ---
    #[error("Document fetch failed: {0}")]
    DocumentFetchFailure(#[from] DocumentError),

    #[error("Request cancelled")]
    Cancelled,

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a `MalformedFrame` error, truncating very long lines so logs stay readable.
    pub fn malformed(line: &str, reason: impl Into<String>) -> Self {
        const MAX_LINE: usize = 200;
        let line = if line.len() > MAX_LINE {
            let mut end = MAX_LINE;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}…", &line[..end])
        } else {
            line.to_string()
        };
        Self::MalformedFrame {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    #[error("Citation has no storage locator")]
    MissingLocator,

    #[error("Citation does not reference a PDF: {0}")]
    NotPdf(String),

    #[error("Document is empty")]
    Empty,

    #[error("Unexpected content type: {0}")]
    WrongContentType(String),

    #[error("Document unavailable (status: {0})")]
    Status(u16),

    #[error("Document unreachable: {0}")]
    Unreachable(String),

    #[error("Document could not be presented: {0}")]
    Presentation(String),
}
