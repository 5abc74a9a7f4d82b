//! Cited documents and the trait for retrieving them.

use crate::error::DocumentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The only content type the document viewer accepts.
pub const PDF_MIME: &str = "application/pdf";

/// Where a cited document lives in blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocator {
    pub blob: String,
    pub container: String,
    pub account: String,
}

impl StorageLocator {
    /// Composite key used by the document cache: `blob|container|account`.
    pub fn cache_key(&self) -> String {
        format!("{}|{}|{}", self.blob, self.container, self.account)
    }

    /// Query parameters for `GET /api/blobstorage/file`.
    pub fn query_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("storageaccount_blob", self.blob.as_str()),
            ("storageaccount_container", self.container.as_str()),
            ("storageaccount_name", self.account.as_str()),
        ]
    }
}

/// A binary document as returned by the backend.
///
/// Cloning is cheap: the payload is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content_type: String,
    pub data: Arc<[u8]>,
}

impl Document {
    pub fn new(content_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks the declared type (ignoring parameters such as `; charset=`).
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .split(';')
            .next()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(PDF_MIME))
    }

    /// Reject payloads the viewer cannot use.
    pub fn validate(self) -> Result<Self, DocumentError> {
        if self.is_empty() {
            return Err(DocumentError::Empty);
        }
        if !self.is_pdf() {
            return Err(DocumentError::WrongContentType(self.content_type));
        }
        Ok(self)
    }
}

/// A backend that serves cited documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// A human-readable name for this source.
    fn name(&self) -> &str;

    /// Retrieve the raw document. Validation is the caller's job.
    async fn fetch(&self, locator: &StorageLocator) -> Result<Document, DocumentError>;
}
