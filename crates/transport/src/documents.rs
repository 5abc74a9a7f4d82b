//! Cached document retrieval.

use easychat_cache::{BoundedAsyncCache, CacheError};
use easychat_core::document::{Document, DocumentSource, StorageLocator};
use easychat_core::error::{DocumentError, Error};
use std::sync::Arc;
use tracing::{debug, warn};

/// Retrieves documents through a [`DocumentSource`], keeping the most
/// recently viewed ones in memory.
///
/// Only validated PDFs are cached: an empty body or a wrong content type
/// fails the fetch and leaves the cache untouched.
pub struct DocumentFetcher {
    source: Arc<dyn DocumentSource>,
    cache: BoundedAsyncCache<Document>,
}

impl DocumentFetcher {
    pub fn new(source: Arc<dyn DocumentSource>, capacity: usize) -> easychat_core::Result<Self> {
        let cache = BoundedAsyncCache::new(capacity).map_err(|e| match e {
            CacheError::InvalidConfiguration { .. } => Error::InvalidConfiguration(e.to_string()),
        })?;
        Ok(Self { source, cache })
    }

    /// Return the document at `locator`, downloading it on a cache miss.
    pub async fn fetch(&self, locator: &StorageLocator) -> Result<Document, DocumentError> {
        let key = locator.cache_key();
        let source = &self.source;

        let document = self
            .cache
            .get_or_try_compute(&key, || async move {
                debug!(source = source.name(), blob = %locator.blob, "Document not cached, downloading");
                let document = source.fetch(locator).await?.validate()?;
                Ok::<_, DocumentError>(Some(document))
            })
            .await?;

        // The producer above never yields `None`.
        document.ok_or(DocumentError::Empty).inspect_err(|e| {
            warn!(error = %e, "Document source returned nothing");
        })
    }

    /// Drop every cached document. Downloads in flight are not cancelled.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        debug!("Document cache cleared");
    }

    pub async fn cached_count(&self) -> usize {
        self.cache.len().await
    }

    pub async fn is_cached(&self, locator: &StorageLocator) -> bool {
        self.cache.contains(&locator.cache_key()).await
    }
}
