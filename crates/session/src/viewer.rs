//! Opening cited documents.

use easychat_core::citation::Citation;
use easychat_core::document::StorageLocator;
use easychat_core::error::{DocumentError, Result};
use easychat_core::view::DocumentSurface;
use easychat_transport::DocumentFetcher;
use std::sync::Arc;
use tracing::{debug, error};

/// What was shown for a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewedDocument {
    pub page_count: u32,
    /// The page scrolled to, if the first cited page was in range.
    pub scrolled_to: Option<u32>,
}

/// Shows cited PDFs on a [`DocumentSurface`].
pub struct DocumentViewer {
    fetcher: Arc<DocumentFetcher>,
    surface: Arc<dyn DocumentSurface>,
}

impl DocumentViewer {
    pub fn new(fetcher: Arc<DocumentFetcher>, surface: Arc<dyn DocumentSurface>) -> Self {
        Self { fetcher, surface }
    }

    pub fn fetcher(&self) -> &Arc<DocumentFetcher> {
        &self.fetcher
    }

    /// Validate the citation, then fetch and present its document.
    ///
    /// Citations that are not PDFs or have no storage locator are rejected
    /// before the surface opens. Any later failure closes the surface.
    pub async fn open(&self, citation: &Citation) -> Result<ViewedDocument> {
        if !citation.is_pdf() {
            return Err(DocumentError::NotPdf(citation.url.clone()).into());
        }
        let Some(locator) = citation.storage_locator() else {
            return Err(DocumentError::MissingLocator.into());
        };

        self.surface.open();
        let page_count = match self.present(&locator).await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, title = %citation.title, "Could not show document");
                self.surface.close();
                return Err(e);
            }
        };

        let scrolled_to = citation
            .first_page()
            .filter(|page| *page > 0 && *page <= page_count);
        if let Some(page) = scrolled_to {
            self.surface.scroll_to_page(page);
        }

        Ok(ViewedDocument {
            page_count,
            scrolled_to,
        })
    }

    async fn present(&self, locator: &StorageLocator) -> Result<u32> {
        let document = self.fetcher.fetch(locator).await?;
        debug!(bytes = document.len(), blob = %locator.blob, "Presenting document");
        self.surface.present(&document).await
    }
}
