//! Subcommand implementations.

pub mod ask;
pub mod chat;
pub mod config_cmd;
pub mod fetch;

use crate::surface::FileSurface;
use crate::terminal::TerminalView;
use anyhow::Context;
use easychat_config::ClientConfig;
use easychat_session::{ConversationSession, DocumentViewer};
use easychat_transport::{DocumentFetcher, HttpChatTransport, HttpDocumentSource};
use std::sync::Arc;

/// Everything a command needs to talk to the backend.
pub struct Client {
    pub session: Arc<ConversationSession>,
    pub view: Arc<TerminalView>,
    pub viewer: DocumentViewer,
    pub surface: Arc<FileSurface>,
}

impl Client {
    pub fn build(config: &ClientConfig, echo_user: bool) -> anyhow::Result<Self> {
        let transport = Arc::new(
            HttpChatTransport::from_config(config).context("Failed to create chat transport")?,
        );
        let source = Arc::new(
            HttpDocumentSource::from_config(config).context("Failed to create document source")?,
        );
        let fetcher = Arc::new(
            DocumentFetcher::new(source, config.document_cache_capacity)
                .context("Failed to create document cache")?,
        );

        let view = Arc::new(TerminalView::new(echo_user));
        let surface = Arc::new(FileSurface::new(config.download_dir()));
        let session = Arc::new(
            ConversationSession::from_config(config, transport, view.clone())
                .with_documents(fetcher.clone()),
        );
        let viewer = DocumentViewer::new(fetcher, surface.clone());

        Ok(Self {
            session,
            view,
            viewer,
            surface,
        })
    }
}
