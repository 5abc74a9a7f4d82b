//! Presentation seams.
//!
//! The session never touches a terminal, a DOM, or a PDF library directly.
//! It reports what happened through [`ChatView`] and hands documents to a
//! [`DocumentSurface`].

use crate::document::Document;
use crate::error::Result;
use crate::message::ChatTurn;
use async_trait::async_trait;

/// A numbered entry in the citation box under an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationEntry {
    /// 1-based number shown to the user (`[doc{number}]`)
    pub number: usize,
    /// Index into the turn's citation list
    pub index: usize,
    pub title: String,
    pub tooltip: String,
}

/// Incremental rendering of the assistant turn in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// First frame decoded: base message, reference footer, and citation box.
    Started {
        markdown: String,
        /// The base message alone, without the footer
        text: String,
        citations: Vec<CitationEntry>,
    },

    /// A (possibly merged) delta was applied.
    Appended { fragment: String, markdown: String },

    /// The turn is finished; the text carries a trailing newline.
    Settled { markdown: String },
}

impl RenderEvent {
    pub fn markdown(&self) -> &str {
        match self {
            Self::Started { markdown, .. }
            | Self::Appended { markdown, .. }
            | Self::Settled { markdown } => markdown,
        }
    }
}

/// Where the transcript is shown.
pub trait ChatView: Send + Sync {
    /// Show a user or error turn.
    fn show_turn(&self, turn: &ChatTurn);

    /// Show the transient "waiting for reply" indicator.
    fn show_waiting(&self);

    fn hide_waiting(&self);

    /// Render the assistant turn currently being assembled.
    fn render_assistant(&self, event: &RenderEvent);

    /// Remove the most recently shown turn (optimistic user turn rollback).
    fn remove_last_turn(&self);

    /// Replace the contents of the input box.
    fn set_input(&self, text: &str);

    fn clear_transcript(&self);
}

/// Where documents are displayed (a modal viewer, a file on disk, ...).
#[async_trait]
pub trait DocumentSurface: Send + Sync {
    /// Show the surface with a loading indicator.
    fn open(&self);

    fn close(&self);

    /// Rasterize and display the document. Returns the page count.
    async fn present(&self, document: &Document) -> Result<u32>;

    /// Bring a cited page into view. Only called with `0 < page <= page_count`.
    fn scroll_to_page(&self, page: u32);
}
