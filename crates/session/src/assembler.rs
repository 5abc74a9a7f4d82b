//! Reassembly of one assistant answer from decoded frames.
//!
//! The first frame carries the whole base message and its citations; every
//! later frame carries a text fragment. The assembler turns that sequence
//! into render events and, at the end, the finished message.

use easychat_core::citation::{Citation, reference_footer};
use easychat_core::error::{Error, Result};
use easychat_core::frame::StreamFrame;
use easychat_core::view::{CitationEntry, RenderEvent};
use tracing::trace;

/// Where the assembler is in the life of one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    AwaitingFirstFrame,
    Accumulating,
    Finalized,
}

/// The finished answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledMessage {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug)]
pub struct ChoiceAssembler {
    state: AssemblerState,
    text: String,
    citations: Vec<Citation>,
    footer: String,
}

impl Default for ChoiceAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ChoiceAssembler {
    pub fn new() -> Self {
        Self {
            state: AssemblerState::AwaitingFirstFrame,
            text: String::new(),
            citations: Vec::new(),
            footer: String::new(),
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// Markdown for the answer as it stands: text, a blank line, then the
    /// `[docN]` reference definitions.
    pub fn markdown(&self) -> String {
        format!("{}\n\n{}", self.text, self.footer)
    }

    /// Apply the first frame. It must be a full message.
    pub fn apply_first(&mut self, frame: StreamFrame) -> Result<RenderEvent> {
        if self.state != AssemblerState::AwaitingFirstFrame {
            return Err(Error::InvalidResponse(
                "Received a second full message".into(),
            ));
        }
        let StreamFrame::FullMessage(message) = frame else {
            return Err(Error::InvalidResponse(
                "First frame does not carry a message".into(),
            ));
        };

        trace!(citations = message.citations.len(), "Captured base message");
        self.text = message.content;
        self.footer = reference_footer(&message.citations);
        self.citations = message.citations;
        self.state = AssemblerState::Accumulating;

        Ok(RenderEvent::Started {
            markdown: self.markdown(),
            text: self.text.clone(),
            citations: self.citation_box(),
        })
    }

    /// Apply every frame decoded from one network chunk.
    ///
    /// If the answer has not started yet, the first frame is applied as the
    /// base message. All remaining deltas are merged and applied once, so a
    /// chunk produces at most one `Appended` event.
    pub fn apply_chunk(
        &mut self,
        frames: impl IntoIterator<Item = StreamFrame>,
    ) -> Result<Vec<RenderEvent>> {
        let mut events = Vec::new();
        let mut fragment = String::new();

        for frame in frames {
            match self.state {
                AssemblerState::AwaitingFirstFrame => events.push(self.apply_first(frame)?),
                AssemblerState::Accumulating => match frame {
                    StreamFrame::DeltaFragment(delta) => {
                        if let Some(content) = delta.content {
                            fragment.push_str(&content);
                        }
                    }
                    StreamFrame::FullMessage(_) => {
                        return Err(Error::InvalidResponse(
                            "Received a second full message".into(),
                        ));
                    }
                },
                AssemblerState::Finalized => {
                    return Err(Error::InvalidResponse(
                        "Received a frame after the answer was finished".into(),
                    ));
                }
            }
        }

        if !fragment.is_empty() {
            self.text.push_str(&fragment);
            events.push(RenderEvent::Appended {
                fragment,
                markdown: self.markdown(),
            });
        }
        Ok(events)
    }

    /// Close the answer. Fails if no base message ever arrived.
    pub fn finish(&mut self) -> Result<AssembledMessage> {
        match self.state {
            AssemblerState::Accumulating => {
                self.state = AssemblerState::Finalized;
                Ok(AssembledMessage {
                    text: self.text.clone(),
                    citations: self.citations.clone(),
                })
            }
            AssemblerState::AwaitingFirstFrame => Err(Error::InvalidResponse(
                "Stream ended before any message arrived".into(),
            )),
            AssemblerState::Finalized => Err(Error::InvalidResponse(
                "Answer already finished".into(),
            )),
        }
    }

    /// Final cosmetic render: the markdown with a trailing newline.
    pub fn settled(&self) -> RenderEvent {
        RenderEvent::Settled {
            markdown: format!("{}\n", self.markdown()),
        }
    }

    /// Numbered entries for the box under the answer. Only PDFs are listed,
    /// but numbering follows the full citation list.
    fn citation_box(&self) -> Vec<CitationEntry> {
        self.citations
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_pdf())
            .map(|(index, c)| CitationEntry {
                number: index + 1,
                index,
                title: c.title.clone(),
                tooltip: c.tooltip(),
            })
            .collect()
    }
}
