//! The conversation session: turn submission, streaming, and rollback.

use crate::assembler::{AssembledMessage, ChoiceAssembler};
use easychat_config::ClientConfig;
use easychat_core::citation::Citation;
use easychat_core::error::{Error, Result};
use easychat_core::frame::StreamFrame;
use easychat_core::message::{ChatRequest, ChatTurn, History};
use easychat_core::transport::ChatTransport;
use easychat_core::view::{ChatView, RenderEvent};
use easychat_transport::{DocumentFetcher, StreamFrameDecoder};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Notice shown in the transcript when a turn fails.
pub const FAILURE_NOTICE: &str = "Error while sending message";

/// Whether a turn is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

/// Mutable session state, all behind one lock.
///
/// `generation` is bumped by every clear. A turn remembers the generation
/// it started in and leaves the state alone once that is stale.
struct Turns {
    history: History,
    state: SubmitState,
    generation: u64,
    current: Option<CancellationToken>,
    last_citations: Vec<Citation>,
}

impl Turns {
    fn new() -> Self {
        Self {
            history: History::new(),
            state: SubmitState::Idle,
            generation: 0,
            current: None,
            last_citations: Vec::new(),
        }
    }
}

/// Holds the session in `Submitting` and releases it on drop, whatever the
/// outcome of the turn, unless the session was cleared in the meantime.
struct SubmitGuard<'a> {
    turns: &'a Mutex<Turns>,
    generation: u64,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        let mut turns = lock(self.turns);
        if turns.generation == self.generation {
            turns.state = SubmitState::Idle;
            turns.current = None;
        }
    }
}

// Locks are only taken for short synchronous sections, never across an
// await, so a poisoned lock still holds consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Progress of the turn in flight, kept so a failure can be undone.
struct TurnProgress {
    generation: u64,
    /// History length before the user turn was appended.
    mark: usize,
    /// History index of the assistant placeholder, once the answer started.
    assistant_index: Option<usize>,
}

/// One chat conversation.
///
/// The session owns the history. The view, transport, and document fetcher
/// are injected so the same session runs against a terminal, a test double,
/// or anything else that implements the traits.
pub struct ConversationSession {
    transport: Arc<dyn ChatTransport>,
    view: Arc<dyn ChatView>,
    documents: Option<Arc<DocumentFetcher>>,
    streaming: bool,
    restore_prompt_on_failure: bool,
    settle_delay: Duration,
    turns: Mutex<Turns>,
}

impl ConversationSession {
    pub fn new(transport: Arc<dyn ChatTransport>, view: Arc<dyn ChatView>) -> Self {
        Self {
            transport,
            view,
            documents: None,
            streaming: true,
            restore_prompt_on_failure: true,
            settle_delay: Duration::ZERO,
            turns: Mutex::new(Turns::new()),
        }
    }

    /// Create a session with the flags from `config`.
    pub fn from_config(
        config: &ClientConfig,
        transport: Arc<dyn ChatTransport>,
        view: Arc<dyn ChatView>,
    ) -> Self {
        Self::new(transport, view)
            .with_streaming(config.streaming)
            .with_restore_prompt(config.restore_prompt_on_failure)
            .with_settle_delay(config.settle_delay())
    }

    /// Use `/api/chat/stream` (true) or `/api/chat` (false).
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.streaming = enabled;
        self
    }

    /// Put the user's text back into the input box when a turn fails.
    pub fn with_restore_prompt(mut self, enabled: bool) -> Self {
        self.restore_prompt_on_failure = enabled;
        self
    }

    /// Delay before the final `Settled` render of an answer.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Attach the document cache cleared by [`clear_session`](Self::clear_session).
    pub fn with_documents(mut self, documents: Arc<DocumentFetcher>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn state(&self) -> SubmitState {
        lock(&self.turns).state
    }

    pub fn is_submitting(&self) -> bool {
        self.state() == SubmitState::Submitting
    }

    /// Snapshot of the committed history.
    pub fn history(&self) -> History {
        lock(&self.turns).history.clone()
    }

    /// Citations of the most recent answer.
    pub fn last_citations(&self) -> Vec<Citation> {
        lock(&self.turns).last_citations.clone()
    }

    /// Token of the turn in flight, if any.
    pub fn cancel_handle(&self) -> Option<CancellationToken> {
        lock(&self.turns).current.clone()
    }

    /// Cancel the turn in flight. Returns `false` when there is none.
    pub fn cancel_current(&self) -> bool {
        match self.cancel_handle() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.turns).generation == generation
    }

    /// Send one user turn and render the answer.
    ///
    /// Returns `Ok(None)` without doing anything when the text is blank or a
    /// turn is already in flight. On failure the turn is rolled back, the
    /// view shows [`FAILURE_NOTICE`], and the error is returned.
    pub async fn submit_turn(&self, text: &str) -> Result<Option<AssembledMessage>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let token = CancellationToken::new();
        let user_turn = ChatTurn::user(text);
        let (guard, mut progress, request) = {
            let mut turns = lock(&self.turns);
            if turns.state == SubmitState::Submitting {
                debug!("Turn already in flight, ignoring submission");
                return Ok(None);
            }
            turns.state = SubmitState::Submitting;
            turns.current = Some(token.clone());

            let mark = turns.history.len();
            turns.history.push(user_turn.clone());
            let request = ChatRequest::from_history(&turns.history);
            let guard = SubmitGuard {
                turns: &self.turns,
                generation: turns.generation,
            };
            let progress = TurnProgress {
                generation: turns.generation,
                mark,
                assistant_index: None,
            };
            (guard, progress, request)
        };
        self.view.show_turn(&user_turn);
        self.view.show_waiting();
        self.view.set_input("");

        debug!(
            turns = request.messages.len(),
            streaming = self.streaming,
            transport = self.transport.name(),
            "Submitting turn"
        );

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            result = self.run_turn(&request, &mut progress) => result,
        };

        let (message, settled) = match result {
            Ok(done) => done,
            Err(e) => {
                error!(error = %e, "Turn failed");
                self.roll_back(text, &progress);
                return Err(e);
            }
        };

        info!(chars = message.text.len(), citations = message.citations.len(), "Turn complete");
        drop(guard);

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        if self.is_current(progress.generation) {
            self.view.render_assistant(&settled);
        }

        Ok(Some(message))
    }

    async fn run_turn(
        &self,
        request: &ChatRequest,
        progress: &mut TurnProgress,
    ) -> Result<(AssembledMessage, RenderEvent)> {
        let mut assembler = ChoiceAssembler::new();

        if self.streaming {
            let mut chunks = self.transport.stream(request).await?;
            let mut decoder = StreamFrameDecoder::new();
            while let Some(chunk) = chunks.recv().await {
                let lines = decoder.push_chunk(&chunk?);
                let frames = parse_lines(&lines)?;
                self.apply_frames(&mut assembler, frames, progress)?;
            }
            if let Some(tail) = decoder.flush() {
                trace!("Parsing unterminated last line");
                let frame = StreamFrame::parse(&tail)?;
                self.apply_frames(&mut assembler, vec![frame], progress)?;
            }
        } else {
            let body = self.transport.complete(request).await?;
            let frame = StreamFrame::from_value(body)?;
            self.apply_frames(&mut assembler, vec![frame], progress)?;
        }

        let message = assembler.finish()?;
        {
            let mut turns = lock(&self.turns);
            if turns.generation != progress.generation {
                return Err(Error::Cancelled);
            }
            if let Some(index) = progress.assistant_index {
                turns.history.set_content(index, message.text.clone());
            }
            turns.last_citations = message.citations.clone();
        }

        Ok((message, assembler.settled()))
    }

    fn apply_frames(
        &self,
        assembler: &mut ChoiceAssembler,
        frames: Vec<StreamFrame>,
        progress: &mut TurnProgress,
    ) -> Result<()> {
        for event in assembler.apply_chunk(frames)? {
            if let RenderEvent::Started { .. } = &event {
                let mut turns = lock(&self.turns);
                if turns.generation != progress.generation {
                    return Err(Error::Cancelled);
                }
                turns.history.push(ChatTurn::assistant(assembler.text()));
                progress.assistant_index = Some(turns.history.len() - 1);
                drop(turns);
                self.view.hide_waiting();
            }
            self.view.render_assistant(&event);
        }
        Ok(())
    }

    fn roll_back(&self, text: &str, progress: &TurnProgress) {
        {
            let mut turns = lock(&self.turns);
            if turns.generation != progress.generation {
                debug!("Session was cleared, nothing to roll back");
                return;
            }
            let keep = if self.restore_prompt_on_failure {
                progress.mark
            } else {
                progress.mark + 1
            };
            turns.history.truncate(keep);
        }

        self.view.hide_waiting();
        if progress.assistant_index.is_some() {
            self.view.remove_last_turn();
        }
        if self.restore_prompt_on_failure {
            self.view.remove_last_turn();
            self.view.set_input(text);
        }
        self.view.show_turn(&ChatTurn::error(FAILURE_NOTICE));
    }

    /// Forget the conversation and start over.
    ///
    /// A turn still in flight is cancelled and can no longer touch the new
    /// conversation. Clearing the document cache is best effort: downloads
    /// already running will still land in it.
    pub async fn clear_session(&self) {
        let in_flight = {
            let mut turns = lock(&self.turns);
            turns.generation += 1;
            turns.state = SubmitState::Idle;
            turns.history.clear();
            turns.last_citations.clear();
            turns.current.take()
        };
        if let Some(token) = in_flight {
            debug!("Cancelling turn in flight");
            token.cancel();
        }
        self.view.clear_transcript();

        match &self.documents {
            Some(documents) => {
                documents.clear_cache().await;
                debug!("Session cleared");
            }
            None => warn!("Session cleared without a document cache attached"),
        }
    }
}

fn parse_lines(lines: &[String]) -> Result<Vec<StreamFrame>> {
    lines
        .iter()
        .map(|line| {
            trace!(bytes = line.len(), "Parsing frame");
            StreamFrame::parse(line)
        })
        .collect()
}
