//! Terminal rendering of a conversation.

use easychat_core::message::{ChatTurn, Role};
use easychat_core::view::{ChatView, CitationEntry, RenderEvent};
use std::io::Write;
use std::sync::Mutex;
use tracing::debug;

/// Prints the transcript to stdout as it streams in.
pub struct TerminalView {
    /// Print user turns (off in the REPL, where the user just typed them)
    echo_user: bool,
    /// Text put back into the "input box" after a failed turn
    input: Mutex<String>,
    /// Citation box of the answer being printed, shown once it settles
    citations: Mutex<Vec<CitationEntry>>,
}

impl TerminalView {
    pub fn new(echo_user: bool) -> Self {
        Self {
            echo_user,
            input: Mutex::new(String::new()),
            citations: Mutex::new(Vec::new()),
        }
    }

    /// Take the text restored after a failed turn, if any.
    pub fn take_input(&self) -> Option<String> {
        let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
        let text = std::mem::take(&mut *input);
        (!text.is_empty()).then_some(text)
    }
}

fn flush() {
    let _ = std::io::stdout().flush();
}

/// One line per viewable citation, e.g. `  [doc2] Manual (page 3)`.
pub fn format_citations(entries: &[CitationEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("  [doc{}] {}\n", e.number, e.tooltip))
        .collect()
}

impl ChatView for TerminalView {
    fn show_turn(&self, turn: &ChatTurn) {
        match turn.role {
            Role::User if self.echo_user => println!("  You > {}", turn.content),
            Role::Error => eprintln!("  [Error] {}", turn.content),
            _ => {}
        }
    }

    fn show_waiting(&self) {
        eprint!("  ...");
    }

    fn hide_waiting(&self) {
        eprint!("\r     \r");
    }

    fn render_assistant(&self, event: &RenderEvent) {
        match event {
            RenderEvent::Started {
                text, citations, ..
            } => {
                *self.citations.lock().unwrap_or_else(|e| e.into_inner()) = citations.clone();
                print!("\n  Assistant > {text}");
                flush();
            }
            RenderEvent::Appended { fragment, .. } => {
                print!("{fragment}");
                flush();
            }
            RenderEvent::Settled { .. } => {
                println!();
                let citations = std::mem::take(
                    &mut *self.citations.lock().unwrap_or_else(|e| e.into_inner()),
                );
                if !citations.is_empty() {
                    println!();
                    print!("{}", format_citations(&citations));
                }
                println!();
            }
        }
    }

    fn remove_last_turn(&self) {
        // Printed output cannot be taken back.
        debug!("Discarding last turn");
    }

    fn set_input(&self, text: &str) {
        *self.input.lock().unwrap_or_else(|e| e.into_inner()) = text.to_string();
        if !text.is_empty() {
            eprintln!("  Your message was kept. Type /retry to send it again.");
        }
    }

    fn clear_transcript(&self) {
        println!("  (conversation cleared)");
        println!();
    }
}
