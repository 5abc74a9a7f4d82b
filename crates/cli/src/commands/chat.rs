//! `easychat chat`: Interactive conversation.

use super::Client;
use easychat_config::ClientConfig;
use easychat_session::ConversationSession;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Message(&'a str),
    Open(usize),
    Retry,
    Clear,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return match line {
            "exit" | "quit" | ":q" => Input::Quit,
            _ => Input::Message(line),
        };
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit" | "exit"), None) => Input::Quit,
        (Some("clear"), None) => Input::Clear,
        (Some("retry"), None) => Input::Retry,
        (Some("help"), None) => Input::Help,
        (Some("open"), Some(n)) => match n.parse() {
            Ok(n) if n > 0 => Input::Open(n),
            _ => Input::Unknown(line),
        },
        _ => Input::Unknown(line),
    }
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_help() {
    println!("  /open N   save the PDF cited as [docN] and show its cited page");
    println!("  /retry    send the last failed message again");
    println!("  /clear    start a new conversation");
    println!("  /quit     leave (Ctrl+C cancels an answer in progress)");
    println!();
}

/// Ctrl+C cancels the turn in flight, or ends the REPL when idle.
fn watch_interrupts(session: Arc<ConversationSession>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if session.cancel_current() {
                debug!("Turn cancelled by user");
                continue;
            }
            shutdown.cancel();
            break;
        }
    });
}

async fn open_citation(client: &Client, number: usize) {
    let citations = client.session.last_citations();
    let Some(citation) = citations.get(number - 1) else {
        eprintln!("  [Error] The last answer has no [doc{number}]");
        return;
    };

    if let Some(blob) = &citation.storageaccount_blob {
        client.surface.prepare(blob);
    }
    if let Err(e) = client.viewer.open(citation).await {
        eprintln!("  [Error] {e}");
    }
    println!();
}

pub async fn run(config: ClientConfig) -> anyhow::Result<()> {
    let client = Client::build(&config, false)?;
    let shutdown = CancellationToken::new();
    watch_interrupts(client.session.clone(), shutdown.clone());

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          EasyChat — Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Backend:    {}", config.base_url);
    println!("  Streaming:  {}", if config.streaming { "on" } else { "off" });
    println!("  Documents:  {}", config.download_dir().display());
    println!();
    println!("  Type your message and press Enter. /help lists commands.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&line) {
            Input::Quit => break,
            Input::Help => print_help(),
            Input::Clear => client.session.clear_session().await,
            Input::Open(n) => open_citation(&client, n).await,
            Input::Retry => match client.view.take_input() {
                Some(text) => submit(&client, &text).await,
                None => eprintln!("  Nothing to retry"),
            },
            Input::Unknown(command) => eprintln!("  Unknown command: {command} (try /help)"),
            Input::Message("") => {}
            Input::Message(text) => submit(&client, text).await,
        }

        prompt()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

async fn submit(client: &Client, text: &str) {
    // Failures are already shown in the transcript.
    if let Err(e) = client.session.submit_turn(text).await {
        warn!(error = %e, "Message not answered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse_input("  What is EasyChat? "), Input::Message("What is EasyChat?"));
        assert_eq!(parse_input(""), Input::Message(""));
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_input("/open 2"), Input::Open(2));
        assert_eq!(parse_input("/clear"), Input::Clear);
        assert_eq!(parse_input("/retry"), Input::Retry);
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("exit"), Input::Quit);
    }

    #[test]
    fn bad_commands_are_unknown() {
        assert_eq!(parse_input("/open 0"), Input::Unknown("/open 0"));
        assert_eq!(parse_input("/open x"), Input::Unknown("/open x"));
        assert_eq!(parse_input("/open"), Input::Unknown("/open"));
        assert_eq!(parse_input("/dance"), Input::Unknown("/dance"));
    }
}
