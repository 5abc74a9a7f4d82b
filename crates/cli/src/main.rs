//! EasyChat CLI: the main entry point.
//!
//! Commands:
//! - `chat`   : Interactive conversation with citation viewing
//! - `ask`    : Send a single message and print the answer
//! - `fetch`  : Download a document from blob storage
//! - `config` : Show the effective configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use easychat_config::ClientConfig;

mod commands;
mod surface;
mod terminal;

#[derive(Parser)]
#[command(
    name = "easychat",
    about = "EasyChat: chat with your documents from the terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Override the backend URL
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Use `/api/chat` instead of the streaming endpoint
    #[arg(long, global = true)]
    no_stream: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation
    Chat,

    /// Send a single message and print the answer
    Ask {
        /// The message to send
        #[arg(short, long)]
        message: String,
    },

    /// Download a document from blob storage
    Fetch {
        /// Blob name, e.g. `reports/q1.pdf`
        #[arg(long)]
        blob: String,

        /// Storage container
        #[arg(long)]
        container: String,

        /// Storage account
        #[arg(long)]
        account: String,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        defaults: bool,
    },
}

impl Cli {
    /// Load the configuration and apply command-line overrides.
    fn config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::load().context("Failed to load config")?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if self.no_stream {
            config.streaming = false;
        }
        config.validate().context("Invalid command-line override")?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match &cli.command {
        Commands::Config { defaults: true } => commands::config_cmd::print_defaults(),
        Commands::Config { defaults: false } => commands::config_cmd::run(&cli.config()?)?,
        Commands::Chat => commands::chat::run(cli.config()?).await?,
        Commands::Ask { message } => commands::ask::run(cli.config()?, message).await?,
        Commands::Fetch {
            blob,
            container,
            account,
        } => commands::fetch::run(cli.config()?, blob, container, account).await?,
    }

    Ok(())
}
