//! `easychat ask`: Single-message mode.

use super::Client;
use easychat_config::ClientConfig;

pub async fn run(config: ClientConfig, message: &str) -> anyhow::Result<()> {
    let client = Client::build(&config, true)?;

    match client.session.submit_turn(message).await? {
        Some(_) => Ok(()),
        None => anyhow::bail!("Nothing to send: the message is empty"),
    }
}
