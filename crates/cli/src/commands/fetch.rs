//! `easychat fetch`: Download one document by its storage locator.

use super::Client;
use anyhow::Context;
use easychat_config::ClientConfig;
use easychat_core::document::StorageLocator;
use easychat_core::view::DocumentSurface;

pub async fn run(
    config: ClientConfig,
    blob: &str,
    container: &str,
    account: &str,
) -> anyhow::Result<()> {
    let client = Client::build(&config, false)?;
    let locator = StorageLocator {
        blob: blob.to_string(),
        container: container.to_string(),
        account: account.to_string(),
    };

    client.surface.prepare(blob);
    client.surface.open();
    let document = match client.viewer.fetcher().fetch(&locator).await {
        Ok(document) => document,
        Err(e) => {
            client.surface.close();
            return Err(e).with_context(|| format!("Failed to fetch '{blob}'"));
        }
    };
    client.surface.present(&document).await?;
    Ok(())
}
