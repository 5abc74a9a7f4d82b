//! `easychat config`: Show the effective configuration.

use easychat_config::ClientConfig;

pub fn run(config: &ClientConfig) -> anyhow::Result<()> {
    let config_path = ClientConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("# Loaded from {}", config_path.display());
    } else {
        println!("# No config file at {}, showing defaults with overrides", config_path.display());
    }
    println!("# Documents are saved to {}", config.download_dir().display());
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

pub fn print_defaults() {
    print!("{}", ClientConfig::default_toml());
}
