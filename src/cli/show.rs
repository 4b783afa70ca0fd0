//! `hotwire show-config`: print the effective configuration.

use anyhow::{Context, Result};

use crate::config::SupervisorConfig;

pub fn show_config(config: &SupervisorConfig) -> Result<()> {
    if let Some(path) = &config.config_path {
        println!("# loaded from {}", path.display());
    }
    let rendered = config.to_toml().context("failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}
