//! Configuration display.

use console::style;

use caselook::config::Config;

/// Print the effective configuration. Credentials are never part of it.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults (no config file found)".to_string());

    eprintln!("{} {}", style("# Source:").dim(), source);
    print!("{}", config.to_toml()?);
    Ok(())
}
