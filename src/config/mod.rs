mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./localreel.toml",
        "~/.config/localreel/config.toml",
        "/etc/localreel/config.toml",
    ];

    for path_str in default_paths {
        let path = expand_path(Path::new(path_str));
        if path.exists() {
            return load_config(&path);
        }
    }

    Ok(Config::default())
}

/// Expand a leading `~` in a configured path
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.stream.window_bytes == 0 {
        anyhow::bail!("Stream window size cannot be 0");
    }

    if config.player.command.trim().is_empty() {
        anyhow::bail!("Player command cannot be empty");
    }

    if config.assets.version.trim().is_empty() {
        anyhow::bail!("Asset cache version cannot be empty");
    }

    if config.assets.port == 0 {
        anyhow::bail!("Asset server port cannot be 0");
    }

    for path in &config.assets.manifest {
        if !path.starts_with('/') {
            anyhow::bail!("Manifest entry '{}' must be an absolute path", path);
        }
    }

    if let Some(origin) = &config.assets.origin {
        reqwest::Url::parse(origin)
            .with_context(|| format!("Invalid asset origin: {}", origin))?;
    }

    Ok(())
}
