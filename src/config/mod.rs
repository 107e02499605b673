mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

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
        "./config.toml",
        "./marquee.toml",
        "~/.config/marquee/config.toml",
        "/etc/marquee/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.tmdb.api_key.as_deref().is_some_and(str::is_empty) {
        tracing::warn!("TMDB api_key is empty; metadata routes will be unavailable");
    }

    if let Some(base_url) = &config.storage.base_url {
        url::Url::parse(base_url)
            .with_context(|| format!("Invalid storage base_url: {}", base_url))?;
        if config.storage.bucket.is_empty() {
            anyhow::bail!("Storage bucket cannot be empty");
        }
    }

    let ratio = config.player.completion_ratio;
    if !(ratio > 0.0 && ratio <= 1.0) {
        anyhow::bail!("player.completion_ratio must be in (0, 1], got {}", ratio);
    }

    if config.upload.allowed_types.is_empty() {
        tracing::warn!("No upload MIME types allowed; uploads will always be rejected");
    }

    if let Some(path) = &config.catalog.path {
        if !path.exists() {
            tracing::warn!("Catalog file does not exist yet: {:?}", path);
        }
    }

    Ok(())
}
