//! Configuration file loader for the `.steplog/` directory.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use sl_protocol::GlobalConfig;
use std::path::Path;

/// Directory holding project-local settings.
pub const CONFIG_DIR: &str = ".steplog";

/// Settings file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Loads `.steplog/config.toml` under `root`.
///
/// A missing directory or file yields the default configuration rather than
/// an error.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, is not valid
/// TOML, or holds values that cannot be used.
///
/// # Example
///
/// ```rust,no_run
/// use sl_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Talking to {}", config.server);
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    load_config_file(&config_path).await
}

/// Loads an explicit configuration file. Unlike [`load_config`], the file
/// must exist.
pub async fn load_config_file(path: &Path) -> ConfigResult<GlobalConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    let config: GlobalConfig = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&config).map_err(|reason| ConfigError::InvalidConfig {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok(config)
}

fn validate(config: &GlobalConfig) -> Result<(), String> {
    if !(config.server.starts_with("http://") || config.server.starts_with("https://")) {
        return Err(format!(
            "server must be an http(s) URL, got '{}'",
            config.server
        ));
    }
    if config.poll_interval_ms == 0 {
        return Err("poll_interval_ms must be greater than zero".to_string());
    }
    if config.frame_interval_ms == 0 {
        return Err("frame_interval_ms must be greater than zero".to_string());
    }
    Ok(())
}
