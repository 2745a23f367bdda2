// Configuration loading and parsing (config/pickban.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the single config file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "pickban.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// pickban.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where to find the game client and how often to retry.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Install directory holding the client's lockfile.
    pub install_dir: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

/// The local WebSocket the overlay page connects to.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the log file, relative to the working directory.
    pub dir: String,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".into(),
            filter: "pickban_core=info,pickban=info,warn".into(),
        }
    }
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/pickban.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()` which does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Seed `config/pickban.toml` from the `defaults/pickban.toml` template.
///
/// Returns the path written, or `None` when a config file is already in
/// place. An existing file is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }

    let template = base_dir.join("defaults").join(CONFIG_FILE);
    let content = std::fs::read(&template).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!(
            "{} is missing and the template {} could not be read ({e}); \
             run from the install directory or create the config by hand",
            target.display(),
            template.display()
        ),
    })?;

    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", config_dir.display()),
    })?;

    // `create_new` so a file written concurrently is left untouched.
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(Some(target))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Load config relative to the current working directory, copying defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.client.install_dir.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "client.install_dir".into(),
            message: "must not be empty".into(),
        });
    }

    if config.client.reconnect_delay_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "client.reconnect_delay_ms".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.overlay.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "overlay.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.logging.dir.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.dir".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
