//! TOML Configuration File Support
//!
//! Centralized configuration loading for the builder, supporting a TOML file
//! at `~/.config/site-builder/builder.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/site-builder/builder.toml` (typically `~/.config/site-builder/builder.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:3000"
//! timeout_secs = 300
//!
//! [model]
//! default = "gpt-4o-mini"
//!
//! [progress]
//! initial_delay_ms = 500
//! interval_ms = 2000
//!
//! [storage]
//! data_dir = "/home/me/.local/share/site-builder"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DEFAULT_MODEL;
use crate::progress::ProgressTiming;
use crate::versions::FileStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[api]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Base URL of the generation service
    pub base_url: Option<String>,

    /// Overall request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// `[model]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelToml {
    /// Default model key
    pub default: Option<String>,
}

/// `[progress]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressToml {
    /// Delay before the second stage, in milliseconds
    pub initial_delay_ms: Option<u64>,

    /// Interval between later stages, in milliseconds
    pub interval_ms: Option<u64>,
}

/// `[storage]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageToml {
    /// Directory holding persisted version history
    pub data_dir: Option<PathBuf>,
}

/// Root TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderToml {
    /// Generation endpoint settings
    pub api: ApiToml,
    /// Model selection
    pub model: ModelToml,
    /// Progress ticker timing
    pub progress: ProgressToml,
    /// Version storage
    pub storage: StorageToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Default generation service URL
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default overall request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Generation endpoint settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the generation service
    pub base_url: String,
    /// Overall request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Fully resolved builder configuration
#[derive(Clone, Debug)]
pub struct BuilderConfig {
    /// Generation endpoint settings
    pub api: ApiConfig,

    /// Model key selected at startup
    pub default_model: String,

    /// Progress ticker timing
    pub progress: ProgressTiming,

    /// Explicit version storage directory (`None` = XDG data dir)
    pub data_dir: Option<PathBuf>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Highest-priority source that contributed a value
    source: ConfigSource,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            default_model: DEFAULT_MODEL.to_string(),
            progress: ProgressTiming::default(),
            data_dir: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl BuilderConfig {
    /// Create with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the configuration source
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Directory for version storage, falling back to the XDG data dir
    #[must_use]
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(FileStorage::default_dir)
    }

    /// Check values that would make the builder unusable
    ///
    /// The model key is not checked here; an unknown key is reported when a
    /// message is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.progress.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "progress.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.default must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/site-builder/builder.toml` or
/// `~/.config/site-builder/builder.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("site-builder").join("builder.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<BuilderConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<BuilderConfig, ConfigError> {
    let mut config = BuilderConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: BuilderToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |name| std::env::var(name).ok());

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut BuilderConfig, toml: &BuilderToml) {
    if let Some(ref url) = toml.api.base_url {
        config.api.base_url = url.clone();
    }
    if let Some(timeout) = toml.api.timeout_secs {
        config.api.timeout_secs = timeout;
    }

    if let Some(ref model) = toml.model.default {
        config.default_model = model.clone();
    }

    if let Some(delay) = toml.progress.initial_delay_ms {
        config.progress.initial_delay = Duration::from_millis(delay);
    }
    if let Some(interval) = toml.progress.interval_ms {
        config.progress.interval = Duration::from_millis(interval);
    }

    if toml.storage.data_dir.is_some() {
        config.data_dir = toml.storage.data_dir.clone();
    }
}

/// Apply environment variable overrides to the config
///
/// `lookup` resolves a variable name; unparseable values are ignored.
fn apply_env_config<F>(config: &mut BuilderConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("SITE_BUILDER_API_URL") {
        config.api.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = lookup("SITE_BUILDER_TIMEOUT") {
        match timeout.parse::<u64>() {
            Ok(secs) => {
                config.api.timeout_secs = secs;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid SITE_BUILDER_TIMEOUT"),
        }
    }
    if let Some(model) = lookup("SITE_BUILDER_MODEL") {
        config.default_model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(dir) = lookup("SITE_BUILDER_DATA_DIR") {
        config.data_dir = Some(PathBuf::from(dir));
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// CLI argument overrides for configuration
///
/// Values set here take the highest priority.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Override the generation service URL
    pub api_url: Option<String>,
    /// Override the model key
    pub model: Option<String>,
    /// Override the request timeout
    pub timeout_secs: Option<u64>,
    /// Override the storage directory
    pub data_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create empty overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generation service URL
    #[must_use]
    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = Some(url);
        self
    }

    /// Set the model key
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Set the storage directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    /// Apply overrides to a config
    pub fn apply(&self, config: &mut BuilderConfig) {
        if let Some(ref url) = self.api_url {
            config.api.base_url = url.clone();
            config.source = ConfigSource::Cli;
        }
        if let Some(ref model) = self.model {
            config.default_model = model.clone();
            config.source = ConfigSource::Cli;
        }
        if let Some(secs) = self.timeout_secs {
            config.api.timeout_secs = secs;
            config.source = ConfigSource::Cli;
        }
        if let Some(ref dir) = self.data_dir {
            config.data_dir = Some(dir.clone());
            config.source = ConfigSource::Cli;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
