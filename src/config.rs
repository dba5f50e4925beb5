//! Configuration module for the echo log server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values. With no
//! arguments at all the server binds an OS-chosen ephemeral port and
//! journals to `echo_server.log` in the working directory.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// How accepted connections are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServeMode {
    /// Serve one connection at a time from the accept loop
    Sequential,
    /// Spawn a task per connection
    Concurrent,
}

/// Command-line arguments for the echo server
#[derive(Parser, Debug)]
#[command(name = "echo-log-server")]
#[command(author = "echo-log-server authors")]
#[command(version = "0.1.0")]
#[command(about = "An HTTP echo server that journals POST bodies", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:0)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Path of the append-only echo log
    #[arg(short = 'f', long)]
    pub log_file: Option<PathBuf>,

    /// Connection scheduling mode
    #[arg(short = 'm', long, value_enum)]
    pub mode: Option<ServeMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Connection scheduling mode
    #[serde(default = "default_mode")]
    pub mode: ServeMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            mode: default_mode(),
        }
    }
}

/// Echo journal configuration
#[derive(Debug, Deserialize)]
pub struct JournalConfig {
    /// Path of the append-only log file
    #[serde(default = "default_log_file")]
    pub path: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: default_log_file(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:0".to_string()
}

fn default_mode() -> ServeMode {
    ServeMode::Sequential
}

fn default_log_file() -> PathBuf {
    PathBuf::from("echo_server.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub log_file: PathBuf,
    pub mode: ServeMode,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            log_file: cli.log_file.unwrap_or(toml_config.journal.path),
            mode: cli.mode.unwrap_or(toml_config.server.mode),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
}
