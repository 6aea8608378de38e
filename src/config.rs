//! Configuration management for the RFS server
//!
//! Values are layered from built-in defaults, an optional `config.toml`,
//! `RFS_*` environment variables and finally command-line arguments.

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 7890;
const DEFAULT_CONFIG_FILE: &str = "config";

/// Command-line arguments
#[derive(Debug, Parser, Default)]
#[command(name = "rfs-server", version, about = "Serve a directory tree to remote callers")]
pub struct CliArgs {
    /// Directory to serve
    pub root: Option<String>,

    /// Path to a TOML config file (without extension is fine)
    #[arg(long)]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Directory for staging writes; must share a filesystem with the root
    #[arg(long)]
    pub staging_dir: Option<String>,

    /// Reject paths that climb out of the root
    #[arg(long)]
    pub confine: bool,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the listener
    pub bind_address: String,

    /// Port for incoming connections
    pub port: u16,

    /// Root directory served to callers
    pub server_root: String,

    /// Where Write stages contents before the atomic rename
    pub staging_dir: String,

    /// Reject relative paths that resolve outside the root
    pub confine_paths: bool,

    /// Maximum request header line, in bytes
    pub max_request_line: usize,

    /// Maximum Write payload, in bytes
    pub max_payload_bytes: u64,
}

impl ServerConfig {
    /// Configuration with defaults for everything but the root.
    pub fn new(server_root: impl Into<String>) -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            server_root: server_root.into(),
            staging_dir: "tmp".to_string(),
            confine_paths: false,
            max_request_line: 4096,
            max_payload_bytes: 1024 * 1024 * 1024,
        }
    }

    /// Load configuration with file, environment and CLI overrides
    pub fn load(args: &CliArgs) -> Result<Self, config::ConfigError> {
        let defaults = ServerConfig::new("");
        let config_file = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);

        let mut builder = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("port", defaults.port as i64)?
            .set_default("server_root", defaults.server_root)?
            .set_default("staging_dir", defaults.staging_dir)?
            .set_default("confine_paths", defaults.confine_paths)?
            .set_default("max_request_line", defaults.max_request_line as i64)?
            .set_default("max_payload_bytes", defaults.max_payload_bytes as i64)?
            .add_source(File::with_name(config_file).required(args.config.is_some()))
            .add_source(Environment::with_prefix("RFS").try_parsing(true))
            .set_override_option("server_root", args.root.clone())?
            .set_override_option("bind_address", args.bind.clone())?
            .set_override_option("port", args.port.map(i64::from))?
            .set_override_option("staging_dir", args.staging_dir.clone())?;

        if args.confine {
            builder = builder.set_override("confine_paths", true)?;
        }

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.server_root.is_empty() {
            return Err(config::ConfigError::Message(
                "server_root cannot be empty".into(),
            ));
        }

        if self.staging_dir.is_empty() {
            return Err(config::ConfigError::Message(
                "staging_dir cannot be empty".into(),
            ));
        }

        if self.max_request_line == 0 {
            return Err(config::ConfigError::Message(
                "max_request_line must be greater than 0".into(),
            ));
        }

        if self.max_payload_bytes == 0 {
            return Err(config::ConfigError::Message(
                "max_payload_bytes must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and port as a socket address string
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    pub fn staging_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.staging_dir)
    }
}
