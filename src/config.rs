//! Application configuration.
//!
//! Configuration is an explicit object constructed once at startup and
//! passed to components, layered from defaults, an optional YAML file,
//! `PI_`-prefixed environment variables, and CLI flags. Agent credentials
//! come from the environment only.

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::agent::AgentSettings;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory for uploaded documents
    #[arg(long, env = "UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Directory for predefined portfolio CSV files
    #[arg(long, env = "PORTFOLIO_DIR")]
    pub portfolio_dir: Option<PathBuf>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub portfolio_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_disabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("storage.upload_dir", "uploads")?
            .set_default("storage.portfolio_dir", "portfolios")?
            .set_default("resilience.timeout_disabled", false)?;

        // Optional config file: explicit path wins, otherwise ./config.yaml
        // if present.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // Environment variables prefixed with PI_, e.g. PI_SERVER__PORT=8000.
        // Without an explicit prefix separator the collection separator is
        // reused, which would require PI__SERVER__PORT.
        builder = builder.add_source(
            Environment::with_prefix("PI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // CLI flags (and their clap-bound env vars) take highest priority.
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(dir) = &cli.upload_dir {
            builder = builder.set_override("storage.upload_dir", dir.display().to_string())?;
        }
        if let Some(dir) = &cli.portfolio_dir {
            builder = builder.set_override("storage.portfolio_dir", dir.display().to_string())?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

/// Load agent credentials and model settings from the environment.
///
/// `GEMINI_API_KEY` is required; base URL and model have hosted defaults.
pub fn load_agent_settings() -> Result<AgentSettings, String> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| "Missing required env var: GEMINI_API_KEY".to_string())?;

    let base_url = std::env::var("AGENT_BASE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string());

    let model = std::env::var("AGENT_MODEL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "gemini-2.0-flash-exp".to_string());

    Ok(AgentSettings {
        base_url,
        api_key,
        model,
    })
}
