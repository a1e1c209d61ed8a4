//! # Application Configuration
//!
//! Defines the configuration structure for `partscan-server` and the logic
//! for loading it from `config.yml` plus environment variables. `${VAR}`
//! placeholders in the file are substituted from the environment, and both
//! top-level keys (`PORT`) and nested keys (`PARTSCAN_BATCH__SIZE`) can be
//! overridden.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use partscan::{prompts, PromptSpec, RunConfig};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::time::Duration;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token for the Drive and Sheets APIs. Loaded from
    /// `GOOGLE_API_TOKEN`. Token refresh is out of scope.
    #[serde(default)]
    pub google_api_token: String,
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_range")]
    pub sheet_range: String,
    /// The folder holding photos waiting for analysis.
    #[serde(default)]
    pub source_folder_id: String,
    /// The folder processed photos are moved into.
    #[serde(default)]
    pub analyzed_folder_id: String,
    /// Override for the Drive endpoint, used by tests.
    #[serde(default)]
    pub drive_base_url: Option<String>,
    /// Override for the Sheets endpoint, used by tests.
    #[serde(default)]
    pub sheets_base_url: Option<String>,
    /// The vision model provider configuration.
    pub provider: ProviderConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
}

fn default_port() -> u16 {
    9090
}

fn default_sheet_range() -> String {
    "Sheet1".to_string()
}

/// Configuration for the vision model provider.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider ("openai" or "local").
    pub provider: String,
    /// The API URL. Optional for openai, where the default endpoint applies.
    pub api_url: Option<String>,
    /// The API key, which can be null for local providers.
    pub api_key: Option<String>,
    /// The model fallback chain, ordered by preference.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

fn default_models() -> Vec<String> {
    vec!["gpt-4o-mini".to_string()]
}

/// Batch policy knobs. Defaults match the original intake service.
#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_batch_size")]
    pub size: usize,
    #[serde(default = "default_pause_seconds")]
    pub pause_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
}

fn default_batch_size() -> usize {
    5
}
fn default_pause_seconds() -> u64 {
    5
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_seconds() -> u64 {
    2
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            pause_seconds: default_pause_seconds(),
            max_attempts: default_max_attempts(),
            retry_delay_seconds: default_retry_delay_seconds(),
        }
    }
}

/// Optional overrides for the instruction pair.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptConfig {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl AppConfig {
    /// The orchestrator tunables derived from this configuration.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            source_folder: self.source_folder_id.clone(),
            analyzed_folder: self.analyzed_folder_id.clone(),
            models: self.provider.models.clone(),
            batch_size: self.batch.size,
            batch_pause: Duration::from_secs(self.batch.pause_seconds),
            max_attempts: self.batch.max_attempts,
            retry_delay: Duration::from_secs(self.batch.retry_delay_seconds),
        }
    }

    /// The instruction pair for a run, falling back to the library defaults.
    pub fn prompt_spec(&self) -> PromptSpec {
        PromptSpec::new(
            self.prompts
                .system
                .clone()
                .unwrap_or_else(|| prompts::PARTS_ANALYSIS_SYSTEM_PROMPT.to_string()),
            self.prompts
                .user
                .clone()
                .unwrap_or_else(|| prompts::PARTS_ANALYSIS_USER_PROMPT.to_string()),
        )
    }
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(format!("Invalid substitution pattern: {e}")))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_else(|_| "".to_string())
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// - Top-level keys like `port` are overridden by `PORT` and friends.
/// - Nested keys are overridden by `PARTSCAN_...` variables
///   (e.g. `PARTSCAN_BATCH__SIZE`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let config_path = match config_path_override {
        Some(path) => path.to_string(),
        None => format!("{}/config.yml", env!("CARGO_MANIFEST_DIR")),
    };

    let content = read_and_substitute(&config_path)?.ok_or_else(|| {
        ConfigError::NotFound(format!("Config file not found at '{config_path}'."))
    })?;
    info!("Loading configuration from '{config_path}'.");

    let settings = ConfigBuilder::builder()
        .add_source(File::from_str(&content, FileFormat::Yaml))
        // Environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Prefixed environment variables for deeper overrides.
        .add_source(
            Environment::with_prefix("PARTSCAN")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    Ok(config)
}
