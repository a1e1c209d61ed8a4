//! # Application State
//!
//! Defines the shared application state (`AppState`) and the logic for
//! building it at startup. The state holds the configuration, the
//! collaborator clients, and the currently active run (if any).

use crate::config::AppConfig;
use partscan::providers::{
    ai::{local::LocalAiProvider, openai::OpenAiProvider, VisionProvider},
    sheet::RowSink,
    storage::PhotoStore,
};
use partscan::Orchestrator;
use partscan_drive::DriveStore;
use partscan_sheets::SheetsAppender;
use std::sync::Arc;
use tokio::sync::RwLock;

const OPENAI_DEFAULT_API_URL: &str = "https://api.openai.com/v1/responses";

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    pub vision: Arc<dyn VisionProvider>,
    pub store: Arc<dyn PhotoStore>,
    pub sink: Arc<dyn RowSink>,
    /// The currently tracked run. Replaced when a new run starts.
    pub current_run: Arc<RwLock<Option<Arc<Orchestrator>>>>,
}

/// Builds the shared application state from the configuration.
///
/// All collaborator clients are constructed here, so missing credentials
/// surface as an initialization failure before any run can start.
pub fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let vision: Arc<dyn VisionProvider> = match config.provider.provider.as_str() {
        "openai" => {
            let api_key = config.provider.api_key.clone().ok_or_else(|| {
                anyhow::anyhow!("api_key is required for the openai provider")
            })?;
            let api_url = config
                .provider
                .api_url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_API_URL.to_string());
            Arc::new(OpenAiProvider::new(api_url, api_key)?)
        }
        "local" => {
            let api_url = config.provider.api_url.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "api_url is required for the local provider. Please set it in config.yml."
                )
            })?;
            Arc::new(LocalAiProvider::new(api_url, config.provider.api_key.clone())?)
        }
        other => {
            return Err(anyhow::anyhow!("Unsupported vision provider type '{other}'"));
        }
    };

    let store: Arc<dyn PhotoStore> = match &config.drive_base_url {
        Some(base_url) => Arc::new(DriveStore::with_base_url(
            config.google_api_token.clone(),
            base_url.clone(),
        )?),
        None => Arc::new(DriveStore::new(config.google_api_token.clone())?),
    };

    let sink: Arc<dyn RowSink> = match &config.sheets_base_url {
        Some(base_url) => Arc::new(SheetsAppender::with_base_url(
            config.google_api_token.clone(),
            config.spreadsheet_id.clone(),
            config.sheet_range.clone(),
            base_url.clone(),
        )?),
        None => Arc::new(SheetsAppender::new(
            config.google_api_token.clone(),
            config.spreadsheet_id.clone(),
            config.sheet_range.clone(),
        )?),
    };

    Ok(AppState {
        config: Arc::new(config),
        vision,
        store,
        sink,
        current_run: Arc::new(RwLock::new(None)),
    })
}
