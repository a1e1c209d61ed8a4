//! # `partscan-sheets`: Google Sheets Row Sink
//!
//! Implements the `RowSink` trait over the Sheets v4 `values:append`
//! endpoint. One extracted record becomes one appended row; duplicate rows
//! on retry are accepted rather than deduplicated.

use async_trait::async_trait;
use partscan::{providers::sheet::RowSink, PipelineError};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

// --- Error Definitions ---

#[derive(Error, Debug, Clone)]
pub enum SheetError {
    #[error("Failed to append row: {0}")]
    Append(String),
}

impl From<reqwest::Error> for SheetError {
    fn from(err: reqwest::Error) -> Self {
        SheetError::Append(err.to_string())
    }
}

impl From<SheetError> for PipelineError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::Append(msg) => PipelineError::SheetAppend(msg),
        }
    }
}

// --- Sheets wire structures ---

#[derive(Serialize)]
struct AppendBody<'a> {
    values: Vec<&'a [String]>,
}

// --- Sink implementation ---

/// A `RowSink` backed by one Google Sheet.
#[derive(Clone, Debug)]
pub struct SheetsAppender {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    spreadsheet_id: String,
    range: String,
}

impl SheetsAppender {
    /// Creates a new `SheetsAppender` for the given spreadsheet. `range`
    /// names the target sheet/area, e.g. `Sheet1`.
    pub fn new(
        api_token: String,
        spreadsheet_id: String,
        range: String,
    ) -> Result<Self, PipelineError> {
        Self::with_base_url(api_token, spreadsheet_id, range, DEFAULT_BASE_URL.to_string())
    }

    /// Creates a `SheetsAppender` against an arbitrary base URL, for tests.
    pub fn with_base_url(
        api_token: String,
        spreadsheet_id: String,
        range: String,
        base_url: String,
    ) -> Result<Self, PipelineError> {
        if api_token.is_empty() {
            return Err(PipelineError::Initialization(
                "Sheets API token is empty".to_string(),
            ));
        }
        if spreadsheet_id.is_empty() {
            return Err(PipelineError::Initialization(
                "spreadsheet id is empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(PipelineError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            base_url,
            api_token,
            spreadsheet_id,
            range,
        })
    }
}

#[async_trait]
impl RowSink for SheetsAppender {
    async fn append(&self, row: &[String]) -> Result<(), PipelineError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.base_url, self.spreadsheet_id, self.range
        );
        let body = AppendBody { values: vec![row] };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .send()
            .await
            .map_err(SheetError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SheetError::Append(format!("status {status}: {text}")).into());
        }

        info!(cells = row.len(), "Appended spreadsheet row");
        Ok(())
    }
}
