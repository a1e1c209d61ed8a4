//! # `partscan-drive`: Google Drive Storage Provider
//!
//! Implements the `PhotoStore` trait over the Drive v3 REST API: folder
//! listing, media download, and the addParents/removeParents move. Auth is
//! a static bearer token; token refresh is out of scope.

use async_trait::async_trait;
use partscan::{providers::storage::PhotoStore, PipelineError, SourceItem};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

// --- Error Definitions ---

#[derive(Error, Debug, Clone)]
pub enum DriveError {
    #[error("Failed to list folder: {0}")]
    List(String),
    #[error("Failed to download file: {0}")]
    Download(String),
    #[error("Failed to move file: {0}")]
    Move(String),
}

/// A helper to convert the specific `DriveError` into the pipeline error
/// taxonomy the orchestrator branches on.
impl From<DriveError> for PipelineError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::List(msg) => PipelineError::Listing(msg),
            DriveError::Download(msg) => PipelineError::Fetch(msg),
            DriveError::Move(msg) => PipelineError::Relocate(msg),
        }
    }
}

// --- Drive wire structures ---

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
}

#[derive(Deserialize)]
struct FileParents {
    #[serde(default)]
    parents: Vec<String>,
}

// --- Provider implementation ---

/// A `PhotoStore` backed by Google Drive.
#[derive(Clone, Debug)]
pub struct DriveStore {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl DriveStore {
    /// Creates a new `DriveStore` against the public Drive endpoint.
    pub fn new(api_token: String) -> Result<Self, PipelineError> {
        Self::with_base_url(api_token, DEFAULT_BASE_URL.to_string())
    }

    /// Creates a `DriveStore` against an arbitrary base URL, for tests.
    pub fn with_base_url(api_token: String, base_url: String) -> Result<Self, PipelineError> {
        if api_token.is_empty() {
            return Err(PipelineError::Initialization(
                "Drive API token is empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(PipelineError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    async fn current_parents(&self, item_id: &str) -> Result<Vec<String>, DriveError> {
        let url = format!("{}/drive/v3/files/{item_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&[("fields", "parents")])
            .send()
            .await
            .map_err(|e| DriveError::Move(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DriveError::Move(format!(
                "parents lookup failed with status {}",
                response.status()
            )));
        }
        let parents: FileParents = response
            .json()
            .await
            .map_err(|e| DriveError::Move(e.to_string()))?;
        Ok(parents.parents)
    }
}

#[async_trait]
impl PhotoStore for DriveStore {
    /// Lists the image files in a folder.
    async fn list(&self, folder_id: &str) -> Result<Vec<SourceItem>, PipelineError> {
        let url = format!("{}/drive/v3/files", self.base_url);
        let query = format!("'{folder_id}' in parents and mimeType contains 'image/'");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name,mimeType)")])
            .send()
            .await
            .map_err(|e| DriveError::List(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DriveError::List(format!(
                "listing failed with status {}",
                response.status()
            ))
            .into());
        }
        let listing: FileList = response
            .json()
            .await
            .map_err(|e| DriveError::List(e.to_string()))?;

        info!(folder_id, count = listing.files.len(), "Listed source folder");
        Ok(listing
            .files
            .into_iter()
            .map(|f| SourceItem {
                id: f.id,
                name: f.name,
                mime_type: f.mime_type,
            })
            .collect())
    }

    /// Downloads one file's bytes via `alt=media`.
    async fn fetch(&self, item_id: &str) -> Result<Vec<u8>, PipelineError> {
        let url = format!("{}/drive/v3/files/{item_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| DriveError::Download(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DriveError::Download(format!(
                "download failed with status {}",
                response.status()
            ))
            .into());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DriveError::Download(e.to_string()))?;
        debug!(item_id, size = bytes.len(), "Downloaded file bytes");
        Ok(bytes.to_vec())
    }

    /// Moves a file by swapping its parents. Already-moved files are a no-op
    /// on the Drive side, so the operation is idempotent.
    async fn relocate(&self, item_id: &str, target_folder_id: &str) -> Result<(), PipelineError> {
        let previous = self.current_parents(item_id).await?;
        let url = format!("{}/drive/v3/files/{item_id}", self.base_url);
        let mut query = vec![
            ("addParents", target_folder_id.to_string()),
            ("fields", "id, parents".to_string()),
        ];
        if !previous.is_empty() {
            query.push(("removeParents", previous.join(",")));
        }
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_token)
            .query(&query)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| DriveError::Move(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DriveError::Move(format!(
                "move failed with status {}",
                response.status()
            ))
            .into());
        }
        info!(item_id, target_folder_id, "Moved file");
        Ok(())
    }
}
