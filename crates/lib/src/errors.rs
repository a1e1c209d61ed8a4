use thiserror::Error;

/// Custom error types for the pipeline.
///
/// Only `Initialization` and `Listing` abort a run. Submission errors are
/// absorbed by the orchestrator's model-fallback and retry handling, and
/// sink errors (`Relocate`, `SheetAppend`) are logged per item.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Request to model API failed: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize model API response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("Model API returned an error: {0}")]
    AiApi(String),
    #[error("API key is missing")]
    MissingApiKey,
    #[error("Collaborator initialization failed: {0}")]
    Initialization(String),
    #[error("Failed to list source folder: {0}")]
    Listing(String),
    #[error("Failed to fetch item content: {0}")]
    Fetch(String),
    #[error("Failed to relocate item: {0}")]
    Relocate(String),
    #[error("Failed to append spreadsheet row: {0}")]
    SheetAppend(String),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}
