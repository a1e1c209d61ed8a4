use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use partscan::PipelineError;
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates different kinds of errors that can occur within the
/// server, allowing them to be converted into appropriate HTTP responses.
pub enum AppError {
    /// Errors originating from the pipeline library.
    Pipeline(PipelineError),
    /// A run is already active and a second one was requested.
    Conflict(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Pipeline(err) => {
                error!("PipelineError: {:?}", err);
                match err {
                    PipelineError::MissingApiKey | PipelineError::Initialization(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Server is not configured correctly.".to_string(),
                    ),
                    PipelineError::AiRequest(e) => (
                        StatusCode::BAD_GATEWAY,
                        format!("Request to model API failed: {e}"),
                    ),
                    PipelineError::AiDeserialization(e) => (
                        StatusCode::BAD_GATEWAY,
                        format!("Failed to deserialize model API response: {e}"),
                    ),
                    PipelineError::AiApi(e) => {
                        (StatusCode::BAD_GATEWAY, format!("Model API error: {e}"))
                    }
                    PipelineError::Listing(e) => (
                        StatusCode::BAD_GATEWAY,
                        format!("Source folder listing failed: {e}"),
                    ),
                    PipelineError::Fetch(e) | PipelineError::Relocate(e) => {
                        (StatusCode::BAD_GATEWAY, format!("Storage error: {e}"))
                    }
                    PipelineError::SheetAppend(e) => {
                        (StatusCode::BAD_GATEWAY, format!("Spreadsheet error: {e}"))
                    }
                    PipelineError::ReqwestClientBuild(e) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Failed to build HTTP client: {e}"),
                    ),
                    PipelineError::JsonSerialization(e) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Failed to serialize result: {e}"),
                    ),
                    PipelineError::Regex(e) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Internal regex error: {e}"),
                    ),
                }
            }
            AppError::Conflict(message) => (StatusCode::CONFLICT, message),
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
