use crate::errors::PipelineError;
use async_trait::async_trait;
use std::fmt::Debug;

/// A trait for the spreadsheet collaborator: a fixed-width row append.
///
/// Append failures are per-item and non-fatal; the orchestrator logs them
/// and keeps going. Duplicate rows on retry are an accepted risk.
#[async_trait]
pub trait RowSink: Send + Sync + Debug {
    /// Appends one row of cells to the sheet.
    async fn append(&self, row: &[String]) -> Result<(), PipelineError>;
}
