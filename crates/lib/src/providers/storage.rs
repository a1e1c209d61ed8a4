use crate::errors::PipelineError;
use crate::types::SourceItem;
use async_trait::async_trait;
use std::fmt::Debug;

/// A trait for the cloud file storage collaborator.
///
/// The orchestrator only needs three operations: enumerate a folder, pull
/// one file's bytes, and relocate a processed file. Concrete providers
/// (Google Drive) live in their own crate.
#[async_trait]
pub trait PhotoStore: Send + Sync + Debug {
    /// Lists the image files in a folder, in the storage service's order.
    async fn list(&self, folder_id: &str) -> Result<Vec<SourceItem>, PipelineError>;

    /// Downloads one item's raw bytes.
    async fn fetch(&self, item_id: &str) -> Result<Vec<u8>, PipelineError>;

    /// Moves an item into the target folder. Idempotent if already moved.
    async fn relocate(&self, item_id: &str, target_folder_id: &str) -> Result<(), PipelineError>;
}
