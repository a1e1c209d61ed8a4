#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Mock collaborators with scripted responses and call histories, so the
//! orchestrator's policy can be exercised without any network.

use async_trait::async_trait;
use partscan::providers::{ai::VisionProvider, sheet::RowSink, storage::PhotoStore};
use partscan::{
    ImagePayload, PipelineError, PromptSpec, RawModelResponse, RunConfig, SourceItem,
};
use std::sync::{Arc, Once, RwLock};
use std::time::Duration;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt::init();
    });
}

/// A `RunConfig` with timings short enough for tests.
pub fn test_config(models: &[&str]) -> RunConfig {
    RunConfig {
        source_folder: "to-analyze".to_string(),
        analyzed_folder: "analyzed".to_string(),
        models: models.iter().map(|m| m.to_string()).collect(),
        batch_size: 5,
        batch_pause: Duration::from_millis(20),
        max_attempts: 3,
        retry_delay: Duration::from_millis(5),
    }
}

/// One scripted reply for the mock vision provider.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    /// A successful submission whose body is parsed like a real response.
    Body(String),
    /// A failed submission (transport error or non-2xx).
    Fail(String),
}

// --- Mock Vision Provider ---

#[derive(Clone, Debug)]
pub struct MockVisionProvider {
    /// Model identifiers, in submission order.
    pub call_history: Arc<RwLock<Vec<String>>>,
    pub replies: Arc<RwLock<Vec<ScriptedReply>>>,
}

impl MockVisionProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            replies: Arc::new(RwLock::new(replies.into_iter().rev().collect())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.call_history.read().unwrap().clone()
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    async fn submit(
        &self,
        _image: &ImagePayload,
        _prompt: &PromptSpec,
        model: &str,
    ) -> Result<RawModelResponse, PipelineError> {
        self.call_history.write().unwrap().push(model.to_string());

        match self.replies.write().unwrap().pop() {
            Some(ScriptedReply::Body(body)) => Ok(RawModelResponse::from_body(&body)),
            Some(ScriptedReply::Fail(message)) => Err(PipelineError::AiApi(message)),
            None => Ok(RawModelResponse::Text("Default mock response".to_string())),
        }
    }
}

// --- Mock Photo Store ---

#[derive(Clone, Debug, Default)]
pub struct MockPhotoStore {
    pub items: Vec<SourceItem>,
    pub fail_listing: bool,
    /// Item ids whose fetch should fail.
    pub fail_fetch: Vec<String>,
    pub fail_relocate: bool,
    pub fetched: Arc<RwLock<Vec<String>>>,
    pub relocated: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockPhotoStore {
    pub fn with_items(items: Vec<SourceItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn failing_listing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    pub fn relocations(&self) -> Vec<(String, String)> {
        self.relocated.read().unwrap().clone()
    }
}

#[async_trait]
impl PhotoStore for MockPhotoStore {
    async fn list(&self, folder_id: &str) -> Result<Vec<SourceItem>, PipelineError> {
        if self.fail_listing {
            return Err(PipelineError::Listing(format!(
                "cannot enumerate folder {folder_id}"
            )));
        }
        Ok(self.items.clone())
    }

    async fn fetch(&self, item_id: &str) -> Result<Vec<u8>, PipelineError> {
        if self.fail_fetch.iter().any(|id| id == item_id) {
            return Err(PipelineError::Fetch(format!("download failed for {item_id}")));
        }
        self.fetched.write().unwrap().push(item_id.to_string());
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn relocate(&self, item_id: &str, target_folder_id: &str) -> Result<(), PipelineError> {
        if self.fail_relocate {
            return Err(PipelineError::Relocate(format!("move failed for {item_id}")));
        }
        self.relocated
            .write()
            .unwrap()
            .push((item_id.to_string(), target_folder_id.to_string()));
        Ok(())
    }
}

// --- Mock Row Sink ---

#[derive(Clone, Debug, Default)]
pub struct MockRowSink {
    pub rows: Arc<RwLock<Vec<Vec<String>>>>,
    pub fail: bool,
}

impl MockRowSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn appended(&self) -> Vec<Vec<String>> {
        self.rows.read().unwrap().clone()
    }
}

#[async_trait]
impl RowSink for MockRowSink {
    async fn append(&self, row: &[String]) -> Result<(), PipelineError> {
        if self.fail {
            return Err(PipelineError::SheetAppend("append rejected".to_string()));
        }
        self.rows.write().unwrap().push(row.to_vec());
        Ok(())
    }
}
