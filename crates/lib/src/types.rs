//! Core data types shared by the extractor, the orchestrator, and the
//! collaborator crates.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;

/// The reserved value for a field the extractor could not determine.
pub const UNKNOWN: &str = "UNKNOWN";

/// The canonical output fields, in spreadsheet column order.
pub const FIELD_NAMES: [&str; 6] = [
    "catalog_number",
    "description",
    "manufacturer",
    "analogs",
    "machine_type",
    "machine_model",
];

/// How many status lines a run keeps around for pollers.
const RECENT_STATUS_CAP: usize = 50;

/// One file discovered in the source folder. Immutable once listed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl SourceItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: None,
        }
    }
}

/// An image ready for submission, encoded as a base64 data URI.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    data_uri: String,
}

impl ImagePayload {
    /// Encodes raw image bytes. Falls back to `image/png` when the source
    /// listing did not carry a MIME type.
    pub fn from_bytes(bytes: &[u8], mime_type: Option<&str>) -> Self {
        let mime = mime_type.unwrap_or("image/png");
        Self {
            data_uri: format!("data:{mime};base64,{}", STANDARD.encode(bytes)),
        }
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    /// The bare base64 payload, without the `data:` prefix.
    pub fn base64_data(&self) -> &str {
        self.data_uri
            .split_once(',')
            .map(|(_, data)| data)
            .unwrap_or(&self.data_uri)
    }
}

/// The immutable instruction pair sent with every submission in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSpec {
    pub system: String,
    pub user: String,
}

impl PromptSpec {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// An opaque model response: a decoded JSON document when the body parses,
/// otherwise the raw text. The extractor owns all shape-sniffing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelResponse {
    Json(Value),
    Text(String),
}

impl RawModelResponse {
    /// Wraps a response body, preferring the JSON form when it parses.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(body.to_string()),
        }
    }
}

/// The canonical extraction output. Every field is always populated: either
/// a trimmed non-empty string or the [`UNKNOWN`] sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub catalog_number: String,
    pub description: String,
    pub manufacturer: String,
    pub analogs: String,
    pub machine_type: String,
    pub machine_model: String,
}

impl ExtractedRecord {
    /// A record with every field set to the sentinel.
    pub fn unknown() -> Self {
        Self {
            catalog_number: UNKNOWN.to_string(),
            description: UNKNOWN.to_string(),
            manufacturer: UNKNOWN.to_string(),
            analogs: UNKNOWN.to_string(),
            machine_type: UNKNOWN.to_string(),
            machine_model: UNKNOWN.to_string(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "catalog_number" => Some(&self.catalog_number),
            "description" => Some(&self.description),
            "manufacturer" => Some(&self.manufacturer),
            "analogs" => Some(&self.analogs),
            "machine_type" => Some(&self.machine_type),
            "machine_model" => Some(&self.machine_model),
            _ => None,
        }
    }

    /// Sets a canonical field by name. Unknown names are ignored.
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        match field {
            "catalog_number" => self.catalog_number = value,
            "description" => self.description = value,
            "manufacturer" => self.manufacturer = value,
            "analogs" => self.analogs = value,
            "machine_type" => self.machine_type = value,
            "machine_model" => self.machine_model = value,
            _ => {}
        }
    }

    /// Counts fields holding a value other than the sentinel.
    pub fn recognized_fields(&self) -> usize {
        FIELD_NAMES
            .iter()
            .filter(|name| self.get(name).is_some_and(|v| v != UNKNOWN))
            .count()
    }

    /// A record is useful when at least one field was determined.
    pub fn is_useful(&self) -> bool {
        self.recognized_fields() > 0
    }

    /// The six fields in canonical column order.
    pub fn to_row(&self) -> Vec<String> {
        FIELD_NAMES
            .iter()
            .map(|name| self.get(name).unwrap_or(UNKNOWN).to_string())
            .collect()
    }
}

impl Default for ExtractedRecord {
    fn default() -> Self {
        Self::unknown()
    }
}

/// The final result for one listed item. Exactly one outcome is emitted per
/// item, even when every submission failed.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub item: SourceItem,
    pub record: ExtractedRecord,
    /// The model whose submission produced the accepted response, if any
    /// submission succeeded at all.
    pub model_used: Option<String>,
    /// Submission rounds spent on this item.
    pub attempts: u32,
}

/// Tunables for one batch run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source_folder: String,
    pub analyzed_folder: String,
    /// Model fallback chain, ordered by preference.
    pub models: Vec<String>,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RunConfig {
    pub fn new(source_folder: impl Into<String>, analyzed_folder: impl Into<String>) -> Self {
        Self {
            source_folder: source_folder.into(),
            analyzed_folder: analyzed_folder.into(),
            models: vec!["gpt-4o-mini".to_string()],
            batch_size: 5,
            batch_pause: Duration::from_secs(5),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Mutable run progress, owned by the orchestrator's worker and read by
/// pollers through [`RunSnapshot`] copies.
#[derive(Debug, Default)]
pub struct BatchRunState {
    pub total: usize,
    pub processed: usize,
    pub current_item: Option<String>,
    pub recent: VecDeque<String>,
    pub finished: bool,
    pub error: Option<String>,
}

impl BatchRunState {
    pub fn push_status(&mut self, line: impl Into<String>) {
        if self.recent.len() == RECENT_STATUS_CAP {
            self.recent.pop_front();
        }
        self.recent.push_back(line.into());
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            total: self.total,
            processed: self.processed,
            current_item: self.current_item.clone(),
            recent: self.recent.iter().cloned().collect(),
            finished: self.finished,
            error: self.error.clone(),
        }
    }
}

/// A consistent, immutable view of a run's progress.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub total: usize,
    pub processed: usize,
    pub current_item: Option<String>,
    pub recent: Vec<String>,
    pub finished: bool,
    pub error: Option<String>,
}
