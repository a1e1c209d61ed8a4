//! # Batch Orchestrator
//!
//! Drives the per-item pipeline (fetch, submit, extract, append, relocate)
//! over a listed folder, with model fallback, retry-on-empty-extraction,
//! fixed-size batches separated by pauses, and poller-visible run state.

use crate::errors::PipelineError;
use crate::extract::extract_record;
use crate::providers::{ai::VisionProvider, sheet::RowSink, storage::PhotoStore};
use crate::types::{
    BatchRunState, ExtractedRecord, ImagePayload, ItemOutcome, PromptSpec, RawModelResponse,
    RunConfig, RunSnapshot, SourceItem,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};
use tracing::{error, info, warn};

/// Drives one end-to-end batch run.
///
/// The orchestrator is the only writer of its [`BatchRunState`]; pollers
/// read consistent copies through [`Orchestrator::snapshot`]. Cancellation
/// is checked between batches only, so an in-flight batch always completes.
pub struct Orchestrator {
    vision: Arc<dyn VisionProvider>,
    store: Arc<dyn PhotoStore>,
    sink: Arc<dyn RowSink>,
    prompt: PromptSpec,
    config: RunConfig,
    state: Mutex<BatchRunState>,
    cancelled: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        vision: Arc<dyn VisionProvider>,
        store: Arc<dyn PhotoStore>,
        sink: Arc<dyn RowSink>,
        prompt: PromptSpec,
        config: RunConfig,
    ) -> Self {
        Self {
            vision,
            store,
            sink,
            prompt,
            config,
            state: Mutex::new(BatchRunState::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// A consistent view of the run's progress, for polling callers.
    pub fn snapshot(&self) -> RunSnapshot {
        self.state().snapshot()
    }

    /// Signals the run to halt after the in-flight batch.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, BatchRunState> {
        self.state.lock().expect("run state lock poisoned")
    }

    fn push_status(&self, line: impl Into<String>) {
        self.state().push_status(line);
    }

    /// Runs the full pipeline over the source folder.
    ///
    /// Listing failure is run-fatal. Everything downstream is absorbed per
    /// item: the returned list holds exactly one outcome per listed item,
    /// in source order, unless the run was cancelled partway.
    pub async fn run(&self) -> Result<Vec<ItemOutcome>, PipelineError> {
        let items = match self.store.list(&self.config.source_folder).await {
            Ok(items) => items,
            Err(e) => {
                error!("Drive list failed: {e}");
                let mut state = self.state();
                state.error = Some(e.to_string());
                state.finished = true;
                return Err(e);
            }
        };

        {
            let mut state = self.state();
            state.total = items.len();
            state.push_status(format!("Files to analyze: {}", items.len()));
        }
        info!("Files to analyze: {}", items.len());

        let batch_size = self.config.batch_size.max(1);
        let batch_count = items.len().div_ceil(batch_size);
        let mut outcomes = Vec::with_capacity(items.len());

        for (index, batch) in items.chunks(batch_size).enumerate() {
            if index > 0 {
                if self.is_cancelled() {
                    warn!("Run cancelled, halting before batch {}", index + 1);
                    self.push_status("Run cancelled");
                    break;
                }
                self.push_status(format!(
                    "Pausing {}s before next batch",
                    self.config.batch_pause.as_secs()
                ));
                tokio::time::sleep(self.config.batch_pause).await;
            }

            info!(
                "Processing batch {}/{batch_count}, size={}",
                index + 1,
                batch.len()
            );
            self.push_status(format!(
                "Processing batch {}/{batch_count}, size={}",
                index + 1,
                batch.len()
            ));

            for item in batch {
                self.state().current_item = Some(item.name.clone());
                let outcome = self.process_item(item).await;
                self.write_sinks(&outcome).await;
                {
                    let mut state = self.state();
                    state.processed += 1;
                }
                outcomes.push(outcome);
            }
        }

        let mut state = self.state();
        state.current_item = None;
        state.finished = true;
        state.push_status(format!("Run complete: {} items processed", outcomes.len()));
        drop(state);

        Ok(outcomes)
    }

    /// Runs the submit/extract state machine for one item.
    ///
    /// Each attempt walks the model fallback chain from the top; a round
    /// whose extraction recognizes nothing sleeps and retries, while a round
    /// where every model's submission failed finishes the item immediately
    /// with a fully-sentinel record. The item is never dropped.
    async fn process_item(&self, item: &SourceItem) -> ItemOutcome {
        info!("Processing file {} ({})", item.name, item.id);

        let bytes = match self.store.fetch(&item.id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not download {}: {e}", item.name);
                self.push_status(format!("Could not download {}", item.name));
                return ItemOutcome {
                    item: item.clone(),
                    record: ExtractedRecord::unknown(),
                    model_used: None,
                    attempts: 0,
                };
            }
        };
        let image = ImagePayload::from_bytes(&bytes, item.mime_type.as_deref());

        let mut attempts = 0;
        while attempts < self.config.max_attempts {
            attempts += 1;
            info!("Submission attempt {attempts} for {}", item.name);

            let Some((response, model)) = self.submit_with_fallback(&image, &item.name).await
            else {
                error!("Every model submission failed for {}", item.name);
                self.push_status(format!("All models failed for {}", item.name));
                return ItemOutcome {
                    item: item.clone(),
                    record: ExtractedRecord::unknown(),
                    model_used: None,
                    attempts,
                };
            };

            let record = extract_record(&response);
            if record.is_useful() {
                info!(
                    "Successful extraction on attempt {attempts} for {} via {model}",
                    item.name
                );
                return ItemOutcome {
                    item: item.clone(),
                    record,
                    model_used: Some(model),
                    attempts,
                };
            }

            warn!("Extraction returned only UNKNOWN on attempt {attempts} for {}", item.name);
            if attempts < self.config.max_attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            } else {
                // Retry budget exhausted: accept the sentinel-filled record.
                self.push_status(format!("No fields recognized for {}", item.name));
                return ItemOutcome {
                    item: item.clone(),
                    record,
                    model_used: Some(model),
                    attempts,
                };
            }
        }

        // Only reachable with a zero retry budget.
        ItemOutcome {
            item: item.clone(),
            record: ExtractedRecord::unknown(),
            model_used: None,
            attempts,
        }
    }

    /// Walks the model fallback chain; the first successful submission wins.
    async fn submit_with_fallback(
        &self,
        image: &ImagePayload,
        item_name: &str,
    ) -> Option<(RawModelResponse, String)> {
        for model in &self.config.models {
            match self.vision.submit(image, &self.prompt, model).await {
                Ok(response) => return Some((response, model.clone())),
                Err(e) => {
                    warn!("Model {model} failed for {item_name}: {e}");
                    self.push_status(format!("Model {model} failed for {item_name}"));
                }
            }
        }
        None
    }

    /// Appends the spreadsheet row and relocates the file. Both are
    /// best-effort: a failure is logged and the pipeline moves on.
    async fn write_sinks(&self, outcome: &ItemOutcome) {
        let mut row = outcome.record.to_row();
        row.push(outcome.item.name.clone());
        match self.sink.append(&row).await {
            Ok(()) => {
                info!("Wrote sheet row for {}", outcome.item.name);
            }
            Err(e) => {
                error!("Failed to write sheet row for {}: {e}", outcome.item.name);
                self.push_status(format!("Failed to write sheet row for {}", outcome.item.name));
            }
        }

        match self
            .store
            .relocate(&outcome.item.id, &self.config.analyzed_folder)
            .await
        {
            Ok(()) => {
                info!("Moved {} to analyzed", outcome.item.name);
            }
            Err(e) => {
                error!("Failed to move {}: {e}", outcome.item.name);
                self.push_status(format!("Failed to move {}", outcome.item.name));
            }
        }
    }
}
