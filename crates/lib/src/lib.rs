//! # Photo-Intake Pipeline
//!
//! This crate provides the core of a spare-parts photo-intake pipeline: it
//! lists images from a storage folder, submits each to a vision model,
//! extracts a fixed schema of parts fields from the raw response, appends
//! the fields to a spreadsheet, and moves the processed file aside.
//!
//! The two components worth knowing are [`extract::extract_record`], the
//! never-failing response parser, and [`pipeline::Orchestrator`], which
//! applies retry, model fallback, and batching policy across a run. Storage
//! and spreadsheet collaborators sit behind the traits in [`providers`].

pub mod errors;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod types;

pub use errors::PipelineError;
pub use extract::extract_record;
pub use pipeline::Orchestrator;
pub use types::{
    ExtractedRecord, ImagePayload, ItemOutcome, PromptSpec, RawModelResponse, RunConfig,
    RunSnapshot, SourceItem, FIELD_NAMES, UNKNOWN,
};
