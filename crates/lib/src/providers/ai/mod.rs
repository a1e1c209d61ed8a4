pub mod local;
pub mod openai;

use crate::errors::PipelineError;
use crate::types::{ImagePayload, PromptSpec, RawModelResponse};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a vision-capable model API.
///
/// This defines a common interface for submitting an image plus an
/// instruction pair to different providers (OpenAI Responses API, local
/// OpenAI-compatible servers). The response is returned opaque: the
/// extractor owns all interpretation of its shape.
#[async_trait]
pub trait VisionProvider: Send + Sync + Debug + DynClone {
    /// Submits one image under the given model identifier.
    ///
    /// Transport failures and non-success statuses are errors; the caller's
    /// fallback chain decides what to do with them.
    async fn submit(
        &self,
        image: &ImagePayload,
        prompt: &PromptSpec,
        model: &str,
    ) -> Result<RawModelResponse, PipelineError>;
}

dyn_clone::clone_trait_object!(VisionProvider);
