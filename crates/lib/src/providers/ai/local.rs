use crate::{
    errors::PipelineError,
    providers::ai::VisionProvider,
    types::{ImagePayload, PromptSpec, RawModelResponse},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Serialize;
use serde_json::json;

// --- OpenAI-compatible chat-completions request structures ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<serde_json::Value>,
    temperature: f32,
    max_tokens: i32,
    stream: bool,
}

// --- Local Provider implementation ---

/// A provider for a local or OpenAI-compatible chat-completions API that
/// accepts `image_url` content parts.
#[derive(Clone, Debug)]
pub struct LocalAiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
}

impl LocalAiProvider {
    /// Creates a new `LocalAiProvider`.
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self, PipelineError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(PipelineError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl VisionProvider for LocalAiProvider {
    async fn submit(
        &self,
        image: &ImagePayload,
        prompt: &PromptSpec,
        model: &str,
    ) -> Result<RawModelResponse, PipelineError> {
        let request_body = ChatRequest {
            model,
            messages: vec![
                json!({ "role": "system", "content": prompt.system }),
                json!({
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt.user },
                        { "type": "image_url", "image_url": { "url": image.data_uri() } },
                    ],
                }),
            ],
            temperature: 0.0,
            max_tokens: 700,
            stream: false,
        };

        let mut request_builder = self.client.post(&self.api_url);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = request_builder
            .json(&request_body)
            .send()
            .await
            .map_err(PipelineError::AiRequest)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(PipelineError::AiDeserialization)?;

        if !status.is_success() {
            return Err(PipelineError::AiApi(format!("{status}: {body}")));
        }

        // The `choices` envelope is left to the extractor.
        Ok(RawModelResponse::from_body(&body))
    }
}
