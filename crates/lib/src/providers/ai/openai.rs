use crate::{
    errors::PipelineError,
    providers::ai::VisionProvider,
    types::{ImagePayload, PromptSpec, RawModelResponse},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

// --- Responses-API request structures ---

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<serde_json::Value>,
    max_output_tokens: u32,
}

// --- OpenAI Provider implementation ---

/// A provider for the OpenAI Responses API with image input.
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Creates a new `OpenAiProvider`.
    pub fn new(api_url: String, api_key: String) -> Result<Self, PipelineError> {
        if api_key.is_empty() {
            return Err(PipelineError::MissingApiKey);
        }
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
impl VisionProvider for OpenAiProvider {
    /// Submits the image as a base64 `input_image` part alongside the user
    /// instruction, and returns the body without interpreting its shape.
    async fn submit(
        &self,
        image: &ImagePayload,
        prompt: &PromptSpec,
        model: &str,
    ) -> Result<RawModelResponse, PipelineError> {
        let request_body = ResponsesRequest {
            model,
            input: vec![
                json!({ "role": "system", "content": prompt.system }),
                json!({
                    "role": "user",
                    "content": [
                        { "type": "input_text", "text": prompt.user },
                        // The API wants the bare base64, without the data-URI prefix.
                        { "type": "input_image", "image_base64": image.base64_data() },
                    ],
                }),
            ],
            max_output_tokens: 700,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(PipelineError::AiRequest)?;

        let status = response.status();
        debug!(%status, model, "Model API responded");

        let body = response
            .text()
            .await
            .map_err(PipelineError::AiDeserialization)?;

        if !status.is_success() {
            return Err(PipelineError::AiApi(format!("{status}: {body}")));
        }

        Ok(RawModelResponse::from_body(&body))
    }
}
