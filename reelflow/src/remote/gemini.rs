//! REST adapter for the Gemini image/analysis API and the Veo video API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::backend::GenerationBackend;
use super::types::{ImagePayload, OperationHandle, OperationStatus, VideoFile};
use crate::config::{ModelConfig, ReelflowConfig};
use crate::errors::{ReelflowError, Result};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Backend talking to the Generative Language REST endpoints.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    project_id: Option<String>,
    base_url: String,
    models: ModelConfig,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Builds a backend from configuration.
    ///
    /// Fails with `Configuration` when no API key is set.
    pub fn new(config: &ReelflowConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ReelflowError::configuration("GCP_API_KEY is not set"));
        }

        let client = Client::builder()
            .timeout(config.request_timeout()?)
            .build()
            .map_err(|e| ReelflowError::configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            models: config.models.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("x-goog-api-key", &self.api_key);
        match &self.project_id {
            Some(project) => request.header("x-goog-user-project", project),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ReelflowError::transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value> {
        self.send(request)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| ReelflowError::malformed(format!("response is not JSON: {e}")))
    }

    async fn generate_content(&self, model: &str, body: Value) -> Result<Value> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        debug!(model, "generateContent");
        self.send_json(self.client.post(url).json(&body)).await
    }
}

fn status_error(status: StatusCode, body: String) -> ReelflowError {
    let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ReelflowError::transient(message)
    } else {
        ReelflowError::RemoteRejected {
            status: status.as_u16(),
            message,
        }
    }
}

fn safety_settings() -> Value {
    Value::Array(
        HARM_CATEGORIES
            .iter()
            .map(|category| json!({"category": category, "threshold": "BLOCK_ONLY_HIGH"}))
            .collect(),
    )
}

fn inline_part(image: &ImagePayload) -> Value {
    json!({"inline_data": {"mime_type": image.mime_type, "data": image.to_base64()}})
}

fn response_parts(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn first_text(response: &Value) -> Option<&str> {
    response_parts(response).find_map(|part| part.get("text").and_then(Value::as_str))
}

fn first_image(response: &Value) -> Result<Option<ImagePayload>> {
    for part in response_parts(response) {
        let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            continue;
        };
        let mime = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png");
        if !mime.starts_with("image/") {
            continue;
        }
        if let Some(data) = inline.get("data").and_then(Value::as_str) {
            return ImagePayload::from_base64(data, mime).map(Some);
        }
    }
    Ok(None)
}

/// Strips a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn analyze(&self, prompt: &str) -> Result<Value> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": 0.8,
                "responseMimeType": "application/json",
            },
            "safetySettings": safety_settings(),
        });

        let response = self.generate_content(&self.models.analysis, body).await?;
        let text = first_text(&response)
            .ok_or_else(|| ReelflowError::malformed("analysis answer contains no text"))?;

        serde_json::from_str(strip_code_fence(text))
            .map_err(|e| ReelflowError::malformed(format!("analysis answer is not JSON: {e}")))
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<ImagePayload>> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"responseModalities": ["IMAGE", "TEXT"]},
            "safetySettings": safety_settings(),
        });

        let response = self.generate_content(&self.models.image, body).await?;
        first_image(&response)
    }

    async fn composite_images(
        &self,
        first: &ImagePayload,
        second: &ImagePayload,
        prompt: &str,
    ) -> Result<Option<ImagePayload>> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [inline_part(first), inline_part(second), {"text": prompt}],
            }],
            "generationConfig": {"responseModalities": ["IMAGE", "TEXT"]},
            "safetySettings": safety_settings(),
        });

        let response = self.generate_content(&self.models.image, body).await?;
        first_image(&response)
    }

    async fn generate_video(&self, image: &ImagePayload, prompt: &str) -> Result<OperationHandle> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, self.models.video);
        let body = json!({
            "instances": [{
                "prompt": prompt,
                "image": {
                    "bytesBase64Encoded": image.to_base64(),
                    "mimeType": image.mime_type,
                },
            }],
            "parameters": {"aspectRatio": "9:16", "sampleCount": 1},
        });

        let response = self.send_json(self.client.post(url).json(&body)).await?;
        response
            .get("name")
            .and_then(Value::as_str)
            .map(OperationHandle::new)
            .ok_or_else(|| ReelflowError::malformed("video job answer has no operation name"))
    }

    async fn poll_operation(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        let url = format!("{}/{}", self.base_url, handle.name);
        let response = self.send_json(self.client.get(url)).await?;
        let mut status = OperationStatus::from_value(&response);
        if status.name.is_empty() {
            status.name.clone_from(&handle.name);
        }
        Ok(status)
    }

    async fn download_video(&self, file: &VideoFile) -> Result<Vec<u8>> {
        if let Some(data) = &file.data {
            return Ok(data.clone());
        }
        let uri = file
            .uri
            .as_deref()
            .ok_or(ReelflowError::NoDownloadableArtifact)?;

        let bytes = self
            .send(self.client.get(uri))
            .await?
            .bytes()
            .await
            .map_err(|e| ReelflowError::transient(format!("video download interrupted: {e}")))?;
        Ok(bytes.to_vec())
    }
}
