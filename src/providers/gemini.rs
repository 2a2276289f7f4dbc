//! Gemini `generateContent` client

use super::types::{
    GenerationRequest, GenerationResponse, GenerativeModel, ProviderError, TokenUsage,
    build_client, map_http_status, map_send_error,
};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Generative model backed by the Gemini REST API
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

impl GeminiBackend {
    /// Create a backend from provider config, resolving the key from the environment
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout);
        Ok(Self {
            base_url: config.endpoint.clone(),
            api_key: config.api_key(),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            timeout,
            client: build_client(timeout)?,
        })
    }

    #[cfg(test)]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_body(request: &GenerationRequest) -> GenerateContentRequest {
        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        if let Some(ref image) = request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.data),
                },
            });
        }
        GenerateContentRequest {
            contents: vec![Content { parts }],
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let Some(ref key) = self.api_key else {
            return Err(ProviderError::unavailable("Gemini API key not configured"));
        };

        let start = Instant::now();
        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", key)
            .json(&Self::build_body(request))
            .send()
            .await
            .map_err(|e| map_send_error(e, start.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body, self.timeout));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("failed to parse response: {}", e)))?;

        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::parse("model returned no text"));
        }

        tracing::debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Gemini response received"
        );

        let mut generated = GenerationResponse::new(text, start.elapsed())
            .with_model(parsed.model_version.unwrap_or_else(|| self.model.clone()));
        if let Some(usage) = parsed.usage_metadata {
            generated = generated.with_usage(TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            });
        }
        Ok(generated)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
