//! Google Cloud Speech-to-Text v1 client

use super::types::{
    ProviderError, SpeechRecognizer, Transcript, build_client, map_http_status, map_send_error,
};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Sample rate the advisor transcodes audio to before recognition
pub const SAMPLE_RATE_HZ: u32 = 16_000;

#[derive(Debug, Clone)]
pub struct GoogleSpeechRecognizer {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
}

impl GoogleSpeechRecognizer {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout);
        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
            timeout,
            client: build_client(timeout)?,
        })
    }

    #[cfg(test)]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeechRecognizer {
    async fn recognize(
        &self,
        wav: &[u8],
        language_code: &str,
    ) -> Result<Option<Transcript>, ProviderError> {
        let Some(ref key) = self.api_key else {
            return Err(ProviderError::unavailable("speech API key not configured"));
        };

        let body = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: SAMPLE_RATE_HZ,
                language_code,
                enable_automatic_punctuation: true,
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(wav),
            },
        };

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/speech:recognize", self.base_url))
            .query(&[("key", key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, start.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body, self.timeout));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("failed to parse recognition: {}", e)))?;

        let mut text = String::new();
        let mut confidence = None;
        for alternative in parsed
            .results
            .into_iter()
            .filter_map(|r| r.alternatives.into_iter().next())
        {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(alternative.transcript.trim());
            confidence = confidence.or(alternative.confidence);
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Transcript { text, confidence }))
    }
}
