//! Google Cloud Translation (v2 REST) and a passthrough fallback

use super::types::{ProviderError, Translator, build_client, map_http_status, map_send_error};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Translator backed by the Cloud Translation v2 API
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct TranslationsData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct DetectionsData {
    detections: Vec<Vec<Detection>>,
}

#[derive(Debug, Deserialize)]
struct Detection {
    language: String,
}

impl GoogleTranslator {
    /// Build from config; `None` when no API key is set
    pub fn from_config(config: &ProviderConfig) -> Result<Option<Self>, ProviderError> {
        let Some(api_key) = config.api_key() else {
            return Ok(None);
        };
        let timeout = Duration::from_secs(config.timeout);
        Ok(Some(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client: build_client(timeout)?,
        }))
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| map_send_error(e, start.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body, self.timeout));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("failed to parse response: {}", e)))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn detect(&self, text: &str) -> Result<String, ProviderError> {
        let url = format!("{}/detect", self.base_url);
        let data: DetectionsData = self.post(&url, &DetectRequest { q: text }).await?;
        data.detections
            .into_iter()
            .flatten()
            .next()
            .map(|d| d.language)
            .ok_or_else(|| ProviderError::parse("no language detected"))
    }

    async fn translate(&self, text: &str, target: &str) -> Result<String, ProviderError> {
        let body = TranslateRequest {
            q: text,
            target,
            format: "text",
        };
        let data: TranslationsData = self.post(&self.base_url, &body).await?;
        data.translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| ProviderError::parse("empty translation response"))
    }
}

/// Translator used when no translation key is configured: everything is English
#[derive(Debug, Clone, Default)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn detect(&self, _text: &str) -> Result<String, ProviderError> {
        Ok("en".into())
    }

    async fn translate(&self, text: &str, _target: &str) -> Result<String, ProviderError> {
        Ok(text.to_string())
    }
}
