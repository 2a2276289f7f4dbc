//! Embedding drivers for the knowledge base
//!
//! Two implementations of [`EmbeddingDriver`]:
//! - [`HttpEmbeddingDriver`] talks to any OpenAI-compatible `/embeddings`
//!   endpoint (Ollama, OpenAI, vLLM, ...).
//! - [`HashingEmbedder`] is a deterministic feature-hashing encoder that needs
//!   no network and is used when no endpoint is configured.
//!
//! Both return L2-normalised vectors, so a dot product is a cosine similarity.

use super::types::{EmbeddingDriver, ProviderError, build_client, map_http_status, map_send_error};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Dimensionality of the offline encoder, matching all-MiniLM
pub const HASHING_DIMENSIONS: usize = 384;

/// OpenAI-compatible embedding driver
#[derive(Debug, Clone)]
pub struct HttpEmbeddingDriver {
    base_url: String,
    api_key: Option<String>,
    model: String,
    dims: usize,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Infer embedding dimensions from model name
fn infer_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        "text-embedding-3-large" => 3072,
        "nomic-embed-text" | "all-mpnet-base-v2" => 768,
        "mxbai-embed-large" => 1024,
        _ => 384,
    }
}

impl HttpEmbeddingDriver {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let model = config.model.clone().unwrap_or_else(|| "all-minilm".into());
        let timeout = Duration::from_secs(config.timeout);
        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
            dims: infer_dimensions(&model),
            model,
            timeout,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl EmbeddingDriver for HttpEmbeddingDriver {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let start = Instant::now();
        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_send_error(e, start.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body, self.timeout));
        }

        let data: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("failed to parse embeddings: {}", e)))?;

        if data.data.len() != texts.len() {
            return Err(ProviderError::parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.data.len()
            )));
        }

        let embeddings: Vec<Vec<f32>> = data
            .data
            .into_iter()
            .map(|d| normalize(d.embedding))
            .collect();

        tracing::debug!(
            count = embeddings.len(),
            dims = embeddings.first().map(|e| e.len()).unwrap_or(0),
            "Embedded texts"
        );

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Deterministic feature-hashing encoder
///
/// Each lower-cased word and each character trigram of a word is hashed into
/// one of `dims` buckets with a hash-derived sign.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(HASHING_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.add_feature(&mut vector, word.as_bytes(), 1.0);

            let chars: Vec<char> = format!("#{word}#").chars().collect();
            for window in chars.windows(3) {
                let gram: String = window.iter().collect();
                self.add_feature(&mut vector, gram.as_bytes(), 0.5);
            }
        }

        normalize(vector)
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let index = (hash % self.dims as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingDriver for HashingEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// Scale a vector to unit length; the zero vector is returned unchanged
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
    vector
}
