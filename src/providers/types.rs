//! Core types and traits for outbound providers

use crate::config::Coordinates;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Error types that can occur when calling a provider
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Request timed out
    #[error("timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Rate limited by the provider
    #[error("rate limited: {message}")]
    RateLimit { message: String },

    /// Authentication failed
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Network error
    #[error("network error: {message}")]
    Network { message: String },

    /// Failed to parse response
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The provider rejected the request
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Provider not configured or disabled
    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl ProviderError {
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Map an unsuccessful HTTP status to a ProviderError
pub fn map_http_status(status: reqwest::StatusCode, body: &str, timeout: Duration) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::auth(format!("HTTP {}: {}", status, body)),
        429 => ProviderError::rate_limit(body),
        408 | 504 => ProviderError::timeout(timeout),
        400..=499 => ProviderError::Api {
            status: status.as_u16(),
            message: body.to_string(),
        },
        500..=599 => ProviderError::network(format!("HTTP {}: {}", status, body)),
        _ => ProviderError::network(format!("unexpected HTTP {}: {}", status, body)),
    }
}

/// Map a reqwest send error to a ProviderError
pub fn map_send_error(e: reqwest::Error, elapsed: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(elapsed)
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// Build a reqwest client with the given timeout
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::config(format!("failed to build HTTP client: {}", e)))
}

/// Image bytes sent inline with a generation request
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Request to a generative model
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The prompt to send
    pub prompt: String,

    /// Optional image part
    pub image: Option<InlineImage>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Response from a generative model
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// Generated text
    pub text: String,

    /// Model that produced the text (if reported)
    pub model: Option<String>,

    /// Time taken
    pub duration: Duration,

    /// Token usage (if reported)
    pub usage: Option<TokenUsage>,
}

impl GenerationResponse {
    pub fn new(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            text: text.into(),
            model: None,
            duration,
            usage: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A generative text model
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate a reply for the request
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError>;

    /// Provider name
    fn name(&self) -> &str;

    /// Whether the model has credentials to be called at all
    fn is_configured(&self) -> bool {
        true
    }
}

/// Language detection and translation
#[async_trait]
pub trait Translator: Send + Sync {
    /// Detect the language of `text`, returning an ISO 639-1 code
    async fn detect(&self, text: &str) -> Result<String, ProviderError>;

    /// Translate `text` into `target`
    async fn translate(&self, text: &str, target: &str) -> Result<String, ProviderError>;
}

/// Weather forecast source
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch the raw forecast for a coordinate pair
    async fn forecast(&self, coords: Coordinates) -> Result<serde_json::Value, ProviderError>;

    /// Whether an API key is configured
    fn is_configured(&self) -> bool {
        true
    }
}

/// A recognised transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Speech recognition over 16 kHz mono LINEAR16 audio
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognise speech; `Ok(None)` means nothing intelligible was heard
    async fn recognize(
        &self,
        wav: &[u8],
        language_code: &str,
    ) -> Result<Option<Transcript>, ProviderError>;
}

/// Trait for computing text embeddings
#[async_trait]
pub trait EmbeddingDriver: Send + Sync {
    /// Compute embedding vectors for a batch of texts
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Compute the embedding for a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::parse("empty embedding response"))
    }

    /// Dimensionality of the vectors this driver produces
    fn dimensions(&self) -> usize;
}
