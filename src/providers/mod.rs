//! Outbound provider clients
//!
//! Every external service sits behind a trait so the advisor pipelines can be
//! exercised with in-process fakes:
//!
//! - [`GenerativeModel`] - Gemini `generateContent`
//! - [`Translator`] - Cloud Translation v2, or passthrough without a key
//! - [`WeatherSource`] - OpenWeatherMap forecast
//! - [`SpeechRecognizer`] - Cloud Speech-to-Text v1
//! - [`EmbeddingDriver`] - OpenAI-compatible embeddings, or offline hashing
//!
//! None of the clients retry; a failed call surfaces immediately.

mod embedding;
mod gemini;
mod speech;
mod translate;
mod types;
mod weather;

pub use embedding::HashingEmbedder;
pub use speech::SAMPLE_RATE_HZ;
pub use types::{
    EmbeddingDriver, GenerationRequest, GenerationResponse, GenerativeModel, InlineImage,
    ProviderError, SpeechRecognizer, Transcript, Translator, WeatherSource,
};
pub use weather::WeatherSummary;

use embedding::{HASHING_DIMENSIONS, HttpEmbeddingDriver};
use gemini::GeminiBackend;
use speech::GoogleSpeechRecognizer;
use translate::{GoogleTranslator, PassthroughTranslator};
use weather::OpenWeatherClient;

use crate::config::{ProviderConfig, Providers};
use std::sync::Arc;

/// The full set of provider handles the advisor uses
#[derive(Clone)]
pub struct ProviderSet {
    pub model: Arc<dyn GenerativeModel>,
    pub translator: Arc<dyn Translator>,
    pub weather: Arc<dyn WeatherSource>,
    pub speech: Arc<dyn SpeechRecognizer>,
    pub embedder: Arc<dyn EmbeddingDriver>,
}

impl ProviderSet {
    /// Build real clients from configuration
    pub fn from_config(providers: &Providers) -> Result<Self, ProviderError> {
        Ok(Self {
            model: Arc::new(GeminiBackend::from_config(&providers.gemini)?),
            translator: create_translator(&providers.translate)?,
            weather: Arc::new(OpenWeatherClient::from_config(&providers.weather)?),
            speech: Arc::new(GoogleSpeechRecognizer::from_config(&providers.speech)?),
            embedder: create_embedder(&providers.embedding)?,
        })
    }
}

/// Cloud translation when a key is configured, passthrough otherwise
pub fn create_translator(config: &ProviderConfig) -> Result<Arc<dyn Translator>, ProviderError> {
    match GoogleTranslator::from_config(config)? {
        Some(translator) => Ok(Arc::new(translator)),
        None => {
            tracing::info!("No translation key configured, replies stay in English");
            Ok(Arc::new(PassthroughTranslator))
        }
    }
}

/// HTTP embeddings when an endpoint is configured, hashing encoder otherwise
pub fn create_embedder(config: &ProviderConfig) -> Result<Arc<dyn EmbeddingDriver>, ProviderError> {
    if config.is_usable() {
        let driver = HttpEmbeddingDriver::from_config(config)?;
        tracing::info!(
            endpoint = %config.endpoint,
            dims = driver.dimensions(),
            "Using HTTP embedding driver"
        );
        Ok(Arc::new(driver))
    } else {
        tracing::info!(dims = HASHING_DIMENSIONS, "Using offline hashing embedder");
        Ok(Arc::new(HashingEmbedder::default()))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Serve `router` on an ephemeral local port and return its base URL
    pub async fn spawn_stub(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
