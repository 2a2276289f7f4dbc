//! Request pipelines
//!
//! The [`Advisor`] owns every provider handle plus the knowledge base and
//! runs one linear pipeline per endpoint:
//!
//! ```text
//! translate -> weather (cached) -> similarity search -> prompt -> model
//!           -> translate -> persist interaction
//! ```
//!
//! Nothing here retries. A provider failure either degrades the prompt
//! (weather, translation) or ends the request with an [`AdvisorError`].

mod chat;
mod image;
mod locations;
mod media;
mod pest;
mod questions;
mod rules;
mod season;
mod speech;

pub use chat::{ChatReply, ChatRequest};
pub use image::{ImageReply, ImageRequest};
pub use locations::{DEFAULT_LOCATION, LocationTable, normalize_location};
pub use media::{MediaError, decode_payload};
#[cfg(test)]
pub use pest::PREDICTIONS;
pub use pest::{PestPrediction, detect_pest};
pub use questions::{BASE_LANGUAGE, default_questions};
pub use rules::{Advisory, SmsRequest, market_prices, simple_advisory};
pub use season::season_guidance;
pub use speech::{SpeechError, SpeechReply, SpeechRequest};

use crate::config::AdvisorConfig;
use crate::memory::{KnowledgeBase, KnowledgeError};
use crate::providers::{GenerationResponse, ProviderError, ProviderSet};
use crate::template::{TemplateEngine, TemplateError};
use std::sync::Arc;
use thiserror::Error;

/// Default number of knowledge records fed into a chat prompt
pub const DEFAULT_TOP_K: usize = 3;

/// Default forecast cache lifetime in seconds
pub const DEFAULT_WEATHER_TTL: u64 = 1800;

/// Errors that end a request
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// A required field was missing or empty
    #[error("{0}")]
    Validation(String),

    /// The generative model has no API key
    #[error("Gemini API key not configured.")]
    ModelNotConfigured,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Speech(#[from] SpeechError),
}

impl AdvisorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub struct Advisor {
    providers: ProviderSet,
    knowledge: Arc<KnowledgeBase>,
    templates: TemplateEngine,
    locations: LocationTable,
    top_k: usize,
    weather_cache_ttl: u64,
    ffmpeg: String,
}

impl Advisor {
    pub fn new(providers: ProviderSet, knowledge: Arc<KnowledgeBase>) -> Self {
        Self {
            providers,
            knowledge,
            templates: TemplateEngine::new(),
            locations: LocationTable::default(),
            top_k: DEFAULT_TOP_K,
            weather_cache_ttl: DEFAULT_WEATHER_TTL,
            ffmpeg: "ffmpeg".to_string(),
        }
    }

    /// Apply the `[knowledge]`, `[storage]` and `[locations]` settings
    pub fn from_config(
        config: &AdvisorConfig,
        providers: ProviderSet,
        knowledge: Arc<KnowledgeBase>,
    ) -> Self {
        Self::new(providers, knowledge)
            .with_top_k(config.knowledge.top_k)
            .with_weather_cache_ttl(config.storage.weather_cache_ttl)
            .with_locations(LocationTable::new(&config.locations))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_weather_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.weather_cache_ttl = ttl_secs;
        self
    }

    pub fn with_locations(mut self, locations: LocationTable) -> Self {
        self.locations = locations;
        self
    }

    #[cfg(test)]
    /// Path or name of the ffmpeg binary used to transcode voice notes
    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Raw forecast for `location`, served from the cache while it is fresh
    ///
    /// Unknown locations resolve to, and are cached as, the default location.
    pub async fn weather(&self, location: &str) -> Result<serde_json::Value, AdvisorError> {
        let name = normalize_location(location);
        let key = if self.locations.contains(&name) {
            name
        } else {
            DEFAULT_LOCATION.to_string()
        };

        match self.knowledge.cached_weather(&key, self.weather_cache_ttl) {
            Ok(Some(forecast)) => {
                tracing::debug!(location = %key, "Weather cache hit");
                return Ok(forecast);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(location = %key, error = %e, "Weather cache read failed"),
        }

        let forecast = self
            .providers
            .weather
            .forecast(self.locations.resolve(&key))
            .await?;

        if self.weather_cache_ttl > 0 {
            if let Err(e) = self.knowledge.cache_weather(&key, &forecast) {
                tracing::warn!(location = %key, error = %e, "Weather cache write failed");
            }
        }

        Ok(forecast)
    }

    /// Weather for a prompt; failures are logged and yield `None`
    async fn weather_or_none(&self, location: &str) -> Option<serde_json::Value> {
        match self.weather(location).await {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "Weather unavailable");
                None
            }
        }
    }

    fn require_model(&self) -> Result<(), AdvisorError> {
        if self.providers.model.is_configured() {
            Ok(())
        } else {
            Err(AdvisorError::ModelNotConfigured)
        }
    }

    /// Log which model answered, how long it took and the tokens it reported
    fn log_generation(&self, kind: &str, location: &str, generated: &GenerationResponse) {
        let usage = generated.usage.clone().unwrap_or_default();
        tracing::info!(
            kind = kind,
            location = %location,
            model = generated.model.as_deref().unwrap_or(self.providers.model.name()),
            duration_ms = generated.duration.as_millis() as u64,
            prompt_tokens = ?usage.prompt_tokens,
            completion_tokens = ?usage.completion_tokens,
            total_tokens = ?usage.total_tokens,
            "Model answered"
        );
    }

    /// Translate a reply, returning the original text on failure
    async fn translate_reply(&self, text: String, language: &str) -> String {
        if language == BASE_LANGUAGE {
            return text;
        }
        match self.providers.translator.translate(&text, language).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(language = %language, error = %e, "Reply translation failed");
                text
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-process fakes for every provider seam

    use super::Advisor;
    use crate::config::Coordinates;
    use crate::memory::KnowledgeBase;
    use crate::providers::{
        EmbeddingDriver, GenerationRequest, GenerationResponse, GenerativeModel, HashingEmbedder,
        ProviderError, ProviderSet, SpeechRecognizer, Transcript, Translator, WeatherSource,
    };
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Echoes a canned reply and records every request
    pub struct FakeModel {
        pub reply: Result<String, ProviderError>,
        pub configured: bool,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl FakeModel {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                configured: true,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: ProviderError) -> Self {
            Self {
                reply: Err(error),
                ..Self::replying("")
            }
        }

        pub fn unconfigured() -> Self {
            Self {
                configured: false,
                ..Self::replying("")
            }
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.requests.lock().unwrap().last().map(|r| r.prompt.clone())
        }
    }

    #[async_trait]
    impl GenerativeModel for FakeModel {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply
                .clone()
                .map(|text| GenerationResponse::new(text, Duration::from_millis(5)))
        }

        fn name(&self) -> &str {
            "fake"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }
    }

    /// Detects a fixed language and tags translations with the target
    pub struct FakeTranslator {
        pub detected: String,
        pub fail: bool,
    }

    impl FakeTranslator {
        pub fn detecting(lang: &str) -> Self {
            Self {
                detected: lang.to_string(),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn detect(&self, _text: &str) -> Result<String, ProviderError> {
            if self.fail {
                return Err(ProviderError::network("translate down"));
            }
            Ok(self.detected.clone())
        }

        async fn translate(&self, text: &str, target: &str) -> Result<String, ProviderError> {
            if self.fail {
                return Err(ProviderError::network("translate down"));
            }
            Ok(format!("[{}] {}", target, text))
        }
    }

    /// Serves one fixed forecast, or fails, counting calls
    pub struct FakeWeather {
        pub forecast: Option<serde_json::Value>,
        pub calls: AtomicUsize,
    }

    impl FakeWeather {
        pub fn sunny() -> Self {
            Self {
                forecast: Some(serde_json::json!({
                    "list": [{
                        "main": {"temp": 31.5, "humidity": 62},
                        "weather": [{"description": "clear sky"}]
                    }]
                })),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn down() -> Self {
            Self {
                forecast: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn forecast(&self, _coords: Coordinates) -> Result<serde_json::Value, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.forecast
                .clone()
                .ok_or_else(|| ProviderError::network("weather down"))
        }
    }

    pub struct FakeSpeech {
        pub result: Result<Option<Transcript>, ProviderError>,
        pub languages: Mutex<Vec<String>>,
    }

    impl FakeSpeech {
        pub fn hearing(text: &str) -> Self {
            Self {
                result: Ok(Some(Transcript {
                    text: text.to_string(),
                    confidence: Some(0.92),
                })),
                languages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SpeechRecognizer for FakeSpeech {
        async fn recognize(
            &self,
            _wav: &[u8],
            language_code: &str,
        ) -> Result<Option<Transcript>, ProviderError> {
            self.languages.lock().unwrap().push(language_code.to_string());
            self.result.clone()
        }
    }

    /// Hashing embedder that errors once `fail` is set
    #[derive(Default)]
    pub struct FlakyEmbedder {
        pub fail: AtomicBool,
        inner: HashingEmbedder,
    }

    #[async_trait]
    impl EmbeddingDriver for FlakyEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProviderError::network("embedding endpoint down"));
            }
            self.inner.embed(texts).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }
    }

    /// Handles kept by tests for inspection after a call
    pub struct Fakes {
        pub model: Arc<FakeModel>,
        pub weather: Arc<FakeWeather>,
        pub speech: Arc<FakeSpeech>,
    }

    pub fn provider_set(
        model: FakeModel,
        translator: FakeTranslator,
        weather: FakeWeather,
        speech: FakeSpeech,
    ) -> (ProviderSet, Fakes) {
        let fakes = Fakes {
            model: Arc::new(model),
            weather: Arc::new(weather),
            speech: Arc::new(speech),
        };
        let set = ProviderSet {
            model: fakes.model.clone(),
            translator: Arc::new(translator),
            weather: fakes.weather.clone(),
            speech: fakes.speech.clone(),
            embedder: Arc::new(HashingEmbedder::default()),
        };
        (set, fakes)
    }

    /// An advisor over an in-memory knowledge base
    pub fn advisor(set: ProviderSet) -> Advisor {
        let knowledge =
            KnowledgeBase::open(Path::new(":memory:"), set.embedder.clone()).unwrap();
        Advisor::new(set, Arc::new(knowledge))
    }

    pub fn default_advisor() -> (Advisor, Fakes) {
        let (set, fakes) = provider_set(
            FakeModel::replying("Sow wheat in the first fortnight of November."),
            FakeTranslator::detecting("en"),
            FakeWeather::sunny(),
            FakeSpeech::hearing("gehun kab boyen"),
        );
        (advisor(set), fakes)
    }
}
