//! Text query pipeline

use super::{
    Advisor, AdvisorError, BASE_LANGUAGE, DEFAULT_LOCATION, normalize_location, season_guidance,
};
use crate::providers::{GenerationRequest, WeatherSummary};
use crate::template::{PromptContext, prompts, title_case};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Soil type assumed when the client sends none
pub const DEFAULT_SOIL: &str = "loamy";

/// Category under which answered queries are stored
pub const USER_INTERACTION: &str = "user_interaction";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub soil_type: Option<String>,

    /// Reply language, or `auto` to answer in the detected language
    #[serde(default)]
    pub language: Option<String>,
}

#[cfg(test)]
impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_soil_type(mut self, soil_type: impl Into<String>) -> Self {
        self.soil_type = Some(soil_type.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub detected_language: String,
    pub weather_summary: Option<String>,
    pub location_context: String,
}

impl Advisor {
    /// Answer a farmer's text query
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, AdvisorError> {
        if request.query.trim().is_empty() {
            return Err(AdvisorError::validation("Query is required"));
        }
        self.require_model()?;

        let location = normalize_location(request.location.as_deref().unwrap_or(DEFAULT_LOCATION));
        let soil_type = non_empty(request.soil_type.as_deref()).unwrap_or(DEFAULT_SOIL);

        let (english_query, detected_language) = self.to_english(&request.query).await;
        let reply_language = match non_empty(request.language.as_deref()) {
            None | Some("auto") => detected_language.clone(),
            Some(lang) => lang.to_string(),
        };

        let forecast = self.weather_or_none(&location).await;

        let knowledge = match self
            .knowledge
            .search(&english_query, &location, self.top_k)
            .await
        {
            Ok(results) => results.into_iter().map(|r| r.record.content).collect(),
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "Knowledge search failed");
                Vec::new()
            }
        };

        let today = Utc::now();
        let ctx = PromptContext::new(location.as_str(), soil_type, english_query.as_str())
            .with_season(season_guidance(today))
            .with_knowledge(knowledge)
            .with_weather(
                forecast
                    .as_ref()
                    .and_then(WeatherSummary::from_forecast)
                    .map(|w| w.prompt_line()),
            )
            .with_today(today);
        let prompt = self.templates.render_named(prompts::CHAT, &ctx)?;

        let generated = self
            .providers
            .model
            .generate(&GenerationRequest::new(prompt))
            .await?;

        self.log_generation("chat", &location, &generated);

        let response = self
            .translate_reply(generated.text.clone(), &reply_language)
            .await;

        let interaction = format!(
            "Location: {}, Soil: {}, Query: {}, Response: {}",
            location, soil_type, english_query, generated.text
        );
        if let Err(e) = self
            .knowledge
            .add_knowledge(&interaction, USER_INTERACTION, &location, &reply_language)
            .await
        {
            tracing::warn!(error = %e, "Failed to store interaction");
        }

        Ok(ChatReply {
            response,
            detected_language,
            weather_summary: forecast.as_ref().and_then(WeatherSummary::first_description),
            location_context: format!("{}, {} soil", title_case(&location), soil_type),
        })
    }

    /// English text plus the detected language; translation failures keep the
    /// input and report `en`
    async fn to_english(&self, text: &str) -> (String, String) {
        let translator = &self.providers.translator;

        let detected = match translator.detect(text).await {
            Ok(lang) => lang,
            Err(e) => {
                tracing::warn!(error = %e, "Language detection failed");
                return (text.to_string(), BASE_LANGUAGE.to_string());
            }
        };

        if detected == BASE_LANGUAGE {
            return (text.to_string(), detected);
        }

        match translator.translate(text, BASE_LANGUAGE).await {
            Ok(english) => (english, detected),
            Err(e) => {
                tracing::warn!(language = %detected, error = %e, "Query translation failed");
                (text.to_string(), BASE_LANGUAGE.to_string())
            }
        }
    }
}

pub(super) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::providers::ProviderError;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_chat_survives_knowledge_failures() {
        let (mut set, fakes) = provider_set(
            FakeModel::replying("Sow wheat in the first fortnight of November."),
            FakeTranslator::detecting("en"),
            FakeWeather::sunny(),
            FakeSpeech::hearing(""),
        );
        let embedder = Arc::new(FlakyEmbedder::default());
        set.embedder = embedder.clone();
        let advisor = advisor(set);

        advisor
            .knowledge()
            .add_knowledge("Crop: Wheat in Delhi. Sow in November.", "crop_guidance", "delhi", "en")
            .await
            .unwrap();
        embedder.fail.store(true, Ordering::SeqCst);

        let reply = advisor
            .chat(&ChatRequest::new("When should I sow wheat?"))
            .await
            .unwrap();
        assert_eq!(reply.response, "Sow wheat in the first fortnight of November.");

        let prompt = fakes.model.last_prompt().unwrap();
        assert!(prompt.contains("RELEVANT AGRICULTURAL KNOWLEDGE:\n\n\nCURRENT WEATHER CONTEXT:"));
        assert!(!prompt.contains("Crop: Wheat in Delhi"));

        assert_eq!(advisor.knowledge().len(), 1);
        assert_eq!(advisor.knowledge().stored_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_chat_happy_path() {
        let (advisor, fakes) = default_advisor();

        let reply = advisor
            .chat(&ChatRequest::new("When should I sow wheat?").with_location("Punjab"))
            .await
            .unwrap();

        assert_eq!(reply.response, "Sow wheat in the first fortnight of November.");
        assert_eq!(reply.detected_language, "en");
        assert_eq!(reply.weather_summary.as_deref(), Some("clear sky"));
        assert_eq!(reply.location_context, "Punjab, loamy soil");

        let prompt = fakes.model.last_prompt().unwrap();
        assert!(prompt.contains("LOCATION: Punjab, India"));
        assert!(prompt.contains("Temperature: 31.5°C, Condition: clear sky, Humidity: 62%"));
        assert!(prompt.contains("USER QUERY: When should I sow wheat?"));
    }

    #[tokio::test]
    async fn test_chat_stores_interaction() {
        let (advisor, _fakes) = default_advisor();
        assert!(advisor.knowledge().is_empty());

        advisor
            .chat(&ChatRequest::new("Best fertilizer?").with_soil_type("clay"))
            .await
            .unwrap();

        let stored = advisor.knowledge().search("Best fertilizer?", "delhi", 1).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].record.category, USER_INTERACTION);
        assert_eq!(stored[0].record.location, "delhi");
        assert!(stored[0].record.content.starts_with(
            "Location: delhi, Soil: clay, Query: Best fertilizer?, Response: Sow wheat"
        ));
    }

    #[tokio::test]
    async fn test_chat_translates_both_ways() {
        let (set, fakes) = provider_set(
            FakeModel::replying("Use 120 kg N per hectare."),
            FakeTranslator::detecting("hi"),
            FakeWeather::down(),
            FakeSpeech::hearing(""),
        );
        let advisor = advisor(set);

        let reply = advisor
            .chat(&ChatRequest::new("गेहूं के लिए कितना उर्वरक?").with_language("auto"))
            .await
            .unwrap();

        assert_eq!(reply.detected_language, "hi");
        assert_eq!(reply.response, "[hi] Use 120 kg N per hectare.");
        assert!(reply.weather_summary.is_none());

        let prompt = fakes.model.last_prompt().unwrap();
        assert!(prompt.contains("USER QUERY: [en] गेहूं के लिए कितना उर्वरक?"));
        assert!(prompt.contains("Weather data unavailable"));
    }

    #[tokio::test]
    async fn test_explicit_language_overrides_detection() {
        let (advisor, _fakes) = default_advisor();
        let reply = advisor
            .chat(&ChatRequest::new("Irrigation schedule?").with_language("pa"))
            .await
            .unwrap();
        assert_eq!(reply.detected_language, "en");
        assert!(reply.response.starts_with("[pa] "));
    }

    #[tokio::test]
    async fn test_translation_failure_falls_back_to_english() {
        let (set, _fakes) = provider_set(
            FakeModel::replying("Irrigate every 10 days."),
            FakeTranslator {
                detected: "hi".into(),
                fail: true,
            },
            FakeWeather::sunny(),
            FakeSpeech::hearing(""),
        );
        let reply = advisor(set)
            .chat(&ChatRequest::new("sinchai kab karein"))
            .await
            .unwrap();
        assert_eq!(reply.detected_language, "en");
        assert_eq!(reply.response, "Irrigate every 10 days.");
    }

    #[tokio::test]
    async fn test_chat_validation() {
        let (advisor, fakes) = default_advisor();
        let err = advisor.chat(&ChatRequest::new("   ")).await.unwrap_err();
        assert_eq!(err.to_string(), "Query is required");
        assert!(fakes.model.last_prompt().is_none());
    }

    #[tokio::test]
    async fn test_chat_without_model_key() {
        let (set, _fakes) = provider_set(
            FakeModel::unconfigured(),
            FakeTranslator::detecting("en"),
            FakeWeather::sunny(),
            FakeSpeech::hearing(""),
        );
        let err = advisor(set).chat(&ChatRequest::new("hello")).await.unwrap_err();
        assert!(matches!(err, AdvisorError::ModelNotConfigured));
    }

    #[tokio::test]
    async fn test_model_failure_stores_nothing() {
        let (set, _fakes) = provider_set(
            FakeModel::failing(ProviderError::auth("API_KEY_INVALID")),
            FakeTranslator::detecting("en"),
            FakeWeather::sunny(),
            FakeSpeech::hearing(""),
        );
        let advisor = advisor(set);
        let err = advisor.chat(&ChatRequest::new("hello")).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Provider(ProviderError::Auth { .. })));
        assert!(advisor.knowledge().is_empty());
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"query": "q", "soilType": "sandy", "language": "hi"}"#).unwrap();
        assert_eq!(request.soil_type.as_deref(), Some("sandy"));
        assert!(request.location.is_none());
    }
}
