//! HTTP route handlers

use super::error::ApiError;
use super::extract::ApiJson;
use super::state::AppState;
use crate::advisor::{
    Advisory, BASE_LANGUAGE, ChatReply, ChatRequest, DEFAULT_LOCATION, ImageReply, ImageRequest,
    PestPrediction, SmsRequest, SpeechReply, SpeechRequest, decode_payload, default_questions,
    detect_pest, market_prices, simple_advisory,
};
use axum::extract::{FromRequest, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Successful reply: `{"success": true, ...body}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

fn ok<T: Serialize>(body: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        body,
    })
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub gemini_api: bool,
    pub weather_api: bool,
    pub knowledge_base_items: usize,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let providers = state.advisor.providers();
    Json(HealthResponse {
        status: "ok",
        gemini_api: providers.model.is_configured(),
        weather_api: providers.weather.is_configured(),
        knowledge_base_items: state.advisor.knowledge().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> ApiResult<ChatReply> {
    tracing::info!(
        query_preview = %request.query.chars().take(50).collect::<String>(),
        location = ?request.location,
        "Received chat query"
    );
    Ok(ok(state.advisor.chat(&request).await?))
}

pub async fn image_query(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ImageRequest>,
) -> ApiResult<ImageReply> {
    Ok(ok(state.advisor.analyze_image(&request).await?))
}

pub async fn speech_to_text(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<SpeechRequest>,
) -> ApiResult<SpeechReply> {
    Ok(ok(state.advisor.speech_to_text(&request).await?))
}

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_location")]
    pub location: String,
}

fn default_lang() -> String {
    BASE_LANGUAGE.to_string()
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

#[derive(Debug, Serialize)]
pub struct QuestionsBody {
    pub questions: &'static [&'static str],
    pub location: String,
}

pub async fn questions(Query(query): Query<QuestionsQuery>) -> ApiResult<QuestionsBody> {
    Ok(ok(QuestionsBody {
        questions: default_questions(&query.lang),
        location: query.location,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct WeatherBody {
    pub weather: serde_json::Value,
}

pub async fn weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<WeatherBody> {
    match state.advisor.weather(&query.location).await {
        Ok(weather) => Ok(ok(WeatherBody { weather })),
        Err(e) => {
            tracing::warn!(location = %query.location, error = %e, "Weather request failed");
            Err(ApiError::new("Weather data unavailable"))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PestRequest {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PestBody {
    pub result: PestPrediction,
}

pub async fn pest_detect(ApiJson(request): ApiJson<PestRequest>) -> ApiResult<PestBody> {
    let Some(image) = request.image.as_deref().filter(|i| !i.trim().is_empty()) else {
        return Err(ApiError::new("Image is required"));
    };
    let media = decode_payload(image).map_err(|e| ApiError::new(e.to_string()))?;
    let result = detect_pest(&media.bytes);
    tracing::info!(disease = result.disease, "Pest detection stub");
    Ok(ok(PestBody { result }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    #[serde(default)]
    pub soil_type: Option<String>,

    /// Month number, as a number or a numeric string
    #[serde(default)]
    pub month: Option<serde_json::Value>,

    #[serde(default)]
    pub pincode: Option<serde_json::Value>,
}

fn parse_month(value: Option<&serde_json::Value>) -> Option<u32> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64().and_then(|m| u32::try_from(m).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct AdviceBody {
    pub advisory: Advisory,
}

pub async fn advice(ApiJson(request): ApiJson<AdviceRequest>) -> ApiResult<AdviceBody> {
    let advisory = simple_advisory(
        request.soil_type.as_deref(),
        parse_month(request.month.as_ref()),
    );
    tracing::info!(
        soil = ?request.soil_type,
        pincode = ?request.pincode,
        crop = %advisory.recommended_crop,
        "Rules advisory"
    );
    Ok(ok(AdviceBody { advisory }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackBody {
    pub msg: &'static str,
}

pub async fn feedback(ApiJson(request): ApiJson<FeedbackRequest>) -> ApiResult<FeedbackBody> {
    tracing::info!(
        user = ?request.user_id,
        chars = request.feedback.as_deref().map(|f| f.chars().count()).unwrap_or(0),
        "Advice feedback"
    );
    Ok(ok(FeedbackBody {
        msg: "Feedback recorded. Thank you.",
    }))
}

/// Twilio-style webhook fields; either capitalisation is accepted
#[derive(Debug, Default, Deserialize)]
pub struct SmsInbound {
    #[serde(rename = "Body", default)]
    pub body_upper: Option<String>,

    #[serde(default)]
    pub body: Option<String>,
}

impl SmsInbound {
    fn text(&self) -> &str {
        self.body_upper
            .as_deref()
            .or(self.body.as_deref())
            .unwrap_or_default()
    }
}

/// Reply to an inbound SMS with plain text; accepts form or JSON bodies
pub async fn sms_inbound(request: Request) -> Result<String, ApiError> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let inbound = if is_json {
        Json::<SmsInbound>::from_request(request, &())
            .await
            .map(|Json(sms)| sms)?
    } else {
        Form::<SmsInbound>::from_request(request, &())
            .await
            .map(|Form(sms)| sms)?
    };

    let parsed = SmsRequest::parse(inbound.text());
    tracing::info!(soil = %parsed.soil_type, pincode = %parsed.pincode, "Inbound SMS");
    Ok(parsed.reply())
}

#[derive(Debug, Serialize)]
pub struct MarketBody {
    pub prices: BTreeMap<&'static str, &'static str>,
}

pub async fn market() -> ApiResult<MarketBody> {
    Ok(ok(MarketBody {
        prices: market_prices().into_iter().collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month(Some(&json!(7))), Some(7));
        assert_eq!(parse_month(Some(&json!(" 11 "))), Some(11));
        assert_eq!(parse_month(Some(&json!("July"))), None);
        assert_eq!(parse_month(Some(&json!(-1))), None);
        assert_eq!(parse_month(None), None);
    }

    #[test]
    fn test_envelope_flattens_body() {
        let Json(envelope) = ok(FeedbackBody { msg: "hi" });
        assert_eq!(
            serde_json::to_value(envelope).unwrap(),
            json!({"success": true, "msg": "hi"})
        );
    }

    #[test]
    fn test_sms_prefers_capitalised_body() {
        let sms = SmsInbound {
            body_upper: Some("SOIL clay".into()),
            body: Some("soil sandy".into()),
        };
        assert_eq!(sms.text(), "SOIL clay");
        assert_eq!(SmsInbound::default().text(), "");
    }
}
