//! Failure envelope
//!
//! Every handler failure becomes `{"success": false, "error": "..."}` with
//! HTTP 200, so clients branch on `success` rather than the status code.

use crate::advisor::AdvisorError;
use crate::providers::ProviderError;
use axum::Json;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

const INVALID_KEY: &str = "Invalid API key. Please check your Gemini API key configuration.";
const ACCESS_DENIED: &str = "API access denied. Please verify your API key permissions.";
const QUOTA_EXCEEDED: &str = "API quota exceeded. Please check your usage limits.";
const BODY_TOO_LARGE: &str = "Request body too large";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            error_type: None,
        }
    }

    /// An unreadable request body, reported in the envelope like any other failure
    fn rejected(status: StatusCode, detail: String) -> Self {
        tracing::warn!(status = status.as_u16(), detail = %detail, "Rejected request body");
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::new(BODY_TOO_LARGE)
        } else {
            Self::new(detail)
        }
    }
}

impl From<AdvisorError> for ApiError {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::Speech(ref speech) => Self {
                error_type: Some(speech.error_type()),
                ..Self::new(speech.to_string())
            },
            AdvisorError::Provider(ref provider) => {
                tracing::error!(error = %provider, "Provider call failed");
                Self::new(friendly_provider_message(provider))
            }
            AdvisorError::Validation(_) | AdvisorError::ModelNotConfigured => {
                Self::new(err.to_string())
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                Self::new(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Replace well-known model API failures with a message a farmer can act on
pub fn friendly_provider_message(err: &ProviderError) -> String {
    if matches!(err, ProviderError::RateLimit { .. }) {
        return QUOTA_EXCEEDED.to_string();
    }

    let message = err.to_string();
    if message.contains("API_KEY_INVALID") {
        INVALID_KEY.to_string()
    } else if message.contains("PERMISSION_DENIED") {
        ACCESS_DENIED.to_string()
    } else if message.contains("QUOTA_EXCEEDED") || message.contains("RESOURCE_EXHAUSTED") {
        QUOTA_EXCEEDED.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::SpeechError;

    #[test]
    fn test_friendly_messages() {
        let invalid = ProviderError::Api {
            status: 400,
            message: r#"{"error":{"status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#.into(),
        };
        assert_eq!(friendly_provider_message(&invalid), INVALID_KEY);

        let denied = ProviderError::auth("HTTP 403: PERMISSION_DENIED");
        assert_eq!(friendly_provider_message(&denied), ACCESS_DENIED);

        let exhausted = ProviderError::Api {
            status: 400,
            message: "RESOURCE_EXHAUSTED".into(),
        };
        assert_eq!(friendly_provider_message(&exhausted), QUOTA_EXCEEDED);

        let limited = ProviderError::rate_limit("too many requests");
        assert_eq!(friendly_provider_message(&limited), QUOTA_EXCEEDED);
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = ProviderError::network("connection refused");
        assert_eq!(friendly_provider_message(&err), "network error: connection refused");
    }

    #[test]
    fn test_rejected_body_messages() {
        let too_large = ApiError::rejected(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded".into());
        assert_eq!(too_large.error, BODY_TOO_LARGE);
        assert_eq!(too_large.error_type, None);

        let malformed = ApiError::rejected(StatusCode::BAD_REQUEST, "Failed to parse".into());
        assert_eq!(malformed.error, "Failed to parse");
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiError::new("Query is required")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "error": "Query is required"}));

        let speech: ApiError = AdvisorError::Speech(SpeechError::RecognitionFailed).into();
        let body = serde_json::to_value(speech).unwrap();
        assert_eq!(body["error_type"], "recognition_failed");
        assert_eq!(
            body["error"],
            "Could not understand the audio. Please speak clearly and try again."
        );
    }
}
