//! Image analysis pipeline

use super::chat::{DEFAULT_SOIL, non_empty};
use super::{
    Advisor, AdvisorError, BASE_LANGUAGE, DEFAULT_LOCATION, decode_payload, normalize_location,
    season_guidance,
};
use crate::providers::{GenerationRequest, InlineImage};
use crate::template::{PromptContext, prompts, title_case};
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_QUERY: &str = "Analyze this agricultural image and provide farming advice";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    /// Base64 image, optionally as a `data:` URL
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub soil_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageReply {
    pub response: String,
    pub analysis_type: &'static str,
    pub location_context: String,
}

impl Advisor {
    /// Ask the model about a crop photo
    pub async fn analyze_image(&self, request: &ImageRequest) -> Result<ImageReply, AdvisorError> {
        let Some(payload) = non_empty(request.image.as_deref()) else {
            return Err(AdvisorError::validation("Image is required"));
        };
        self.require_model()?;

        let media = decode_payload(payload)?;
        let location = normalize_location(request.location.as_deref().unwrap_or(DEFAULT_LOCATION));
        let soil_type = non_empty(request.soil_type.as_deref()).unwrap_or(DEFAULT_SOIL);
        let query = non_empty(request.query.as_deref()).unwrap_or(DEFAULT_IMAGE_QUERY);
        let language = non_empty(request.language.as_deref()).unwrap_or(BASE_LANGUAGE);

        let today = Utc::now();
        let ctx = PromptContext::new(location.as_str(), soil_type, query)
            .with_season(season_guidance(today))
            .with_today(today);
        let prompt = self.templates.render_named(prompts::IMAGE, &ctx)?;

        let image = InlineImage {
            mime_type: media.image_mime_type().to_string(),
            data: media.bytes,
        };
        tracing::debug!(mime = %image.mime_type, bytes = image.data.len(), "Analyzing image");

        let generated = self
            .providers
            .model
            .generate(&GenerationRequest::new(prompt).with_image(image))
            .await?;

        self.log_generation("image", &location, &generated);

        Ok(ImageReply {
            response: self.translate_reply(generated.text, language).await,
            analysis_type: "image_analysis",
            location_context: format!("{}, {} soil", title_case(&location), soil_type),
        })
    }
}
