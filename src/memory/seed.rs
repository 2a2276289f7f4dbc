//! Seed documents for an empty knowledge base

use super::KnowledgeError;
use crate::template::title_case;
use serde::Deserialize;
use std::path::Path;

const BUNDLED_SEED: &str = include_str!("../../data/knowledge.toml");

pub const CROP_GUIDANCE: &str = "crop_guidance";
pub const SOIL_MANAGEMENT: &str = "soil_management";

/// Parsed seed file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub crops: Vec<CropEntry>,
    #[serde(default)]
    pub soils: Vec<SoilEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropEntry {
    pub location: String,
    pub crop: String,
    pub planting_time: String,
    pub harvesting_time: String,
    pub soil_requirements: String,
    pub fertilizer: String,
    pub pesticides: String,
    pub irrigation: String,
    #[serde(rename = "yield")]
    pub expected_yield: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoilEntry {
    pub soil: String,
    pub characteristics: String,
    pub suitable_crops: String,
    pub fertilizer_strategy: String,
    pub organic_matter: String,
}

/// One document ready to be embedded and stored
#[derive(Debug, Clone, PartialEq)]
pub struct SeedDocument {
    pub content: String,
    pub category: &'static str,
    pub location: String,
}

impl SeedFile {
    /// The knowledge shipped with the binary
    pub fn bundled() -> Result<Self, KnowledgeError> {
        Self::parse(BUNDLED_SEED, "<bundled>")
    }

    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let contents = std::fs::read_to_string(path).map_err(|e| KnowledgeError::Seed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    fn parse(contents: &str, origin: &str) -> Result<Self, KnowledgeError> {
        toml::from_str(contents).map_err(|e| KnowledgeError::Seed {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Render every entry into a document; crops first, then soils
    pub fn documents(&self) -> Vec<SeedDocument> {
        let crops = self.crops.iter().map(|c| SeedDocument {
            content: format!(
                "Crop: {} in {}\n\
                 Planting Time: {}\n\
                 Harvesting Time: {}\n\
                 Soil Requirements: {}\n\
                 Fertilizer Recommendation: {}\n\
                 Pesticide Usage: {}\n\
                 Irrigation: {}\n\
                 Expected Yield: {}",
                title_case(&c.crop),
                title_case(&c.location),
                c.planting_time,
                c.harvesting_time,
                c.soil_requirements,
                c.fertilizer,
                c.pesticides,
                c.irrigation,
                c.expected_yield,
            ),
            category: CROP_GUIDANCE,
            location: c.location.to_lowercase(),
        });

        let soils = self.soils.iter().map(|s| SeedDocument {
            content: format!(
                "Soil Type: {}\n\
                 Characteristics: {}\n\
                 Suitable Crops: {}\n\
                 Fertilizer Strategy: {}\n\
                 Organic Matter Management: {}",
                title_case(&s.soil),
                s.characteristics,
                s.suitable_crops,
                s.fertilizer_strategy,
                s.organic_matter,
            ),
            category: SOIL_MANAGEMENT,
            location: "general".to_string(),
        });

        crops.chain(soils).collect()
    }
}
