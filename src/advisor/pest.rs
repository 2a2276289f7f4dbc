//! Placeholder pest detector

use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PestPrediction {
    pub disease: &'static str,
    pub confidence: f32,
    pub remedy: &'static str,
}

pub const PREDICTIONS: &[PestPrediction] = &[
    PestPrediction {
        disease: "Aphids",
        confidence: 0.85,
        remedy: "Neem oil spray",
    },
    PestPrediction {
        disease: "Blight",
        confidence: 0.66,
        remedy: "Remove infected leaves; copper fungicide",
    },
    PestPrediction {
        disease: "Healthy",
        confidence: 0.9,
        remedy: "No action needed",
    },
];

/// One canned prediction chosen uniformly at random. The image is not inspected.
pub fn detect_pest(_image: &[u8]) -> PestPrediction {
    let index = rand::rng().random_range(0..PREDICTIONS.len());
    PREDICTIONS[index].clone()
}
