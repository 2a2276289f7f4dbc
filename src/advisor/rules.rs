//! Rules-based advisory, SMS keyword replies and indicative market prices

use super::season::Season;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static SOIL_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)soil\s+(\w+)").expect("valid soil regex"));
static PIN_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pin\s+(\d{5,6})").expect("valid pin regex"));

const DEFAULT_SOIL: &str = "loamy";
const DEFAULT_PINCODE: &str = "000000";

/// Output of the rules advisory
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub recommended_crop: String,
    pub season: String,
    pub fertilizer: String,
    pub notes: String,
}

/// Season from the month (Kharif for June-September, otherwise Rabi) and a
/// crop from the soil type
pub fn simple_advisory(soil_type: Option<&str>, month: Option<u32>) -> Advisory {
    let season = match month {
        Some(m) if Season::for_month(m) == Season::Kharif => Season::Kharif,
        _ => Season::Rabi,
    };

    let crop = match soil_type.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("clay") => "Rice",
        Some("sandy") => "Pearl millet / Maize",
        Some("loamy") => "Wheat / Vegetables",
        Some("silt") => "Sugarcane / Rice",
        _ => "Wheat",
    };

    let fertilizer = if crop == "Rice" {
        "Urea (split application)"
    } else {
        "General NPK as per soil test"
    };

    let soil_label = soil_type
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SOIL);

    Advisory {
        recommended_crop: crop.to_string(),
        season: season.to_string(),
        fertilizer: fertilizer.to_string(),
        notes: format!(
            "Based on {} soil and {} season. Check local market & soil test.",
            soil_label, season
        ),
    }
}

/// Keywords pulled out of an inbound SMS
#[derive(Debug, Clone, PartialEq)]
pub struct SmsRequest {
    pub soil_type: String,
    pub pincode: String,
}

impl SmsRequest {
    /// Parse `soil <word>` and `pin <5-6 digits>`, case-insensitively
    pub fn parse(body: &str) -> Self {
        let soil_type = SOIL_KEYWORD
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_else(|| DEFAULT_SOIL.to_string());
        let pincode = PIN_KEYWORD
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| DEFAULT_PINCODE.to_string());
        Self { soil_type, pincode }
    }

    pub fn reply(&self) -> String {
        let crop = if self.soil_type == "clay" { "Rice" } else { "Wheat" };
        format!("Rec: {}. Reply STOP to end.", crop)
    }
}

/// Static indicative mandi prices
pub fn market_prices() -> [(&'static str, &'static str); 3] {
    [
        ("wheat", "₹2000/quintal"),
        ("rice", "₹1800/quintal"),
        ("maize", "₹1600/quintal"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisory_clay_kharif() {
        let advisory = simple_advisory(Some("Clay"), Some(7));
        assert_eq!(advisory.recommended_crop, "Rice");
        assert_eq!(advisory.season, "Kharif");
        assert_eq!(advisory.fertilizer, "Urea (split application)");
        assert_eq!(
            advisory.notes,
            "Based on Clay soil and Kharif season. Check local market & soil test."
        );
    }

    #[test]
    fn test_advisory_defaults() {
        let advisory = simple_advisory(None, None);
        assert_eq!(advisory.recommended_crop, "Wheat");
        assert_eq!(advisory.season, "Rabi");
        assert_eq!(advisory.fertilizer, "General NPK as per soil test");
        assert!(advisory.notes.starts_with("Based on loamy soil"));
    }

    #[test]
    fn test_advisory_summer_month_is_rabi() {
        assert_eq!(simple_advisory(Some("sandy"), Some(5)).season, "Rabi");
        assert_eq!(
            simple_advisory(Some("silt"), Some(1)).recommended_crop,
            "Sugarcane / Rice"
        );
    }

    #[test]
    fn test_sms_parse() {
        let sms = SmsRequest::parse("SOIL clay PIN 110038");
        assert_eq!(sms.soil_type, "clay");
        assert_eq!(sms.pincode, "110038");
        assert_eq!(sms.reply(), "Rec: Rice. Reply STOP to end.");
    }

    #[test]
    fn test_sms_defaults() {
        let sms = SmsRequest::parse("hello pin 12");
        assert_eq!(sms.soil_type, "loamy");
        assert_eq!(sms.pincode, "000000");
        assert_eq!(sms.reply(), "Rec: Wheat. Reply STOP to end.");
    }

    #[test]
    fn test_market_prices() {
        let prices = market_prices();
        assert_eq!(prices[0], ("wheat", "₹2000/quintal"));
    }
}
