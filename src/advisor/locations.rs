//! Location name to coordinates

use crate::config::Coordinates;
use std::collections::HashMap;

pub const DEFAULT_LOCATION: &str = "delhi";

const DELHI: Coordinates = Coordinates {
    lat: 28.6139,
    lon: 77.2090,
};

const BUILTIN: &[(&str, Coordinates)] = &[
    (DEFAULT_LOCATION, DELHI),
    ("punjab", Coordinates { lat: 31.1471, lon: 75.3412 }),
    ("uttar pradesh", Coordinates { lat: 26.8467, lon: 80.9462 }),
    ("up", Coordinates { lat: 26.8467, lon: 80.9462 }),
];

/// Known locations; configured entries override the built-in ones
#[derive(Debug, Clone)]
pub struct LocationTable {
    entries: HashMap<String, Coordinates>,
}

impl Default for LocationTable {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

impl LocationTable {
    pub fn new(extra: &HashMap<String, Coordinates>) -> Self {
        let mut entries: HashMap<String, Coordinates> = BUILTIN
            .iter()
            .map(|(name, coords)| (name.to_string(), *coords))
            .collect();
        for (name, coords) in extra {
            entries.insert(normalize_location(name), *coords);
        }
        Self { entries }
    }

    /// Coordinates for `name`, falling back to delhi
    pub fn resolve(&self, name: &str) -> Coordinates {
        self.entries
            .get(&normalize_location(name))
            .copied()
            .unwrap_or(DELHI)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_location(name))
    }
}

/// Trimmed, lower-cased location key; empty input means the default location
pub fn normalize_location(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_LOCATION.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let table = LocationTable::default();
        assert_eq!(table.resolve("  Punjab ").lat, 31.1471);
        assert_eq!(table.resolve("UP"), table.resolve("uttar pradesh"));
    }

    #[test]
    fn test_unknown_falls_back_to_delhi() {
        let table = LocationTable::default();
        assert_eq!(table.resolve("atlantis"), DELHI);
        assert_eq!(table.resolve(""), DELHI);
        assert!(!table.contains("atlantis"));
    }

    #[test]
    fn test_configured_locations() {
        let mut extra = HashMap::new();
        extra.insert("Haryana".to_string(), Coordinates { lat: 29.0588, lon: 76.0856 });
        let table = LocationTable::new(&extra);
        assert!(table.contains("haryana"));
        assert_eq!(table.resolve("HARYANA").lon, 76.0856);
    }

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location(" Uttar Pradesh "), "uttar pradesh");
        assert_eq!(normalize_location("   "), "delhi");
    }
}
