//! Indian cropping seasons by calendar month

use chrono::{DateTime, Datelike, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Kharif,
    Rabi,
    Summer,
}

impl Season {
    /// June-September is Kharif, October-March Rabi, April-May Summer.
    /// Months outside 1..=12 are treated as Rabi.
    pub fn for_month(month: u32) -> Self {
        match month {
            6..=9 => Season::Kharif,
            4 | 5 => Season::Summer,
            _ => Season::Rabi,
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            Season::Kharif => {
                "This is Kharif season. Focus on monsoon crops like rice, maize, cotton, sugarcane."
            }
            Season::Rabi => "This is Rabi season. Ideal time for wheat, barley, mustard, gram, peas.",
            Season::Summer => {
                "Summer season. Focus on irrigation management and summer crops like fodder, vegetables."
            }
        }
    }

    /// `Current Season: <Season>. <guidance>`
    pub fn describe(self) -> String {
        format!("Current Season: {}. {}", self, self.guidance())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Kharif => "Kharif",
            Season::Rabi => "Rabi",
            Season::Summer => "Summer",
        };
        f.write_str(name)
    }
}

/// Guidance line for the month of `today`
pub fn season_guidance(today: DateTime<Utc>) -> String {
    Season::for_month(today.month()).describe()
}
