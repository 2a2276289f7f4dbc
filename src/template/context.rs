//! Prompt context for variable resolution

use chrono::{DateTime, Utc};
use minijinja::value::{Enumerator, Object, Value};
use std::sync::Arc;

const KNOWN_VARIABLES: &[&str] = &[
    "location",
    "soil_type",
    "query",
    "season",
    "knowledge",
    "weather",
    "today",
];

/// Everything a prompt template can reference
#[derive(Debug, Clone)]
pub struct PromptContext {
    /// Lower-cased location name
    pub location: String,

    pub soil_type: String,

    /// The query in English
    pub query: String,

    /// Rendered season guidance line
    pub season: String,

    /// Contents of the retrieved knowledge records, best first
    pub knowledge: Vec<String>,

    /// Weather line, `None` when no forecast was available
    pub weather: Option<String>,

    /// Reference time for date-dependent wording
    pub today: DateTime<Utc>,
}

impl PromptContext {
    pub fn new(
        location: impl Into<String>,
        soil_type: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            soil_type: soil_type.into(),
            query: query.into(),
            season: String::new(),
            knowledge: Vec::new(),
            weather: None,
            today: Utc::now(),
        }
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = season.into();
        self
    }

    pub fn with_knowledge(mut self, knowledge: Vec<String>) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn with_weather(mut self, weather: Option<String>) -> Self {
        self.weather = weather;
        self
    }

    pub fn with_today(mut self, today: DateTime<Utc>) -> Self {
        self.today = today;
        self
    }

    /// Convert to a minijinja Value for template rendering
    pub fn to_value(&self) -> Value {
        Value::from_object(ContextObject(self.clone()))
    }

    /// Top-level variable names, for error suggestions
    pub fn known_variables(&self) -> Vec<&str> {
        KNOWN_VARIABLES.to_vec()
    }
}

#[derive(Debug)]
struct ContextObject(PromptContext);

impl Object for ContextObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let ctx = &self.0;
        match key.as_str()? {
            "location" => Some(Value::from(ctx.location.clone())),
            "soil_type" => Some(Value::from(ctx.soil_type.clone())),
            "query" => Some(Value::from(ctx.query.clone())),
            "season" => Some(Value::from(ctx.season.clone())),
            "knowledge" => Some(Value::from(ctx.knowledge.clone())),
            // Present but none, so templates can test it with `is none`
            "weather" => Some(ctx.weather.clone().map(Value::from).unwrap_or(Value::from(()))),
            "today" => Some(Value::from(ctx.today.to_rfc3339())),
            _ => None,
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(KNOWN_VARIABLES)
    }
}
