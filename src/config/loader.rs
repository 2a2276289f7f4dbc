//! Configuration loading with multi-layer merge

use super::ProviderConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level advisor configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdvisorConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Local storage (knowledge base and weather cache)
    #[serde(default)]
    pub storage: StorageConfig,

    /// Similarity search and seeding
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Outbound provider definitions
    #[serde(default)]
    pub providers: Providers,

    /// Extra location coordinates, keyed by lower-case location name
    #[serde(default)]
    pub locations: HashMap<String, Coordinates>,
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size; base64 images and audio are large
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database path (`~` is expanded)
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Weather cache TTL in seconds; 0 disables the cache
    #[serde(default = "default_weather_cache_ttl")]
    pub weather_cache_ttl: u64,
}

fn default_db_path() -> String {
    "krishi_knowledge.db".into()
}

fn default_weather_cache_ttl() -> u64 {
    1800
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            weather_cache_ttl: default_weather_cache_ttl(),
        }
    }
}

impl StorageConfig {
    /// Database path with `~` expanded
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeConfig {
    /// Number of records fed into the chat prompt
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Additive score boost for records tagged with the query's location
    #[serde(default = "default_location_boost")]
    pub location_boost: f32,

    /// Seed file overriding the bundled knowledge
    #[serde(default)]
    pub seed_file: Option<PathBuf>,

    /// Seed the knowledge base at startup when it is empty
    #[serde(default = "default_true")]
    pub seed_on_start: bool,
}

fn default_top_k() -> usize {
    3
}

fn default_location_boost() -> f32 {
    crate::memory::DEFAULT_LOCATION_BOOST
}

fn default_true() -> bool {
    true
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            location_boost: default_location_boost(),
            seed_file: None,
            seed_on_start: true,
        }
    }
}

/// The fixed set of providers the advisor talks to
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Providers {
    #[serde(default = "default_gemini")]
    pub gemini: ProviderConfig,

    #[serde(default = "default_weather")]
    pub weather: ProviderConfig,

    #[serde(default = "default_translate")]
    pub translate: ProviderConfig,

    #[serde(default = "default_speech")]
    pub speech: ProviderConfig,

    #[serde(default = "default_embedding")]
    pub embedding: ProviderConfig,
}

fn default_gemini() -> ProviderConfig {
    ProviderConfig::new(
        "https://generativelanguage.googleapis.com/v1beta",
        Some("GEMINI_API_KEY"),
    )
    .with_model("gemini-2.0-flash-exp")
    .with_timeout(60)
}

fn default_weather() -> ProviderConfig {
    ProviderConfig::new("https://api.openweathermap.org/data/2.5", Some("WEATHER_API_KEY"))
        .with_timeout(10)
}

fn default_translate() -> ProviderConfig {
    ProviderConfig::new(
        "https://translation.googleapis.com/language/translate/v2",
        Some("GOOGLE_TRANSLATE_API_KEY"),
    )
    .with_timeout(10)
}

fn default_speech() -> ProviderConfig {
    ProviderConfig::new("https://speech.googleapis.com/v1", Some("GOOGLE_SPEECH_API_KEY"))
}

fn default_embedding() -> ProviderConfig {
    // No endpoint: the offline hashing encoder is used until one is configured
    ProviderConfig::new("", Some("EMBEDDING_API_KEY"))
        .with_model("all-minilm")
        .with_timeout(10)
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            gemini: default_gemini(),
            weather: default_weather(),
            translate: default_translate(),
            speech: default_speech(),
            embedding: default_embedding(),
        }
    }
}

impl AdvisorConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/krishi/config.toml
    /// 3. .krishi/config.toml (project)
    /// 4. An explicit `--config` file
    /// 5. KRISHI_BIND / KRISHI_PORT / KRISHI_DB_PATH
    pub fn load(explicit: Option<&Path>, project_dir: Option<&Path>) -> Result<Self> {
        let mut merged =
            toml::Value::try_from(Self::default()).context("serializing default configuration")?;

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                merge_values(&mut merged, read_layer(&user_config_path)?);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".krishi/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".krishi/config.toml"));

        if project_config_path.exists() {
            merge_values(&mut merged, read_layer(&project_config_path)?);
        }

        if let Some(path) = explicit {
            merge_values(&mut merged, read_layer(path)?);
        }

        let mut config: Self = merged.try_into().context("invalid configuration")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Get the user config path (~/.config/krishi/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("krishi/config.toml"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(bind) = std::env::var("KRISHI_BIND") {
            self.server.bind = bind;
        }
        if let Ok(port) = std::env::var("KRISHI_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("KRISHI_PORT is not a valid port: {port}"))?;
        }
        if let Ok(path) = std::env::var("KRISHI_DB_PATH") {
            self.storage.db_path = path;
        }
        Ok(())
    }

    /// Fail unless the keys the server cannot run without are present
    pub fn require_keys(&self) -> Result<()> {
        for (name, provider) in [
            ("gemini", &self.providers.gemini),
            ("weather", &self.providers.weather),
        ] {
            if provider.api_key().is_none() {
                let var = provider.api_key_env.as_deref().unwrap_or("<unset>");
                anyhow::bail!("{} environment variable is required for the {} provider", var, name);
            }
        }
        Ok(())
    }
}

fn read_layer(path: &Path) -> Result<toml::Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: toml::Value =
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Loaded configuration layer");
    Ok(value)
}

/// Deep-merge `overlay` into `base`; tables merge per key, everything else is replaced
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
