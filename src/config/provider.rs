//! Provider configuration for the external services the advisor calls

use serde::{Deserialize, Serialize};

/// Configuration for a single outbound provider (model, weather, translate, ...)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the provider's REST API
    pub endpoint: String,

    /// Model name (generative and embedding providers)
    #[serde(default)]
    pub model: Option<String>,

    /// Name of the environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Whether this provider is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Timeout in seconds for requests
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: None,
            api_key_env: None,
            enabled: true,
            timeout: default_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Build a provider with the given endpoint and key variable
    pub fn new(endpoint: impl Into<String>, api_key_env: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key_env: api_key_env.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Resolve the API key from the environment. Empty values and disabled
    /// providers count as unset.
    pub fn api_key(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let var = self.api_key_env.as_deref()?;
        std::env::var(var).ok().filter(|v| !v.trim().is_empty())
    }

    /// True if the provider is enabled and has somewhere to send requests
    pub fn is_usable(&self) -> bool {
        self.enabled && (self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let toml = r#"
            endpoint = "https://api.openweathermap.org/data/2.5"
        "#;
        let config: ProviderConfig = toml::from_str(toml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.timeout, 30);
        assert!(config.model.is_none());
        assert!(config.is_usable());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            endpoint = "https://generativelanguage.googleapis.com/v1beta"
            model = "gemini-2.0-flash-exp"
            api_key_env = "GEMINI_API_KEY"
            enabled = false
            timeout = 90
        "#;
        let config: ProviderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.0-flash-exp"));
        assert_eq!(config.api_key_env.as_deref(), Some("GEMINI_API_KEY"));
        assert_eq!(config.timeout, 90);
        assert!(!config.is_usable());
    }

    #[test]
    fn test_reject_unknown_fields() {
        let toml = r#"
            endpoint = "http://localhost:11434/v1"
            secret = "inline keys are not allowed"
        "#;
        let result: Result<ProviderConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_api_key_from_env() {
        // SAFETY: test-local variable name, not read by any other test
        unsafe { std::env::set_var("KRISHI_TEST_PROVIDER_KEY", "abc123") };
        let config = ProviderConfig::new("https://example.com", Some("KRISHI_TEST_PROVIDER_KEY"));
        assert_eq!(config.api_key().as_deref(), Some("abc123"));

        unsafe { std::env::set_var("KRISHI_TEST_PROVIDER_KEY", "  ") };
        assert!(config.api_key().is_none());

        let no_var = ProviderConfig::new("https://example.com", None);
        assert!(no_var.api_key().is_none());

        unsafe { std::env::set_var("KRISHI_TEST_PROVIDER_KEY", "abc123") };
        let disabled = ProviderConfig {
            enabled: false,
            ..config.clone()
        };
        assert!(disabled.api_key().is_none());
    }

    #[test]
    fn test_non_http_endpoint_is_not_usable() {
        let config = ProviderConfig::new("", None);
        assert!(!config.is_usable());
    }
}
