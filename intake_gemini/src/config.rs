//! Gemini connection settings.

use intake_core::SynthesisError;
use std::fmt;

/// Model used when `GEMINI_MODEL` is unset.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Public v1beta models endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Environment variables read by [`GeminiConfig::from_env`].
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";

/// Where and how to reach Gemini.
#[derive(Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    /// Create a config for the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the models endpoint, e.g. for a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load from the process environment after reading `.env` if present.
    pub fn from_env() -> Result<Self, SynthesisError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SynthesisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = non_blank(API_KEY_VAR)
            .ok_or_else(|| SynthesisError::Configuration(format!("{API_KEY_VAR} is not set")))?;

        let mut config = Self::new(api_key.trim());
        if let Some(model) = non_blank(MODEL_VAR) {
            config.model = model.trim().to_string();
        }
        if let Some(base_url) = non_blank(BASE_URL_VAR) {
            config.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// The `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
            api_key = self.api_key
        )
    }
}

// The key stays out of logs.
impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GeminiConfig::from_lookup(lookup(&[(API_KEY_VAR, "secret")])).unwrap();

        assert_eq!(config.api_key, "secret");
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_overrides() {
        let config = GeminiConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "secret"),
            (MODEL_VAR, "gemini-pro"),
            (BASE_URL_VAR, "http://localhost:8080/models/"),
        ]))
        .unwrap();

        assert_eq!(
            config.endpoint(),
            "http://localhost:8080/models/gemini-pro:generateContent?key=secret"
        );
    }

    #[test]
    fn test_missing_key() {
        for vars in [vec![], vec![(API_KEY_VAR, "   ")]] {
            let error = GeminiConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(error, SynthesisError::Configuration(_)));
            assert!(!error.is_retryable());
        }
    }

    #[test]
    fn test_debug_hides_key() {
        let config = GeminiConfig::new("secret");
        let printed = format!("{config:?}");

        assert!(!printed.contains("secret"));
        assert!(printed.contains(DEFAULT_GEMINI_MODEL));
    }
}
