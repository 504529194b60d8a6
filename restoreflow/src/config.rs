//! Provider configuration.
//!
//! Credentials and endpoints are passed into the capability adapters at
//! construction. Nothing here is read again after startup.

use crate::errors::WorkflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Configuration of the Gemini vision and text client.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key.
    pub api_key: String,
    /// Model name.
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Base endpoint URL.
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl GeminiConfig {
    /// Creates a configuration with default model and endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_gemini_model(),
            endpoint: default_gemini_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Gets the timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Configuration of the OpenAI image-generation client.
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key.
    pub api_key: String,
    /// Image model name.
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Base endpoint URL.
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,
    /// Output size.
    #[serde(default = "default_image_size")]
    pub size: String,
    /// Output quality.
    #[serde(default = "default_image_quality")]
    pub quality: String,
    /// Request timeout in seconds.
    #[serde(default = "default_image_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_openai_model() -> String {
    "dall-e-3".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_image_quality() -> String {
    "standard".to_string()
}

fn default_image_timeout_secs() -> u64 {
    120
}

impl OpenAiConfig {
    /// Creates a configuration with default model, size and quality.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_openai_model(),
            endpoint: default_openai_endpoint(),
            size: default_image_size(),
            quality: default_image_quality(),
            timeout_secs: default_image_timeout_secs(),
        }
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Gets the timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("size", &self.size)
            .field("quality", &self.quality)
            .finish()
    }
}

/// Sampling temperature per task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    /// Vision identification.
    #[serde(default = "default_vision_temperature")]
    pub vision: f32,
    /// Restoration prompt writing.
    #[serde(default = "default_restoration_temperature")]
    pub restoration: f32,
    /// Historical research.
    #[serde(default = "default_historical_temperature")]
    pub historical: f32,
    /// Environmental prediction.
    #[serde(default = "default_environmental_temperature")]
    pub environmental: f32,
}

fn default_vision_temperature() -> f32 {
    0.1
}

fn default_restoration_temperature() -> f32 {
    0.7
}

fn default_historical_temperature() -> f32 {
    0.2
}

fn default_environmental_temperature() -> f32 {
    0.3
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            vision: default_vision_temperature(),
            restoration: default_restoration_temperature(),
            historical: default_historical_temperature(),
            environmental: default_environmental_temperature(),
        }
    }
}

/// Everything needed to build the HTTP capability adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Gemini, used for vision and text.
    pub gemini: GeminiConfig,
    /// OpenAI image generation; absent means restoration uses the local fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiConfig>,
    /// Per-task temperatures.
    #[serde(default)]
    pub temperatures: Temperatures,
}

impl ProviderConfig {
    /// Creates a configuration with Gemini only.
    #[must_use]
    pub fn new(gemini: GeminiConfig) -> Self {
        Self {
            gemini,
            openai: None,
            temperatures: Temperatures::default(),
        }
    }

    /// Enables OpenAI image generation.
    #[must_use]
    pub fn with_openai(mut self, openai: OpenAiConfig) -> Self {
        self.openai = Some(openai);
        self
    }

    /// Overrides the task temperatures.
    #[must_use]
    pub fn with_temperatures(mut self, temperatures: Temperatures) -> Self {
        self.temperatures = temperatures;
        self
    }

    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Config` if no Gemini key is set or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, WorkflowError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    ///
    /// Reads `GEMINI_API_KEY` (falling back to `GOOGLE_API_KEY`),
    /// `OPENAI_API_KEY`, `RESTOREFLOW_GEMINI_MODEL` and
    /// `RESTOREFLOW_TIMEOUT_SECS`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Config` if no Gemini key is set or a numeric
    /// variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = var("GEMINI_API_KEY")
            .or_else(|| var("GOOGLE_API_KEY"))
            .ok_or_else(|| {
                WorkflowError::config("GEMINI_API_KEY (or GOOGLE_API_KEY) is not set")
            })?;

        let mut gemini = GeminiConfig::new(api_key);
        if let Some(model) = var("RESTOREFLOW_GEMINI_MODEL") {
            gemini = gemini.with_model(model);
        }
        if let Some(raw) = var("RESTOREFLOW_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                WorkflowError::config(format!("RESTOREFLOW_TIMEOUT_SECS={raw}: {e}"))
            })?;
            gemini = gemini.with_timeout_secs(secs);
        }

        let mut config = Self::new(gemini);
        match var("OPENAI_API_KEY") {
            Some(key) => config = config.with_openai(OpenAiConfig::new(key)),
            None => tracing::info!("OPENAI_API_KEY not set; restoration will use local enhancement"),
        }
        Ok(config)
    }
}
