//! Capability boundary: the model providers the workflow depends on.
//!
//! The core only sees three traits. Provider adapters live behind the
//! `providers` feature; the local enhancement fallback is always available.

pub mod enhance;
#[cfg(feature = "providers")]
pub mod gemini;
#[cfg(feature = "providers")]
pub mod openai;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub use enhance::{enhance_image, EnhanceSettings};
#[cfg(feature = "providers")]
pub use gemini::GeminiClient;
#[cfg(feature = "providers")]
pub use openai::OpenAiImageClient;

/// Errors raised by capability calls.
///
/// These never cross a stage boundary: stages turn them into error results.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with an error or an unusable body.
    #[error("Provider response error: {0}")]
    Response(String),

    /// The provider body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The capability is not configured (e.g. no credential).
    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    /// Image decoding or encoding failed.
    #[error("Image processing error: {0}")]
    Image(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CapabilityError {
    /// Returns true if the capability is simply not configured.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// An artifact image handed to the vision capability.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Where the image was read from.
    pub path: PathBuf,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type detected from the bytes.
    pub mime_type: String,
}

impl ImageInput {
    /// Wraps already-read bytes, detecting the MIME type from their content.
    #[must_use]
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let mime_type = image::guess_format(&bytes)
            .map_or("image/jpeg", |format| format.to_mime_type())
            .to_string();
        Self {
            path: path.into(),
            bytes,
            mime_type,
        }
    }

    /// Reads an image from disk.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError::Io` if the file cannot be read.
    pub async fn read(path: &Path) -> Result<Self, CapabilityError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(path, bytes))
    }
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("path", &self.path)
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A text-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    /// Role instruction.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl TextRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature,
        }
    }
}

/// Vision identification: image in, structured text out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisionCapability: Send + Sync {
    /// Identifies the artifact in `image` following `prompt`.
    async fn identify(&self, image: &ImageInput, prompt: &str) -> Result<String, CapabilityError>;
}

/// Text generation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextCapability: Send + Sync {
    /// Generates text for `request`.
    async fn generate_text(&self, request: &TextRequest) -> Result<String, CapabilityError>;
}

/// Image generation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageCapability: Send + Sync {
    /// Generates an encoded image for `prompt`.
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, CapabilityError>;
}

/// The capabilities a workflow needs.
///
/// `image` is optional: without it the restoration stage falls back to
/// local enhancement.
#[derive(Clone)]
pub struct CapabilitySet {
    /// Vision identification.
    pub vision: Arc<dyn VisionCapability>,
    /// Text generation.
    pub text: Arc<dyn TextCapability>,
    /// Image generation, when configured.
    pub image: Option<Arc<dyn ImageCapability>>,
}

impl CapabilitySet {
    /// Creates a set without image generation.
    #[must_use]
    pub fn new(vision: Arc<dyn VisionCapability>, text: Arc<dyn TextCapability>) -> Self {
        Self {
            vision,
            text,
            image: None,
        }
    }

    /// Adds image generation.
    #[must_use]
    pub fn with_image(mut self, image: Arc<dyn ImageCapability>) -> Self {
        self.image = Some(image);
        self
    }

    /// Builds HTTP adapters from provider configuration.
    ///
    /// Gemini serves vision and text; OpenAI image generation is added only
    /// when configured.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError::Http` if an HTTP client cannot be built.
    #[cfg(feature = "providers")]
    pub fn from_config(config: &crate::config::ProviderConfig) -> Result<Self, CapabilityError> {
        let gemini = Arc::new(GeminiClient::new(
            config.gemini.clone(),
            config.temperatures.vision,
        )?);
        let mut set = Self::new(gemini.clone(), gemini);
        if let Some(openai) = &config.openai {
            set = set.with_image(Arc::new(OpenAiImageClient::new(openai.clone())?));
        }
        Ok(set)
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("image_generation", &self.image.is_some())
            .finish_non_exhaustive()
    }
}
