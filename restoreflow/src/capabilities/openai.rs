//! OpenAI image generation client.

use super::{CapabilityError, ImageCapability};
use crate::config::OpenAiConfig;
use crate::parsing::truncate_chars;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Longest prompt sent to the images endpoint, in characters.
pub const MAX_PROMPT_CHARS: usize = 4000;

/// `/images/generations` client returning decoded image bytes.
pub struct OpenAiImageClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiImageClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError::Http` if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CapabilityError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_url(&self) -> String {
        format!(
            "{}/images/generations",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ImageRequest<'a> {
        ImageRequest {
            model: &self.config.model,
            prompt: truncate_chars(prompt, MAX_PROMPT_CHARS),
            n: 1,
            size: &self.config.size,
            quality: &self.config.quality,
            response_format: "b64_json",
        }
    }
}

impl std::fmt::Debug for OpenAiImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiImageClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn decode_response(text: &str) -> Result<Vec<u8>, CapabilityError> {
    let parsed: ImageResponse =
        serde_json::from_str(text).map_err(|e| CapabilityError::Serialization(e.to_string()))?;
    let encoded = parsed
        .data
        .into_iter()
        .find_map(|d| d.b64_json)
        .ok_or_else(|| CapabilityError::Response("No image in response".to_string()))?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| CapabilityError::Serialization(e.to_string()))
}

#[async_trait]
impl ImageCapability for OpenAiImageClient {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, CapabilityError> {
        tracing::debug!(model = %self.config.model, "Calling OpenAI image generation");

        let response = self
            .client
            .post(self.build_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| CapabilityError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CapabilityError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map_or(text, |envelope| envelope.error.message);
            return Err(CapabilityError::Response(format!("HTTP {status}: {message}")));
        }

        decode_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiImageClient {
        OpenAiImageClient::new(OpenAiConfig::new("sk-test").with_endpoint("https://example.test/v1/"))
            .unwrap()
    }

    #[test]
    fn test_build_url() {
        assert_eq!(client().build_url(), "https://example.test/v1/images/generations");
    }

    #[test]
    fn test_request_body() {
        let client = client();
        let body = serde_json::to_value(client.request_body("restore the vase")).unwrap();
        assert_eq!(body["model"], "dall-e-3");
        assert_eq!(body["size"], "1024x1024");
        assert_eq!(body["quality"], "standard");
        assert_eq!(body["response_format"], "b64_json");
        assert_eq!(body["n"], 1);
    }

    #[test]
    fn test_prompt_truncated_on_char_boundary() {
        let long = "é".repeat(MAX_PROMPT_CHARS + 10);
        let client = client();
        let body = client.request_body(&long);
        assert_eq!(body.prompt.chars().count(), MAX_PROMPT_CHARS);
        assert_eq!(truncate_chars("short", MAX_PROMPT_CHARS), "short");
    }

    #[test]
    fn test_decode_response() {
        let bytes = decode_response(r#"{"data":[{"b64_json":"AQID"}]}"#).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);

        let err = decode_response(r#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, CapabilityError::Response(_)));

        let err = decode_response("not json").unwrap_err();
        assert!(matches!(err, CapabilityError::Serialization(_)));
    }
}
