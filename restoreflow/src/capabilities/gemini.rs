//! Gemini client serving vision identification and text generation.

use super::{CapabilityError, ImageInput, TextCapability, TextRequest, VisionCapability};
use crate::config::GeminiConfig;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
    vision_temperature: f32,
}

impl GeminiClient {
    /// Creates a client. `vision_temperature` is used for identification calls.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError::Http` if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig, vision_temperature: f32) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CapabilityError::Http(e.to_string()))?;
        Ok(Self {
            client,
            config,
            vision_temperature,
        })
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        )
    }

    async fn generate(&self, body: &GeminiRequest) -> Result<String, CapabilityError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(model = %self.config.model, "Calling Gemini generateContent");

        let response = self
            .client
            .post(self.build_url())
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| CapabilityError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CapabilityError::Http(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(CapabilityError::Response(format!("HTTP {status}: {text}")));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| CapabilityError::Serialization(e.to_string()))?;
        parsed.into_text()
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .field("vision_temperature", &self.vision_temperature)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
}

impl GeminiResponse {
    fn into_text(self) -> Result<String, CapabilityError> {
        if let Some(error) = self.error {
            return Err(CapabilityError::Response(format!(
                "Gemini API error: {}",
                error.message
            )));
        }

        let text: String = self
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CapabilityError::Response("No content in response".to_string()));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn vision_request(image: &ImageInput, prompt: &str, temperature: f32) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts: vec![
                GeminiPart::Text {
                    text: prompt.to_string(),
                },
                GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: image.mime_type.clone(),
                        data: STANDARD.encode(&image.bytes),
                    },
                },
            ],
        }],
        system_instruction: None,
        generation_config: GeminiGenerationConfig { temperature },
    }
}

fn text_request(request: &TextRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart::Text {
                text: request.prompt.clone(),
            }],
        }],
        system_instruction: if request.system.is_empty() {
            None
        } else {
            Some(GeminiSystemInstruction {
                parts: vec![GeminiPart::Text {
                    text: request.system.clone(),
                }],
            })
        },
        generation_config: GeminiGenerationConfig {
            temperature: request.temperature,
        },
    }
}

#[async_trait]
impl VisionCapability for GeminiClient {
    async fn identify(&self, image: &ImageInput, prompt: &str) -> Result<String, CapabilityError> {
        self.generate(&vision_request(image, prompt, self.vision_temperature))
            .await
    }
}

#[async_trait]
impl TextCapability for GeminiClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, CapabilityError> {
        self.generate(&text_request(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(
            GeminiConfig::new("test-key").with_endpoint("https://example.test/v1beta/"),
            0.1,
        )
        .unwrap()
    }

    #[test]
    fn test_build_url() {
        assert_eq!(
            client().build_url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent?key=test-key"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        assert!(!format!("{:?}", client()).contains("test-key"));
    }

    #[test]
    fn test_vision_request_shape() {
        let image = ImageInput::from_bytes("a.jpg", vec![1, 2, 3]);
        let body = serde_json::to_value(vision_request(&image, "identify", 0.1)).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "identify");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_text_request_shape() {
        let body =
            serde_json::to_value(text_request(&TextRequest::new("historian", "when?", 0.2)))
                .unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "historian");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "when?");
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_response_text_joined() {
        let parsed: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "TYPE: "}, {"text": "vase"}]}}]
        }))
        .unwrap();
        assert_eq!(parsed.into_text().unwrap(), "TYPE: vase");
    }

    #[test]
    fn test_response_error_and_empty() {
        let parsed: GeminiResponse = serde_json::from_value(serde_json::json!({
            "error": {"message": "quota exceeded", "code": 429}
        }))
        .unwrap();
        let err = parsed.into_text().unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        let parsed: GeminiResponse =
            serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        assert!(matches!(parsed.into_text(), Err(CapabilityError::Response(_))));
    }

    #[tokio::test]
    #[ignore = "requires GEMINI_API_KEY and network access"]
    async fn test_live_text_generation() {
        let config = crate::config::ProviderConfig::from_env().unwrap();
        let client = GeminiClient::new(config.gemini, 0.1).unwrap();
        let reply = client
            .generate_text(&TextRequest::new("", "Reply with the word ok.", 0.0))
            .await
            .unwrap();
        assert!(!reply.is_empty());
    }
}
