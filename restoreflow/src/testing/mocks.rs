//! Scripted capability doubles.
//!
//! Each double answers from a queue of scripted replies and falls back to a
//! default reply once the queue is empty. Calls and prompts are recorded.

use crate::capabilities::{
    CapabilityError, ImageCapability, ImageInput, TextCapability, TextRequest, VisionCapability,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;

#[derive(Debug, Clone)]
enum Reply<T> {
    Ok(T),
    Fail(String),
    Unavailable(String),
}

impl<T: Clone> Reply<T> {
    fn into_result(self) -> Result<T, CapabilityError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Fail(message) => Err(CapabilityError::Response(message)),
            Self::Unavailable(message) => Err(CapabilityError::Unavailable(message)),
        }
    }
}

#[derive(Debug)]
struct Script<T> {
    queue: Mutex<VecDeque<Reply<T>>>,
    default: Reply<T>,
}

impl<T: Clone> Script<T> {
    fn new(default: Reply<T>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default,
        }
    }

    fn push(&self, reply: Reply<T>) {
        self.queue.lock().push_back(reply);
    }

    fn next(&self) -> Result<T, CapabilityError> {
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
            .into_result()
    }
}

/// Vision double.
#[derive(Debug)]
pub struct ScriptedVision {
    script: Script<String>,
    prompts: Mutex<Vec<String>>,
    images: Mutex<Vec<PathBuf>>,
}

impl ScriptedVision {
    /// Always identifies the image as `text`.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_default(Reply::Ok(text.into()))
    }

    /// Always fails with a provider error carrying `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_default(Reply::Fail(message.into()))
    }

    fn with_default(default: Reply<String>) -> Self {
        Self {
            script: Script::new(default),
            prompts: Mutex::new(Vec::new()),
            images: Mutex::new(Vec::new()),
        }
    }

    /// Queues a one-off reply ahead of the default.
    #[must_use]
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.script.push(Reply::Ok(text.into()));
        self
    }

    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Prompts received, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Paths of the images received, in call order.
    #[must_use]
    pub fn images(&self) -> Vec<PathBuf> {
        self.images.lock().clone()
    }
}

#[async_trait]
impl VisionCapability for ScriptedVision {
    async fn identify(&self, image: &ImageInput, prompt: &str) -> Result<String, CapabilityError> {
        self.prompts.lock().push(prompt.to_string());
        self.images.lock().push(image.path.clone());
        self.script.next()
    }
}

/// Text-generation double.
#[derive(Debug)]
pub struct ScriptedText {
    script: Script<String>,
    requests: Mutex<Vec<TextRequest>>,
}

impl ScriptedText {
    /// Always answers `text`.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_default(Reply::Ok(text.into()))
    }

    /// Always fails with a provider error carrying `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_default(Reply::Fail(message.into()))
    }

    fn with_default(default: Reply<String>) -> Self {
        Self {
            script: Script::new(default),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a one-off answer ahead of the default.
    #[must_use]
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.script.push(Reply::Ok(text.into()));
        self
    }

    /// Queues a one-off provider error ahead of the default.
    #[must_use]
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script.push(Reply::Fail(message.into()));
        self
    }

    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Requests received, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextCapability for ScriptedText {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, CapabilityError> {
        self.requests.lock().push(request.clone());
        self.script.next()
    }
}

/// Image-generation double.
#[derive(Debug)]
pub struct ScriptedImage {
    script: Script<Vec<u8>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedImage {
    /// Always returns `bytes`.
    #[must_use]
    pub fn replying(bytes: Vec<u8>) -> Self {
        Self::with_default(Reply::Ok(bytes))
    }

    /// Always fails with a provider error carrying `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_default(Reply::Fail(message.into()))
    }

    /// Always reports the capability as unavailable.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_default(Reply::Unavailable(message.into()))
    }

    fn with_default(default: Reply<Vec<u8>>) -> Self {
        Self {
            script: Script::new(default),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Prompts received, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ImageCapability for ScriptedImage {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, CapabilityError> {
        self.prompts.lock().push(prompt.to_string());
        self.script.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_default() {
        let text = ScriptedText::replying("default")
            .then_reply("first")
            .then_fail("second fails");
        let request = TextRequest::new("", "q", 0.0);

        assert_eq!(text.generate_text(&request).await.unwrap(), "first");
        assert!(text.generate_text(&request).await.is_err());
        assert_eq!(text.generate_text(&request).await.unwrap(), "default");
        assert_eq!(text.calls(), 3);
    }

    #[tokio::test]
    async fn test_vision_records_inputs() {
        let vision = ScriptedVision::replying("TYPE: vase");
        let image = ImageInput::from_bytes("vase.jpg", vec![1]);

        vision.identify(&image, "look").await.unwrap();

        assert_eq!(vision.prompts(), vec!["look".to_string()]);
        assert_eq!(vision.images(), vec![PathBuf::from("vase.jpg")]);
    }

    #[tokio::test]
    async fn test_image_unavailable() {
        let image = ScriptedImage::unavailable("no key");
        let err = image.generate_image("p").await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(image.calls(), 1);
    }
}
