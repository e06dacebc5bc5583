use super::ImageGeneration;
use crate::models::StructuredPrompt;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted image service for tests. Queued responses cycle; with no
/// queue it answers with a tiny valid PNG.
#[derive(Clone)]
pub struct MockImageApi {
    responses: Arc<Mutex<Vec<std::result::Result<Option<Vec<u8>>, String>>>>,
    call_count: Arc<Mutex<usize>>,
}

/// 1x1 PNG, the smallest payload that still decodes.
pub fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49,
        0x44, 0x41, // IDAT chunk
        0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00, 0x9C,
        0xE3, 0xBF, 0x59, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
        0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

impl MockImageApi {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_image_response(self, bytes: Vec<u8>) -> Self {
        self.responses.lock().unwrap().push(Ok(Some(bytes)));
        self
    }

    pub fn with_empty_response(self) -> Self {
        self.responses.lock().unwrap().push(Ok(None));
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(Err(message.into()));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockImageApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGeneration for MockImageApi {
    async fn generate(&self, _prompt: &StructuredPrompt) -> Result<Option<Vec<u8>>> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(Some(tiny_png()));
        }

        let index = (*count - 1) % responses.len();
        match &responses[index] {
            Ok(bytes) => Ok(bytes.clone()),
            Err(message) => Err(Error::ImageApi(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_default_is_decodable_png() {
        let api = MockImageApi::new();
        let bytes = api
            .generate(&StructuredPrompt::fallback("1girl"))
            .await
            .unwrap()
            .unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
        assert_eq!(api.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_empty_response_yields_none() {
        let api = MockImageApi::new().with_empty_response();
        let result = api
            .generate(&StructuredPrompt::fallback("1girl"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mock_queued_error() {
        let api = MockImageApi::new().with_error("session expired");
        let err = api
            .generate(&StructuredPrompt::fallback("1girl"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ImageApi(_)));
    }
}
