use super::PromptEnhancer;
use crate::models::StructuredPrompt;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted enhancer for tests: queued replies cycle, errors are queued as
/// messages, and calls are counted.
#[derive(Clone)]
pub struct MockEnhancer {
    responses: Arc<Mutex<Vec<std::result::Result<StructuredPrompt, String>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockEnhancer {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: StructuredPrompt) -> Self {
        self.responses.lock().unwrap().push(Ok(response));
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

impl Default for MockEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PromptEnhancer for MockEnhancer {
    async fn enhance(&self, user_text: &str) -> Result<StructuredPrompt> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Default mock response: wrap the input like the real fallback.
            return Ok(StructuredPrompt::fallback(user_text));
        }

        let index = (*count - 1) % responses.len();
        match &responses[index] {
            Ok(prompt) => Ok(prompt.clone()),
            Err(message) => Err(Error::ChatApi(message.clone())),
        }
    }
}
