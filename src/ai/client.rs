use super::PromptEnhancer;
use crate::models::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, StructuredPrompt,
};
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct ChatEnhancer {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ChatEnhancer {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model,
            base_url,
        }
    }

    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        tracing::debug!("Sending chat completion request");

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send chat completion request: {}", e);
                Error::ChatApi(format!("Request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Chat API error (status {}): {}", status, error_text);
            return Err(Error::ChatApi(format!(
                "API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ChatApi(format!("Failed to read response body: {}", e)))?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse chat completion response: {}\nBody: {}", e, body);
            Error::ChatApi(format!("Malformed response: {}", e))
        })
    }
}

/// Strip a Markdown code fence (```json ... ``` or ``` ... ```) from a
/// model reply. Models wrap JSON in fences often enough, even when the
/// instructions forbid it.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence line.
    match body.split_once('\n') {
        Some((_, content)) => content.trim(),
        None => body.trim(),
    }
}

#[async_trait]
impl PromptEnhancer for ChatEnhancer {
    async fn enhance(&self, user_text: &str) -> Result<StructuredPrompt> {
        let system_message = ChatMessage {
            role: "system".to_string(),
            content: Some(prompts::ENHANCE_SYSTEM.to_string()),
        };

        let user_message = ChatMessage {
            role: "user".to_string(),
            content: Some(prompts::render(
                prompts::ENHANCE_USER,
                &[("request", user_text)],
            )),
        };

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![system_message, user_message],
            max_completion_tokens: 3000,
        };

        let response = self.chat_completion(request).await?;

        let reply = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| Error::ChatApi("No reply from chat API".to_string()))?;

        match serde_json::from_str::<StructuredPrompt>(strip_code_fence(&reply)) {
            Ok(prompt) => Ok(prompt.normalize()),
            Err(e) => {
                tracing::warn!("Reply is not structured-prompt JSON ({}); wrapping raw text", e);
                Ok(StructuredPrompt::fallback(&reply))
            }
        }
    }
}
