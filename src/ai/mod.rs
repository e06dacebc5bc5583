//! Prompt enhancement via a chat-completion endpoint
//!
//! Turns free-form user text into a [`StructuredPrompt`] by asking a
//! language model to emit the structured JSON shape. A reply that fails to
//! parse degrades to a fallback prompt wrapping the raw text; transport and
//! auth failures stay tagged errors for the caller to present.

pub mod client;
pub mod mock;

pub use client::ChatEnhancer;
pub use mock::MockEnhancer;

use crate::models::StructuredPrompt;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    async fn enhance(&self, user_text: &str) -> Result<StructuredPrompt>;
}
