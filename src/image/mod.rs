//! Image generation via the remote render API
//!
//! Sends a [`StructuredPrompt`] to the image service: login, fixed render
//! parameters, per-character sub-prompts with optional grid positions, and
//! the first returned payload as raw PNG bytes. `Ok(None)` means the
//! service answered but yielded no image.

pub mod client;
pub mod mock;

pub use client::ImageApiClient;
pub use mock::MockImageApi;

use crate::bridge::BlockingBridge;
use crate::models::StructuredPrompt;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ImageGeneration: Send + Sync {
    async fn generate(&self, prompt: &StructuredPrompt) -> Result<Option<Vec<u8>>>;
}

/// Synchronous facade over [`ImageGeneration::generate`] for callers that
/// live outside any async context (the UI callback path).
pub fn generate_blocking(
    service: &Arc<dyn ImageGeneration>,
    bridge: &BlockingBridge,
    prompt: &StructuredPrompt,
) -> Result<Option<Vec<u8>>> {
    let service = Arc::clone(service);
    let prompt = prompt.clone();
    bridge.run_blocking(async move { service.generate(&prompt).await })
}
