use super::ImageGeneration;
use crate::models::{
    ImageGenerationRequest, ImageGenerationResponse, LoginRequest, LoginResponse,
    RenderParameters, StructuredPrompt,
};
use crate::{Error, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;

const RENDER_MODEL: &str = "anime-v45-curated";
const RENDER_WIDTH: u32 = 832;
const RENDER_HEIGHT: u32 = 1216;
const RENDER_STEPS: u32 = 28;
const RENDER_SCALE: f64 = 5.0;

/// Standing blocklist of tags the model should never render.
const NEGATIVE_BLOCKLIST: &str = "lowres, bad anatomy, bad hands, text, error, \
missing fingers, extra digit, fewer digits, cropped, worst quality, low quality, \
normal quality, jpeg artifacts, signature, watermark, username, blurry";

pub struct ImageApiClient {
    client: Client,
    username: String,
    password: String,
    base_url: String,
    extra_negative: Option<String>,
    pinned_seed: Option<u64>,
}

impl ImageApiClient {
    pub fn new(username: String, password: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            username,
            password,
            base_url,
            extra_negative: None,
            pinned_seed: None,
        }
    }

    /// Append caller-supplied negative tags to the standing blocklist.
    pub fn with_negative_terms(mut self, terms: impl Into<String>) -> Self {
        self.extra_negative = Some(terms.into());
        self
    }

    /// Use a fixed seed for every render instead of a random one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.pinned_seed = Some(seed);
        self
    }

    fn negative_prompt(&self) -> String {
        match &self.extra_negative {
            Some(terms) if !terms.trim().is_empty() => {
                format!("{}, {}", NEGATIVE_BLOCKLIST, terms)
            }
            _ => NEGATIVE_BLOCKLIST.to_string(),
        }
    }

    fn seed(&self) -> u64 {
        self.pinned_seed
            .unwrap_or_else(|| rand::thread_rng().gen::<u32>() as u64)
    }

    async fn login(&self) -> Result<String> {
        tracing::debug!("Logging in to image API");

        let url = format!("{}/user/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: self.username.clone(),
                password: self.password.clone(),
            })
            .send()
            .await
            .map_err(|e| Error::ImageApi(format!("Login request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Image API login failed (status {}): {}", status, error_text);
            return Err(Error::ImageApi(format!(
                "Login failed (status {}): {}",
                status, error_text
            )));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| Error::ImageApi(format!("Malformed login response: {}", e)))?;
        Ok(login.access_token)
    }

    fn build_request(&self, prompt: &StructuredPrompt) -> ImageGenerationRequest {
        for (index, character) in prompt.character_prompts.iter().enumerate() {
            match &character.position {
                Some(position) => tracing::info!(
                    "Character {}: {} (position {})",
                    index + 1,
                    character.prompt,
                    position
                ),
                None => tracing::info!(
                    "Character {}: {} (no position)",
                    index + 1,
                    character.prompt
                ),
            }
        }

        ImageGenerationRequest {
            input: prompt.prompt.clone(),
            model: RENDER_MODEL.to_string(),
            parameters: RenderParameters {
                width: RENDER_WIDTH,
                height: RENDER_HEIGHT,
                steps: RENDER_STEPS,
                scale: RENDER_SCALE,
                seed: self.seed(),
                n_samples: 1,
                negative_prompt: self.negative_prompt(),
                character_prompts: prompt.character_prompts.clone(),
            },
        }
    }
}

#[async_trait]
impl ImageGeneration for ImageApiClient {
    async fn generate(&self, prompt: &StructuredPrompt) -> Result<Option<Vec<u8>>> {
        let token = self.login().await?;

        tracing::info!(
            "Rendering {}x{} with {} character prompt(s)",
            RENDER_WIDTH,
            RENDER_HEIGHT,
            prompt.character_prompts.len()
        );

        let request = self.build_request(prompt);
        let url = format!("{}/ai/generate-image", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ImageApi(format!("Render request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Image API error (status {}): {}", status, error_text);
            return Err(Error::ImageApi(format!(
                "Render failed (status {}): {}",
                status, error_text
            )));
        }

        let body: ImageGenerationResponse = response
            .json()
            .await
            .map_err(|e| Error::ImageApi(format!("Malformed render response: {}", e)))?;

        // The service yields a sequence of payloads; we only ever ask for
        // one sample and take the first.
        let Some(payload) = body.images.into_iter().next() else {
            tracing::warn!("Image API returned no image payloads");
            return Ok(None);
        };

        if let Some(seed) = payload.seed {
            tracing::debug!("Render used seed {}", seed);
        }

        use base64::Engine as _;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.image)
            .map_err(|e| Error::ImageApi(format!("Failed to decode image payload: {}", e)))?;

        Ok(Some(bytes))
    }
}
