//! Data models and structures
//!
//! Defines the structured prompt record shared by the enhancer and the
//! image generator, the chat history types, the wire-level API models,
//! and the process-wide configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Scene tags used whenever no real enhancement is available.
pub const DEFAULT_SCENE_TAGS: &str = "masterpiece, best_quality, high_resolution";

pub const MIN_CHARACTER_COUNT: u32 = 1;
pub const MAX_CHARACTER_COUNT: u32 = 6;

/// Coarse 5x5 placement label for a character's head: column `A`-`E`
/// (left to right), row `1`-`5` (top to bottom). `A1` is the top-left
/// corner, `C3` the center, `E5` the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridPosition {
    column: char,
    row: char,
}

impl GridPosition {
    pub fn column(&self) -> char {
        self.column
    }

    pub fn row(&self) -> char {
        self.row
    }
}

impl FromStr for GridPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(column @ 'A'..='E'), Some(row @ '1'..='5'), None) => {
                Ok(Self { column, row })
            }
            _ => Err(Error::Prompt(format!(
                "Invalid grid position '{}'. Expected A1 through E5.",
                s
            ))),
        }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl TryFrom<String> for GridPosition {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<GridPosition> for String {
    fn from(position: GridPosition) -> Self {
        position.to_string()
    }
}

/// Appearance tags for one character, with an optional on-canvas position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterPrompt {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<GridPosition>,
}

/// The structured image-generation prompt produced by the enhancer:
/// scene-level tags plus per-character tag lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredPrompt {
    pub character_count: u32,
    pub prompt: String,
    pub character_prompts: Vec<CharacterPrompt>,
}

impl StructuredPrompt {
    /// Degenerate prompt wrapping raw text as a single positionless
    /// character. Used when the model reply is not valid JSON and when no
    /// enhancer is configured at all.
    pub fn fallback(text: &str) -> Self {
        Self {
            character_count: 1,
            prompt: DEFAULT_SCENE_TAGS.to_string(),
            character_prompts: vec![CharacterPrompt {
                prompt: text.replace('\n', ", "),
                position: None,
            }],
        }
    }

    /// Reconcile `character_count` with the actual number of character
    /// prompts. The schema expects them to agree but the model is not
    /// reliable about it, so mismatches are corrected rather than
    /// rejected.
    pub fn normalize(mut self) -> Self {
        let actual = self.character_prompts.len() as u32;
        if actual > 0 && self.character_count != actual {
            tracing::warn!(
                "characterCount {} disagrees with {} character prompt(s); using the actual count",
                self.character_count,
                actual
            );
            self.character_count = actual;
        }
        self.character_count = self
            .character_count
            .clamp(MIN_CHARACTER_COUNT, MAX_CHARACTER_COUNT);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation; the history is an append-only sequence
/// discarded when the user clears the chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// Chat completion API request/response models
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_completion_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

// Image generation API request/response models
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationRequest {
    pub input: String,
    pub model: String,
    pub parameters: RenderParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderParameters {
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub scale: f64,
    pub seed: u64,
    pub n_samples: u32,
    pub negative_prompt: String,
    pub character_prompts: Vec<CharacterPrompt>,
}

#[derive(Debug, Deserialize)]
pub struct ImageGenerationResponse {
    pub images: Vec<ImagePayload>,
}

#[derive(Debug, Deserialize)]
pub struct ImagePayload {
    pub seed: Option<u64>,
    pub image: String, // base64-encoded PNG
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub chat_api_key: Option<String>,
    pub chat_model: String,
    pub chat_base_url: String,
    pub image_username: Option<String>,
    pub image_password: Option<String>,
    pub image_base_url: String,
    pub output_dir: PathBuf,
}

impl Config {
    /// Read configuration from the environment (and `.env` when present)
    /// exactly once at startup. Credentials are optional: a missing key
    /// leaves the matching component unconstructed instead of aborting.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            chat_api_key: std::env::var("OPENAI_API_KEY").ok(),
            chat_model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-5".to_string()),
            chat_base_url: std::env::var("CHAT_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            image_username: std::env::var("IMAGE_API_USERNAME").ok(),
            image_password: std::env::var("IMAGE_API_PASSWORD").ok(),
            image_base_url: std::env::var("IMAGE_API_BASE_URL")
                .unwrap_or_else(|_| "https://image.example-api.net".to_string()),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("outputs")),
        }
    }

    pub fn has_chat_credentials(&self) -> bool {
        self.chat_api_key.is_some()
    }

    pub fn has_image_credentials(&self) -> bool {
        self.image_username.is_some() && self.image_password.is_some()
    }
}
