//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! Call failures stay tagged by kind so the orchestrator can tell a
//! configuration problem from a transient API failure when it writes the
//! user-facing status message.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Chat API error: {0}")]
    ChatApi(String),

    #[error("Image API error: {0}")]
    ImageApi(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid prompt: {0}")]
    Prompt(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
