//! Chat-driven illustration generator
//!
//! A user types a natural-language request, a chat-completion call expands
//! it into a structured image-generation prompt, and an external image
//! service renders the picture, which is shown in the conversation and
//! saved locally.

pub mod ai;
pub mod bridge;
pub mod error;
pub mod image;
pub mod models;
pub mod orchestrator;
pub mod prompts;

pub use error::{Error, Result};
