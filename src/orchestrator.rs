//! Request orchestration: enhance, render, save, narrate.
//!
//! `respond` is the synchronous three-step producer behind the chat UI:
//! it appends the user turn plus a status turn, calls the enhancer, swaps
//! the status, calls the generator, and finishes with a success summary or
//! an error message. Each step emits a snapshot before the next blocking
//! call so the shell can repaint mid-request. Nothing in here panics on an
//! external failure; every fault ends as status text in the conversation.

use crate::ai::PromptEnhancer;
use crate::bridge::BlockingBridge;
use crate::image::{generate_blocking, ImageGeneration};
use crate::models::{ChatTurn, StructuredPrompt};
use crate::{Error, Result};
use chrono::Local;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const STATUS_ENHANCING: &str = "Expanding your request into a structured prompt...";
const STATUS_GENERATING: &str = "Generating the illustration...";

/// One emitted snapshot of the conversation: the history so far, the
/// (always cleared) input box, and the rendered image once there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseState {
    pub history: Vec<ChatTurn>,
    pub input: String,
    pub image: Option<Vec<u8>>,
}

impl ResponseState {
    fn new(history: &[ChatTurn], image: Option<Vec<u8>>) -> Self {
        Self {
            history: history.to_vec(),
            input: String::new(),
            image,
        }
    }
}

pub struct Orchestrator {
    enhancer: Option<Arc<dyn PromptEnhancer>>,
    generator: Option<Arc<dyn ImageGeneration>>,
    bridge: BlockingBridge,
    output_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        enhancer: Option<Arc<dyn PromptEnhancer>>,
        generator: Option<Arc<dyn ImageGeneration>>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            enhancer,
            generator,
            bridge: BlockingBridge::new(),
            output_dir: output_dir.into(),
        }
    }

    /// Drive one request. Emits the unchanged state once for blank input;
    /// otherwise emits "enhancing", then "generating", then the final
    /// success-or-error state, in that order.
    pub fn respond(
        &self,
        input: &str,
        mut history: Vec<ChatTurn>,
        emit: &mut dyn FnMut(ResponseState),
    ) {
        if input.trim().is_empty() {
            emit(ResponseState::new(&history, None));
            return;
        }

        history.push(ChatTurn::user(input));
        history.push(ChatTurn::assistant(STATUS_ENHANCING));
        emit(ResponseState::new(&history, None));

        let prompt = match self.enhance(input) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!("Prompt enhancement failed: {}", e);
                Self::replace_status(&mut history, format!("Prompt enhancement failed: {}", e));
                emit(ResponseState::new(&history, None));
                return;
            }
        };

        Self::replace_status(&mut history, STATUS_GENERATING);
        emit(ResponseState::new(&history, None));

        match self.generate(&prompt) {
            Ok(Some(bytes)) => {
                if let Err(e) = image::load_from_memory(&bytes) {
                    error!("Generated payload is not a decodable image: {}", e);
                    Self::replace_status(
                        &mut history,
                        format!("The generated image could not be decoded: {}", e),
                    );
                    emit(ResponseState::new(&history, None));
                    return;
                }

                let saved_path = match self.save_image(&bytes) {
                    Ok(path) => {
                        info!("Saved image to {}", path.display());
                        Some(path)
                    }
                    Err(e) => {
                        // Non-fatal: the summary just loses its save-path line.
                        warn!("Failed to save image: {}", e);
                        None
                    }
                };

                Self::replace_status(
                    &mut history,
                    Self::success_message(&prompt, saved_path.as_deref()),
                );
                emit(ResponseState::new(&history, Some(bytes)));
            }
            Ok(None) => {
                Self::replace_status(
                    &mut history,
                    "The image service returned no image. Check the API credentials and settings.",
                );
                emit(ResponseState::new(&history, None));
            }
            Err(e) => {
                error!("Image generation failed: {}", e);
                Self::replace_status(&mut history, format!("Image generation failed: {}", e));
                emit(ResponseState::new(&history, None));
            }
        }
    }

    fn enhance(&self, input: &str) -> Result<StructuredPrompt> {
        match &self.enhancer {
            Some(enhancer) => {
                let enhancer = Arc::clone(enhancer);
                let text = input.to_string();
                self.bridge
                    .run_blocking(async move { enhancer.enhance(&text).await })
            }
            None => {
                warn!("No enhancer configured; using the raw request as the character prompt");
                Ok(StructuredPrompt::fallback(input))
            }
        }
    }

    fn generate(&self, prompt: &StructuredPrompt) -> Result<Option<Vec<u8>>> {
        match &self.generator {
            Some(generator) => generate_blocking(generator, &self.bridge, prompt),
            None => Err(Error::Config(
                "Image service is not configured".to_string(),
            )),
        }
    }

    /// Write the image under the output directory with a timestamped name,
    /// never overwriting: same-second saves get a numeric suffix.
    fn save_image(&self, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut path = self.output_dir.join(format!("generated_image_{}.png", stamp));
        let mut attempt = 1;
        while path.exists() {
            path = self
                .output_dir
                .join(format!("generated_image_{}_{}.png", stamp, attempt));
            attempt += 1;
        }

        fs::write(&path, bytes)?;
        Ok(path)
    }

    fn success_message(prompt: &StructuredPrompt, saved_path: Option<&Path>) -> String {
        let mut message = String::from("Illustration ready!\n\n");
        let _ = writeln!(message, "Characters: {}\n", prompt.character_count);
        let _ = writeln!(message, "Scene:\n{}\n", prompt.prompt);

        for (index, character) in prompt.character_prompts.iter().enumerate() {
            let placement = match &character.position {
                Some(position) => format!("position: {}", position),
                None => "no position".to_string(),
            };
            let _ = writeln!(
                message,
                "Character {} ({}): {}",
                index + 1,
                placement,
                character.prompt
            );
        }

        if let Some(path) = saved_path {
            let _ = writeln!(message, "\nSaved to: {}", path.display());
        }

        let _ = write!(
            message,
            "\nGenerated at: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        message
    }

    fn replace_status(history: &mut [ChatTurn], content: impl Into<String>) {
        if let Some(last) = history.last_mut() {
            last.content = content.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockEnhancer;
    use crate::image::mock::tiny_png;
    use crate::image::MockImageApi;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn collect_states(
        orchestrator: &Orchestrator,
        input: &str,
        history: Vec<ChatTurn>,
    ) -> Vec<ResponseState> {
        let mut states = Vec::new();
        orchestrator.respond(input, history, &mut |state| states.push(state));
        states
    }

    fn mocked_orchestrator(output_dir: &Path) -> Orchestrator {
        Orchestrator::new(
            Some(Arc::new(MockEnhancer::new())),
            Some(Arc::new(MockImageApi::new())),
            output_dir,
        )
    }

    #[test]
    fn test_blank_input_emits_unchanged_state() {
        let dir = tempdir().unwrap();
        let orchestrator = mocked_orchestrator(dir.path());

        let history = vec![ChatTurn::user("earlier"), ChatTurn::assistant("reply")];
        let states = collect_states(&orchestrator, "   ", history.clone());

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].history, history);
        assert_eq!(states[0].input, "");
        assert!(states[0].image.is_none());
    }

    #[test]
    fn test_successful_run_emits_three_states_in_order() {
        let dir = tempdir().unwrap();
        let png = tiny_png();
        let orchestrator = Orchestrator::new(
            Some(Arc::new(MockEnhancer::new())),
            Some(Arc::new(MockImageApi::new().with_image_response(png.clone()))),
            dir.path(),
        );

        let states = collect_states(&orchestrator, "a cat girl", Vec::new());

        assert_eq!(states.len(), 3);
        assert_eq!(states[0].history.len(), 2);
        assert_eq!(states[0].history[1].content, STATUS_ENHANCING);
        assert_eq!(states[1].history[1].content, STATUS_GENERATING);
        assert!(states[2].history[1].content.contains("Illustration ready!"));
        assert!(states[2].history[1].content.contains("Saved to:"));
        assert_eq!(states[2].image.as_deref(), Some(png.as_slice()));

        // The saved file holds exactly the generated bytes.
        let saved = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect::<Vec<_>>();
        assert_eq!(saved.len(), 1);
        assert_eq!(std::fs::read(&saved[0]).unwrap(), png);
    }

    #[test]
    fn test_empty_generator_result_ends_in_error_state() {
        let dir = tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            Some(Arc::new(MockEnhancer::new())),
            Some(Arc::new(MockImageApi::new().with_empty_response())),
            dir.path(),
        );

        let states = collect_states(&orchestrator, "a cat girl", Vec::new());

        assert_eq!(states.len(), 3);
        assert!(states[2].history[1].content.contains("returned no image"));
        assert!(states[2].image.is_none());
    }

    #[test]
    fn test_generator_error_ends_in_error_state() {
        let dir = tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            Some(Arc::new(MockEnhancer::new())),
            Some(Arc::new(MockImageApi::new().with_error("session expired"))),
            dir.path(),
        );

        let states = collect_states(&orchestrator, "a cat girl", Vec::new());

        assert_eq!(states.len(), 3);
        assert!(states[2].history[1]
            .content
            .contains("Image generation failed"));
    }

    #[test]
    fn test_enhancer_error_short_circuits() {
        let dir = tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            Some(Arc::new(MockEnhancer::new().with_error("quota exceeded"))),
            Some(Arc::new(MockImageApi::new())),
            dir.path(),
        );

        let states = collect_states(&orchestrator, "a cat girl", Vec::new());

        assert_eq!(states.len(), 2);
        assert!(states[1].history[1]
            .content
            .contains("Prompt enhancement failed"));
        assert!(states[1].image.is_none());
    }

    #[test]
    fn test_missing_enhancer_falls_back_to_raw_input() {
        let dir = tempdir().unwrap();
        let orchestrator =
            Orchestrator::new(None, Some(Arc::new(MockImageApi::new())), dir.path());

        let states = collect_states(&orchestrator, "a knight at dawn", Vec::new());

        assert_eq!(states.len(), 3);
        let summary = &states[2].history[1].content;
        assert!(summary.contains("a knight at dawn"));
        assert!(summary.contains("no position"));
    }

    #[test]
    fn test_missing_generator_reports_configuration_error() {
        let dir = tempdir().unwrap();
        let orchestrator = Orchestrator::new(Some(Arc::new(MockEnhancer::new())), None, dir.path());

        let states = collect_states(&orchestrator, "a cat girl", Vec::new());

        assert_eq!(states.len(), 3);
        assert!(states[2].history[1]
            .content
            .contains("Image generation failed"));
        assert!(states[2].history[1].content.contains("not configured"));
    }

    #[test]
    fn test_undecodable_payload_ends_in_error_state() {
        let dir = tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            Some(Arc::new(MockEnhancer::new())),
            Some(Arc::new(
                MockImageApi::new().with_image_response(vec![1, 2, 3]),
            )),
            dir.path(),
        );

        let states = collect_states(&orchestrator, "a cat girl", Vec::new());

        assert_eq!(states.len(), 3);
        assert!(states[2].history[1].content.contains("could not be decoded"));
        // No file left behind for a broken payload.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_image_never_overwrites() {
        let dir = tempdir().unwrap();
        let orchestrator = mocked_orchestrator(dir.path());

        let first = orchestrator.save_image(b"payload-a").unwrap();
        let second = orchestrator.save_image(b"payload-b").unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"payload-a");
        assert_eq!(std::fs::read(&second).unwrap(), b"payload-b");
    }

    #[test]
    fn test_success_message_lists_positions() {
        let prompt: StructuredPrompt = serde_json::from_str(
            r#"{
                "characterCount": 2,
                "prompt": "library, warm_lighting",
                "characterPrompts": [
                    {"prompt": "1girl, blonde_hair", "position": "B2"},
                    {"prompt": "1girl, brown_hair"}
                ]
            }"#,
        )
        .unwrap();

        let message =
            Orchestrator::success_message(&prompt, Some(Path::new("outputs/img.png")));
        assert!(message.contains("Characters: 2"));
        assert!(message.contains("library, warm_lighting"));
        assert!(message.contains("Character 1 (position: B2): 1girl, blonde_hair"));
        assert!(message.contains("Character 2 (no position): 1girl, brown_hair"));
        assert!(message.contains("Saved to: outputs/img.png"));
        assert!(message.contains("Generated at:"));
    }
}
