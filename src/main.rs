use anyhow::Result;
use clap::Parser;
use illustchat::ai::{ChatEnhancer, PromptEnhancer};
use illustchat::image::{ImageApiClient, ImageGeneration};
use illustchat::models::{ChatTurn, Config, Role};
use illustchat::orchestrator::Orchestrator;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXAMPLE_REQUESTS: &[&str] = &[
    "a cat girl smiling in a flower field",
    "a blonde, blue-eyed mage reading a book",
    "a high-school girl studying in a classroom",
    "a girl in a kimono walking through a bamboo grove",
];

#[derive(Debug, Parser)]
#[command(name = "illustchat")]
#[command(about = "Chat-driven illustration generator")]
struct CliArgs {
    /// Directory where generated images are written.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Pin the render seed instead of randomizing per request.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

fn build_enhancer(config: &Config) -> Option<Arc<dyn PromptEnhancer>> {
    match &config.chat_api_key {
        Some(api_key) => {
            info!("Prompt enhancer ready (model: {})", config.chat_model);
            Some(Arc::new(ChatEnhancer::new(
                api_key.clone(),
                config.chat_model.clone(),
                config.chat_base_url.clone(),
            )))
        }
        None => {
            warn!("OPENAI_API_KEY not set; requests will skip enhancement");
            None
        }
    }
}

fn build_generator(config: &Config, seed: Option<u64>) -> Option<Arc<dyn ImageGeneration>> {
    match (&config.image_username, &config.image_password) {
        (Some(username), Some(password)) => {
            info!("Image generator ready ({})", config.image_base_url);
            let mut client = ImageApiClient::new(
                username.clone(),
                password.clone(),
                config.image_base_url.clone(),
            );
            if let Some(seed) = seed {
                client = client.with_seed(seed);
            }
            Some(Arc::new(client))
        }
        _ => {
            warn!("IMAGE_API_USERNAME / IMAGE_API_PASSWORD not set; rendering unavailable");
            None
        }
    }
}

fn print_turn(turn: &ChatTurn) {
    let speaker = match turn.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("[{}] {}\n", speaker, turn.content);
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "illustchat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env();

    let enhancer = build_enhancer(&config);
    let generator = build_generator(&config, args.seed);
    let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir.clone());
    let orchestrator = Orchestrator::new(enhancer, generator, output_dir);

    println!("Describe the illustration you want. Examples:");
    for example in EXAMPLE_REQUESTS {
        println!("  - {}", example);
    }
    println!("Commands: 'clear' resets the chat, 'quit' exits.\n");

    let stdin = io::stdin();
    let mut history: Vec<ChatTurn> = Vec::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();

        match input {
            "quit" | "exit" => break,
            "clear" => {
                history.clear();
                println!("Chat cleared.\n");
                continue;
            }
            _ => {}
        }

        let mut latest_history = history.clone();
        orchestrator.respond(input, history.clone(), &mut |state| {
            if let Some(turn) = state.history.last() {
                if turn.role == Role::Assistant {
                    print_turn(turn);
                }
            }
            latest_history = state.history;
        });
        history = latest_history;
    }

    println!("Bye.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn test_cli_args_parse_seed_and_output_dir() {
        let args =
            CliArgs::parse_from(["illustchat", "--seed", "7", "--output-dir", "/tmp/out"]);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.output_dir.as_deref().unwrap().to_str(), Some("/tmp/out"));
    }

    #[test]
    fn test_cli_args_defaults() {
        let args = CliArgs::parse_from(["illustchat"]);
        assert!(args.seed.is_none());
        assert!(args.output_dir.is_none());
    }
}
