//! AiTalk CLI — entry point.
//!
//! # Commands
//!
//! - `aitalk chat [--endpoint URL] [--api-key KEY] [--model NAME] [--load FILE]` — interactive chat
//! - `aitalk sessions` — list saved conversations
//! - `aitalk show FILE` — print a saved conversation
//! - `aitalk models` — list models served by the configured endpoint
//! - `aitalk onboard` — write default config and create data directories
//! - `aitalk status` — show configuration

mod helpers;
mod onboard;
mod repl;
mod sessions_cmd;
mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use aitalk_chat::ChatController;
use aitalk_core::config::{load_config, ApiConfig, Config};
use aitalk_core::session::SessionStore;
use aitalk_core::types::Session;
use aitalk_providers::{ChatProvider, ChatSettings, HttpProvider};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// AiTalk — chat with any OpenAI-compatible endpoint from the terminal
#[derive(Parser)]
#[command(name = "aitalk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Saved conversation to continue
        #[arg(short, long)]
        load: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// List saved conversations
    Sessions,

    /// Print a saved conversation
    Show {
        /// Session file name (or path)
        file: String,
    },

    /// List models available at the endpoint
    Models {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Initialize configuration and data directories
    Onboard,

    /// Show configuration status
    Status,
}

/// Per-run overrides of the configured connection.
#[derive(clap::Args, Debug, Default)]
struct ConnectionArgs {
    /// Chat completions URL
    #[arg(long)]
    endpoint: Option<String>,

    /// API key
    #[arg(long)]
    api_key: Option<String>,

    /// Model identifier
    #[arg(short, long)]
    model: Option<String>,
}

impl ConnectionArgs {
    fn apply(&self, api: &mut ApiConfig) {
        if let Some(endpoint) = &self.endpoint {
            api.endpoint = endpoint.clone();
        }
        if let Some(key) = &self.api_key {
            api.api_key = key.clone();
        }
        if let Some(model) = &self.model {
            api.model = model.clone();
        }
    }
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            connection,
            load,
            logs,
        } => {
            init_logging(logs);
            run_chat(&connection, load).await
        }
        Commands::Sessions => {
            init_logging(false);
            sessions_cmd::list(&open_store(&load_config(None))?)
        }
        Commands::Show { file } => {
            init_logging(false);
            sessions_cmd::show(&open_store(&load_config(None))?, &file)
        }
        Commands::Models { connection, logs } => {
            init_logging(logs);
            run_models(&connection).await
        }
        Commands::Onboard => onboard::run(),
        Commands::Status => status::run(),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(connection: &ConnectionArgs, load: Option<String>) -> Result<()> {
    let mut config = load_config(None);
    connection.apply(&mut config.api);

    if !config.api.is_configured() {
        eprintln!(
            "{}",
            "No API key configured. Pass --api-key or set apiKey in ~/.aitalk/config.json."
                .yellow()
        );
    }

    let mut controller = build_controller(&config)?;
    info!(endpoint = %config.api.endpoint, model = %config.api.model, "starting chat");

    if let Some(file) = load {
        let entries = controller
            .load(&file)
            .with_context(|| format!("failed to load conversation {file}"))?;
        for entry in &entries {
            helpers::print_entry(entry);
        }
    }

    repl::run(controller).await
}

/// Build a `ChatController` from the loaded configuration.
pub fn build_controller(config: &Config) -> Result<ChatController> {
    let provider = HttpProvider::with_timeout_secs(config.api.timeout_secs)
        .context("failed to create HTTP client")?;
    let store = open_store(config)?;
    let session = Session::new(&config.api.endpoint, &config.api.api_key, &config.api.model);

    Ok(ChatController::new(
        session,
        Arc::new(provider),
        store,
        config.api.persona().map(str::to_string),
        config.vision_models.clone(),
    ))
}

fn open_store(config: &Config) -> Result<SessionStore> {
    let dir = config.sessions.resolved_dir();
    SessionStore::new(Some(dir.clone()))
        .with_context(|| format!("failed to open session directory: {}", dir.display()))
}

// ─────────────────────────────────────────────
// Models command
// ─────────────────────────────────────────────

async fn run_models(connection: &ConnectionArgs) -> Result<()> {
    let mut config = load_config(None);
    connection.apply(&mut config.api);

    let provider = HttpProvider::with_timeout_secs(config.api.timeout_secs)
        .context("failed to create HTTP client")?;
    let session = Session::new(&config.api.endpoint, &config.api.api_key, &config.api.model);
    let settings = ChatSettings::from_session(&session, None);

    let models = provider
        .list_models(&settings)
        .await
        .with_context(|| format!("failed to list models at {}", config.api.endpoint))?;
    helpers::print_models(&models, &config.api.model);
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("aitalk=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_chat_with_overrides() {
        let cli = Cli::try_parse_from([
            "aitalk",
            "chat",
            "--endpoint",
            "http://localhost:8080/v1/chat/completions",
            "--model",
            "llama3",
            "--load",
            "old.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat {
                connection, load, logs,
            } => {
                assert_eq!(connection.model.as_deref(), Some("llama3"));
                assert!(connection.api_key.is_none());
                assert_eq!(load.as_deref(), Some("old.json"));
                assert!(!logs);
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn parse_show_requires_file() {
        assert!(Cli::try_parse_from(["aitalk", "show"]).is_err());
        assert!(Cli::try_parse_from(["aitalk", "show", "a.json"]).is_ok());
    }

    #[test]
    fn connection_args_override_only_given_fields() {
        let mut api = ApiConfig::default();
        let args = ConnectionArgs {
            api_key: Some("sk-cli".into()),
            ..Default::default()
        };
        args.apply(&mut api);
        assert_eq!(api.api_key, "sk-cli");
        assert_eq!(api.model, "gpt-4o");
        assert_eq!(api.endpoint, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn build_controller_uses_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.sessions.dir = dir.path().join("sessions").to_string_lossy().into_owned();
        config.api.api_key = "sk-test".into();

        let controller = build_controller(&config).unwrap();
        let settings = controller.settings();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.credential, "sk-test");
        assert!(settings.system_prompt.is_none());
        assert!(dir.path().join("sessions").is_dir());
    }
}
