//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Lines starting with a known `/command` are commands; anything else, including
//! unrecognised slash input such as a path, is sent as a message.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use aitalk_chat::{ChatController, TranscriptEntry};
use aitalk_core::utils::expand_home;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

const HELP: &str = "\
/new             start a new conversation
/save [NAME]     save the conversation and start a new one
/load FILE       load a saved conversation
/sessions        list saved conversations
/image PATH      attach an image to the next message
/models          list models at the endpoint
/model NAME      switch model
/help            show this help
exit, quit, :q   leave";

/// A parsed input line.
#[derive(Debug, PartialEq)]
enum Command {
    Exit,
    Help,
    New,
    Save(String),
    Load(String),
    Sessions,
    Image(PathBuf),
    Models,
    Model(String),
    Message(String),
    Usage(&'static str),
}

fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if is_exit_command(input) {
        return Command::Exit;
    }
    let Some(rest) = input.strip_prefix('/') else {
        return Command::Message(input.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name.to_lowercase().as_str(), arg) {
        ("help", _) => Command::Help,
        ("new", _) => Command::New,
        ("save", name) => Command::Save(name.to_string()),
        ("load", "") => Command::Usage("/load FILE"),
        ("load", file) => Command::Load(file.to_string()),
        ("sessions", _) => Command::Sessions,
        ("image", "") => Command::Usage("/image PATH"),
        ("image", path) => Command::Image(expand_home(path)),
        ("models", _) => Command::Models,
        ("model", "") => Command::Usage("/model NAME"),
        ("model", model) => Command::Model(model.to_string()),
        _ => Command::Message(input.to_string()),
    }
}

/// Run the interactive REPL loop.
pub async fn run(mut controller: ChatController) -> Result<()> {
    helpers::print_banner(&controller.conversation().session().model);

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&input);

        match parse_command(trimmed) {
            Command::Exit => {
                println!("\nGoodbye!");
                break;
            }
            Command::Help => println!("{}", HELP.dimmed()),
            Command::Usage(usage) => println!("{} {usage}", "usage:".yellow()),
            Command::Message(text) => send(&mut controller, &text).await,
            command => handle(&mut controller, command).await,
        }
    }

    save_history(&mut editor);

    Ok(())
}

async fn send(controller: &mut ChatController, text: &str) {
    match controller.send(text) {
        Ok(Some(echo)) => {
            // the prompt line already shows plain text
            if echo.text != text {
                helpers::print_entry(&echo);
            }
        }
        Ok(None) => return,
        Err(e) => {
            helpers::print_error(&e);
            return;
        }
    }

    debug!(input = text, "waiting for reply");
    helpers::print_thinking();
    let reply = controller.wait_reply().await;
    helpers::clear_thinking();

    match reply {
        Some(entry) => helpers::print_entry(&entry),
        None => helpers::print_empty_reply(),
    }
}

async fn handle(controller: &mut ChatController, command: Command) {
    let result = match command {
        Command::New => controller.new_session().map(|e| vec![e]),
        Command::Save(name) => controller.save(&name).map(|file| {
            helpers::print_credential_warning();
            vec![
                TranscriptEntry::notice(format!("saved to {file}")),
                TranscriptEntry::notice("new conversation started"),
            ]
        }),
        Command::Load(file) => controller.load(&file),
        Command::Sessions => controller.list_sessions().map(|files| {
            if files.is_empty() {
                vec![TranscriptEntry::notice("no saved conversations")]
            } else {
                files.into_iter().map(TranscriptEntry::notice).collect()
            }
        }),
        Command::Image(path) => controller.attach_image(&path).map(|e| vec![e]),
        Command::Models => match controller.list_models().await {
            Ok(models) => {
                helpers::print_models(&models, &controller.conversation().session().model);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        },
        Command::Model(model) => controller.set_model(&model).map(|e| vec![e]),
        other => {
            debug!(?other, "command handled by the loop");
            Ok(Vec::new())
        }
    };

    match result {
        Ok(entries) => entries.iter().for_each(helpers::print_entry),
        Err(e) => helpers::print_error(&e),
    }
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> PathBuf {
    aitalk_core::utils::get_data_path().join("history").join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
