//! Shared CLI helpers — transcript printing, banner, thinking indicator.

use std::fmt::Display;

use colored::Colorize;

use aitalk_chat::{EntryKind, TranscriptEntry};

/// Print one transcript entry to stdout.
pub fn print_entry(entry: &TranscriptEntry) {
    match entry.kind {
        EntryKind::User => println!("{} {}", "You:".green().bold(), entry.text),
        EntryKind::Assistant => {
            println!();
            println!("{} {}", "AI:".cyan().bold(), entry.text);
            println!();
        }
        EntryKind::Notice => println!("{}", format!("[{}]", entry.text).dimmed()),
    }
}

/// Print a reply that had nothing to display.
pub fn print_empty_reply() {
    println!();
    println!("{}", "(no response)".dimmed());
    println!();
}

pub fn print_error(err: &dyn Display) {
    eprintln!("\n{} {err}\n", "Error:".red().bold());
}

/// Print the banner shown at REPL start.
pub fn print_banner(model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "AiTalk".cyan().bold(), version.dimmed());
    println!("{} {}", "model:".dimmed(), model);
    println!(
        "{}",
        "Type a message, /help for commands, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Warn that session files and config carry the API key in plaintext.
pub fn print_credential_warning() {
    println!(
        "  {} {}",
        "!".yellow().bold(),
        "the API key is stored in plaintext in this file".yellow()
    );
}

/// Print a model list, marking the active one.
pub fn print_models(models: &[String], current: &str) {
    if models.is_empty() {
        println!("{}", "(no models reported)".dimmed());
        return;
    }
    for model in models {
        println!("{}", model_line(model, current));
    }
}

fn model_line(model: &str, current: &str) -> String {
    if model == current {
        format!("* {model}")
    } else {
        format!("  {model}")
    }
}

/// Print a "thinking" placeholder while a request is outstanding.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
