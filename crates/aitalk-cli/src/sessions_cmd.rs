//! `aitalk sessions` / `aitalk show` — browse saved conversations.

use anyhow::{Context, Result};
use colored::Colorize;

use aitalk_chat::controller::render_history;
use aitalk_chat::TranscriptEntry;
use aitalk_core::session::SessionStore;

/// List session files in the store directory.
pub fn list(store: &SessionStore) -> Result<()> {
    let files = store.list().context("failed to list sessions")?;

    println!();
    println!("{} {}", "Sessions in".bold(), store.dir().display());
    if files.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for file in &files {
        println!("  {file}");
    }
    println!();
    Ok(())
}

/// Print a saved conversation through the transcript filter.
pub fn show(store: &SessionStore, filename: &str) -> Result<()> {
    let (header, entries) = render_file(store, filename)?;
    println!();
    println!("{}", header.bold());
    println!();
    for entry in &entries {
        crate::helpers::print_entry(entry);
    }
    Ok(())
}

fn render_file(store: &SessionStore, filename: &str) -> Result<(String, Vec<TranscriptEntry>)> {
    let session = store
        .load(filename)
        .with_context(|| format!("failed to load {filename}"))?;
    let header = format!(
        "{filename} — model {}, {} messages",
        session.model,
        session.messages.len()
    );
    Ok((header, render_history(&session.messages)))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
