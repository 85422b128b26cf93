//! `aitalk onboard` — initialize configuration and data directories.
//!
//! - Creates `~/.aitalk/config.json` with defaults
//! - Creates the sessions and history directories

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use aitalk_core::config::{get_config_path, load_config, save_config};
use aitalk_core::utils::get_data_path;

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "AiTalk — Setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    if write_default_config(&config_path)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
        crate::helpers::print_credential_warning();
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    // AITALK_SESSIONS__DIR may move the sessions dir.
    let config = load_config(Some(&config_path));
    ensure_dir(&config.sessions.resolved_dir(), "sessions")?;
    ensure_dir(&get_data_path().join("history"), "history")?;

    println!();
    println!(
        "{}",
        "  Setup complete! Set apiKey in the config, then run `aitalk chat`.".green()
    );
    println!();

    Ok(())
}

/// Write a default config unless one exists. Returns whether a file was written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let config = aitalk_core::config::Config::default();
    save_config(&config, Some(path))
        .with_context(|| format!("failed to write config: {}", path.display()))?;
    Ok(true)
}

fn ensure_dir(path: &Path, label: &str) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create {label} dir: {}", path.display()))?;
    println!("  {} {label} dir at {}", "✓".green(), path.display());
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert!(write_default_config(&path).unwrap());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"apiKey\""));
        assert!(written.contains("\"visionModels\""));

        std::fs::write(&path, "{\"api\":{\"model\":\"mine\"}}").unwrap();
        assert!(!write_default_config(&path).unwrap());
        // existing config is not overwritten
        assert!(std::fs::read_to_string(&path).unwrap().contains("mine"));
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested, "test").unwrap();
        assert!(nested.is_dir());
        // idempotent
        ensure_dir(&nested, "test").unwrap();
    }
}
