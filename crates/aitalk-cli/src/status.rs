//! `aitalk status` — show configuration.

use anyhow::Result;
use colored::Colorize;

use aitalk_core::config::{get_config_path, load_config};
use aitalk_core::session::list_sessions;
use aitalk_core::utils::mask_secret;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "AiTalk Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        found_marker(config_path.exists())
    );
    println!("  {:<18} {}", "Endpoint:".bold(), config.api.endpoint);
    println!("  {:<18} {}", "Model:".bold(), config.api.model);

    let key_status = if config.api.is_configured() {
        format!("{} ({})", "✓".green(), mask_secret(&config.api.api_key))
    } else {
        format!("{}", "· not configured".dimmed())
    };
    println!("  {:<18} {}", "API key:".bold(), key_status);

    let timeout = match config.api.timeout_secs {
        0 => "none".to_string(),
        secs => format!("{secs}s"),
    };
    println!("  {:<18} {}", "Timeout:".bold(), timeout);
    println!(
        "  {:<18} {}",
        "Persona:".bold(),
        if config.api.persona().is_some() {
            "set".to_string()
        } else {
            format!("{}", "· none".dimmed())
        }
    );

    let sessions_dir = config.sessions.resolved_dir();
    let saved = list_sessions(&sessions_dir).map(|files| files.len()).unwrap_or(0);
    println!(
        "  {:<18} {} {}",
        "Sessions:".bold(),
        sessions_dir.display(),
        if sessions_dir.is_dir() {
            format!("{} ({saved} saved)", "✓".green())
        } else {
            found_marker(false)
        }
    );
    println!(
        "  {:<18} {}",
        "Vision models:".bold(),
        config.vision_models.join(", ")
    );
    println!();

    Ok(())
}

fn found_marker(exists: bool) -> String {
    if exists {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    }
}
