use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::Config;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("path", _)) => path(),
        Some(("init", sub_matches)) => init(sub_matches.get_flag("force")),
        _ => {
            println!("Use 'procwatch config --help' for more information.");
            Ok(())
        }
    }
}

/// Print the effective configuration (file values over defaults)
fn show() -> Result<()> {
    let config = Config::load()?;
    let path = Config::config_path()?;

    if !path.exists() {
        println!(
            "{}",
            "No config file found, showing defaults.".dimmed()
        );
    }
    println!("{}", serde_json::to_string_pretty(&config)?);

    if let Err(e) = config.validate() {
        println!("{}", format!("⚠️  Warning: {}", e).yellow());
    }
    Ok(())
}

fn path() -> Result<()> {
    let path = Config::config_path()?;
    println!("{}", path.display().to_string().cyan().bold());
    Ok(())
}

/// Write the default config file
fn init(force: bool) -> Result<()> {
    let path = Config::config_path()?;

    if path.exists() && !force {
        println!(
            "{}",
            format!("Config file already exists: {}", path.display()).yellow()
        );
        println!("{}", "Use --force to overwrite it.".dimmed());
        return Ok(());
    }

    Config::default()
        .save_to(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} {}",
        "✓ Config written to:".green(),
        path.display()
    );
    Ok(())
}
