//! textgather - Harvest extracted text from a digital repository
//!
//! Collects the EXTRACTED_TEXT datastream for every item in a collection
//! into one combined file with a JSON listing, resumably; plus one-shot
//! tools for auditing collections and summarizing item zip contents.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use textgather_repo::RepoConfig;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "textgather")]
#[command(about = "Harvests extracted text from digital-repository collections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./textgather.toml or ~/.config/textgather/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Maximum attempts per request
    #[arg(long, global = true)]
    max_tries: Option<u32>,

    /// Milliseconds to pause before every request
    #[arg(long, global = true)]
    throttle_ms: Option<u64>,

    /// Repository base URL
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest extracted text for a collection (resumable)
    Harvest(cmd::harvest::HarvestArgs),
    /// Find collections that contain extracted-text items
    Audit(cmd::audit::AuditArgs),
    /// Summarize zip contents for an item and its children
    ZipInfo(cmd::zipinfo::ZipInfoArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(textgather_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — the progress bar shows activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    textgather_core::init_logging(quiet, cli.debug, multi);

    // Load configuration
    let config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply HTTP settings (config file defaults, CLI overrides)
    let mut http = config.http_config();
    if let Some(n) = cli.max_tries {
        http.max_tries = n;
    }
    if let Some(ms) = cli.throttle_ms {
        http.throttle = Duration::from_millis(ms);
    }
    let repo_config = match &cli.base_url {
        Some(url) => RepoConfig::new(url.clone()),
        None => config.repo_config(),
    };

    match cli.command {
        Command::Harvest(args) => cmd::harvest::run(args, &http, &repo_config, &progress),
        Command::Audit(args) => cmd::audit::run(args, &http, &repo_config),
        Command::ZipInfo(args) => cmd::zipinfo::run(args, &http, &repo_config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Base URL", repo_config.base_url()]);
            table.add_row(vec!["User agent", &http.user_agent]);
            table.add_row(vec!["Max tries", &http.max_tries.to_string()]);
            table.add_row(vec![
                "Throttle",
                &format!("{}ms", http.throttle.as_millis()),
            ]);
            table.add_row(vec![
                "Backoff cap",
                &format!("{}s", http.backoff_cap.as_secs()),
            ]);
            table.add_row(vec![
                "Connect timeout",
                &format!("{}s", http.connect_timeout.as_secs()),
            ]);
            table.add_row(vec![
                "Read timeout",
                &format!("{}s", http.read_timeout.as_secs()),
            ]);
            table.add_row(vec![
                "Stream timeout",
                &format!("{}s", http.stream_timeout.as_secs()),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
