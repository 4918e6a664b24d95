//! Harvest subcommand - resumable extracted-text collection

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use textgather_core::{ApiClient, HttpConfig, SharedProgress};
use textgather_harvest::{HarvestOptions, HarvestSummary};
use textgather_repo::{HttpRepository, RepoConfig};

#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Collection pid like bdr:c9fzffs9
    #[arg(long)]
    pub collection_pid: String,

    /// Directory where timestamped run directories are created
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Stop after this many newly appended texts (appends inherited from
    /// prior runs count against it)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,
}

pub fn run(
    args: HarvestArgs,
    http: &HttpConfig,
    repo_config: &RepoConfig,
    progress: &SharedProgress,
) -> Result<()> {
    let client = ApiClient::new(http.clone())?;
    let repo = HttpRepository::new(client, repo_config.clone());

    log::info!("Harvesting collection {}", args.collection_pid.trim());
    log::info!("  Output: {}", args.output_dir.display());
    if let Some(limit) = args.limit {
        log::info!("  Limit: {limit}");
    }

    let opts = HarvestOptions {
        collection_pid: args.collection_pid,
        output_dir: args.output_dir,
        limit: args.limit,
    };
    let summary = textgather_harvest::run(&opts, &repo, repo_config, progress)?;
    print_summary(&summary);
    Ok(())
}

/// Print a key-value summary table on stderr
fn print_summary(summary: &HarvestSummary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Harvest").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let counts = &summary.counts;
    let rows = [
        ("Collection", summary.collection_pid.clone()),
        (
            "Items",
            format!(
                "{}/{} processed ({} skipped, {} errors)",
                counts.processed_count, summary.total_docs, summary.skipped, summary.errors
            ),
        ),
        (
            "Appended",
            format!(
                "{} this run ({} with text total)",
                summary.appended_this_run, counts.appended_count
            ),
        ),
        ("No text", counts.no_text_count.to_string()),
        ("Forbidden", counts.forbidden_count.to_string()),
        (
            "Completed",
            if summary.completed { "yes" } else { "no (resumable)" }.to_string(),
        ),
        (
            "Combined text",
            summary.combined_text_path.display().to_string(),
        ),
        ("Listing JSON", summary.listing_path.display().to_string()),
        ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}
