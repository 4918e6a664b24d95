//! Harvest orchestrator: drives the per-item state machine over the
//! enumerated members, persisting the ledgers after every outcome.
//!
//! Processing is strictly sequential in the order the search returned the
//! members; the combined file's block order therefore matches enumeration
//! order, skipping only ids that already carry a listing entry.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};

use textgather_core::{SharedProgress, fmt_num};
use textgather_repo::{
    MemberDoc, RepoConfig, Repository, collection_title, extract_child_pids, primary_title,
    resolve_text_location, studio_url,
};

use crate::checkpoint::{Checkpoint, CheckpointPaths, Counts};
use crate::combined::CombinedText;
use crate::listing::{EntryStatus, Listing, ListingEntry};
use crate::outcome::ItemOutcome;
use crate::rundir::RunDirectory;
use crate::util::display_path;

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub collection_pid: String,
    pub output_dir: PathBuf,
    /// Cap on newly appended items, reduced at startup by appends inherited
    /// from prior runs.
    pub limit: Option<u64>,
}

/// Outcome of one harvest invocation.
#[derive(Debug)]
pub struct HarvestSummary {
    pub collection_pid: String,
    pub total_docs: usize,
    pub appended_this_run: u64,
    pub skipped: usize,
    pub errors: usize,
    pub counts: Counts,
    pub completed: bool,
    pub combined_text_path: PathBuf,
    pub listing_path: PathBuf,
    pub elapsed: std::time::Duration,
}

impl HarvestSummary {
    pub fn log(&self) {
        log::info!("=== Harvest Summary ===");
        log::info!(
            "Items: {}/{} processed ({} skipped as already handled, {} errors)",
            fmt_num(self.counts.processed_count as usize),
            fmt_num(self.total_docs),
            self.skipped,
            self.errors
        );
        log::info!(
            "Appended {} this run ({} with text total, {} no text, {} forbidden)",
            self.appended_this_run,
            self.counts.appended_count,
            self.counts.no_text_count,
            self.counts.forbidden_count
        );
        log::info!("Combined text: {}", self.combined_text_path.display());
        log::info!("Listing JSON:  {}", self.listing_path.display());
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Run one harvest invocation end to end.
///
/// Fatal errors are limited to run setup (output directory, member
/// enumeration); anything that goes wrong while handling a single item is
/// recorded in the listing and the loop continues.
pub fn run(
    opts: &HarvestOptions,
    repo: &dyn Repository,
    config: &RepoConfig,
    progress: &SharedProgress,
) -> Result<HarvestSummary> {
    let start = Instant::now();
    let collection_pid = opts.collection_pid.trim().to_string();
    anyhow::ensure!(!collection_pid.is_empty(), "collection pid must not be empty");

    std::fs::create_dir_all(&opts.output_dir).with_context(|| {
        format!("cannot create output directory {}", opts.output_dir.display())
    })?;

    let prior = RunDirectory::find_prior_run(&opts.output_dir, &collection_pid)?;
    let run_dir = RunDirectory::create(&opts.output_dir, &collection_pid)?;
    log::info!("Run directory: {}", run_dir.path().display());

    let mut prior_counts = None;
    if let Some(prior_dir) = &prior {
        log::info!("Resuming from prior run {}", prior_dir.display());
        prior_counts = run_dir.adopt_prior_run(prior_dir)?;
    }

    let mut listing = Listing::load_or_default(&run_dir.listing_path())?;
    let combined = CombinedText::open(run_dir.combined_text_path())?;

    // collection metadata feeds the summary; failure degrades to an empty title
    let title = match repo.fetch_collection(&collection_pid) {
        Ok(doc) => collection_title(&doc),
        Err(e) => {
            log::warn!("collection metadata unavailable for {collection_pid}: {e}");
            String::new()
        }
    };
    listing.summary.collection_pid = collection_pid.clone();
    listing.summary.collection_primary_title = title;

    let members = repo
        .list_members(&collection_pid)
        .map_err(|e| anyhow!("cannot enumerate collection {collection_pid}: {e}"))?;
    if members.is_empty() {
        log::warn!("No items found for collection {collection_pid}");
    }

    let mut processed = listing.processed_pids();
    let inherited_appended = listing.appended_entry_count() as u64;
    let effective_limit = opts.limit.map(|n| n.saturating_sub(inherited_appended));
    if let Some(limit) = opts.limit {
        log::info!(
            "Append limit {limit}: {inherited_appended} inherited, {} remaining",
            effective_limit.unwrap_or(0)
        );
    }

    let mut counts = prior_counts.unwrap_or_else(|| Counts::derive(&listing, &members));
    counts.total_docs = members.len() as u64;

    let mut checkpoint = Checkpoint::new(
        &collection_pid,
        run_dir.name(),
        CheckpointPaths {
            combined_text_path: display_path(&run_dir.combined_text_path()),
            listing_path: display_path(&run_dir.listing_path()),
        },
    );

    let mut appended_this_run: u64 = 0;
    let mut skipped = 0usize;
    let mut errors = 0usize;
    let mut stopped_by_limit = effective_limit == Some(0);

    if stopped_by_limit {
        log::info!("append limit already satisfied by prior runs; skipping item fetches");
    } else {
        let pb = progress.items_bar(members.len() as u64, "items");
        for member in &members {
            pb.inc(1);
            if processed.contains(&member.pid) {
                skipped += 1;
                continue;
            }

            let outcome = match process_member(repo, config, member, &combined, &mut listing) {
                Ok(outcome) => outcome,
                Err(e) => {
                    errors += 1;
                    log::error!("Error processing {}: {e:#}", member.pid);
                    listing.upsert(error_stub(member, config));
                    ItemOutcome::Error
                }
            };

            processed.insert(member.pid.clone());
            match &outcome {
                ItemOutcome::ForbiddenViaChild { child_pid }
                | ItemOutcome::HandledViaChild { child_pid, .. } => {
                    processed.insert(child_pid.clone());
                }
                _ => {}
            }
            counts.apply(&outcome);
            persist_state(&mut listing, &mut checkpoint, &counts, &run_dir)?;

            if outcome.is_appended() {
                appended_this_run += 1;
                if let Some(limit) = effective_limit {
                    if appended_this_run >= limit {
                        log::info!("append limit reached ({limit}); stopping");
                        stopped_by_limit = true;
                        break;
                    }
                }
            }
        }
        pb.finish_and_clear();
    }

    // a cap-stop stays resumable; only an exhausted member list completes
    checkpoint.completed = !stopped_by_limit;
    persist_state(&mut listing, &mut checkpoint, &counts, &run_dir)?;

    let summary = HarvestSummary {
        collection_pid,
        total_docs: members.len(),
        appended_this_run,
        skipped,
        errors,
        counts,
        completed: checkpoint.completed,
        combined_text_path: run_dir.combined_text_path(),
        listing_path: run_dir.listing_path(),
        elapsed: start.elapsed(),
    };
    summary.log();
    Ok(summary)
}

fn persist_state(
    listing: &mut Listing,
    checkpoint: &mut Checkpoint,
    counts: &Counts,
    run_dir: &RunDirectory,
) -> Result<()> {
    listing.refresh_summary(&run_dir.combined_text_path(), &run_dir.listing_path());
    listing.save(&run_dir.listing_path())?;
    checkpoint.counts = *counts;
    checkpoint.save(&run_dir.checkpoint_path())
}

fn entry(
    pid: &str,
    title: &str,
    config: &RepoConfig,
    studio: String,
    size: Option<u64>,
    status: Option<EntryStatus>,
) -> ListingEntry {
    ListingEntry {
        item_pid: pid.to_string(),
        primary_title: title.to_string(),
        full_item_api_url: config.item_url(pid),
        full_studio_url: studio,
        extracted_text_file_size: size,
        status,
    }
}

fn error_stub(member: &MemberDoc, config: &RepoConfig) -> ListingEntry {
    entry(
        &member.pid,
        &member.title,
        config,
        config.studio_item_url(&member.pid),
        None,
        None,
    )
}

/// Per-item state machine. Resolution order: the member's own text, then
/// each child in order; the first child success or denial is conclusive.
fn process_member(
    repo: &dyn Repository,
    config: &RepoConfig,
    member: &MemberDoc,
    combined: &CombinedText,
    listing: &mut Listing,
) -> Result<ItemOutcome> {
    let pid = member.pid.as_str();

    let item = match repo.fetch_item(pid) {
        Ok(doc) => doc,
        Err(e) if e.is_forbidden() => {
            // denial of the member's own resource is conclusive; no fallback
            listing.upsert(entry(
                pid,
                &member.title,
                config,
                config.studio_item_url(pid),
                None,
                Some(EntryStatus::Forbidden),
            ));
            return Ok(ItemOutcome::Forbidden);
        }
        Err(e) => return Err(e.into()),
    };

    let mut title = primary_title(&item);
    if title.is_empty() {
        title = member.title.clone();
    }
    let studio = studio_url(&item, pid, config);

    if let Some(location) = resolve_text_location(&item, pid, config) {
        return match repo.fetch_text(&location.url) {
            Ok(text) => {
                let size = combined.append(pid, &text)?;
                listing.upsert(entry(pid, &title, config, studio, Some(size), None));
                Ok(ItemOutcome::Appended { size })
            }
            Err(e) if e.is_forbidden() => {
                listing.upsert(entry(
                    pid,
                    &title,
                    config,
                    studio,
                    None,
                    Some(EntryStatus::Forbidden),
                ));
                Ok(ItemOutcome::Forbidden)
            }
            Err(e) => Err(e.into()),
        };
    }

    // no own text: try children via hasPart, first success or denial wins
    for child_pid in extract_child_pids(&item) {
        let child = match repo.fetch_item(&child_pid) {
            Ok(doc) => doc,
            Err(e) if e.is_forbidden() => {
                record_child_denial(
                    listing,
                    config,
                    pid,
                    &title,
                    &studio,
                    &child_pid,
                    "",
                    config.studio_item_url(&child_pid),
                );
                return Ok(ItemOutcome::ForbiddenViaChild { child_pid });
            }
            Err(e) => return Err(e.into()),
        };

        let child_title = primary_title(&child);
        let child_studio = studio_url(&child, &child_pid, config);

        if let Some(location) = resolve_text_location(&child, &child_pid, config) {
            return match repo.fetch_text(&location.url) {
                Ok(text) => {
                    let size = combined.append(&child_pid, &text)?;
                    listing.upsert(entry(
                        &child_pid,
                        &child_title,
                        config,
                        child_studio,
                        Some(size),
                        None,
                    ));
                    listing.upsert(entry(
                        pid,
                        &title,
                        config,
                        studio,
                        None,
                        Some(EntryStatus::HandledViaChild),
                    ));
                    Ok(ItemOutcome::HandledViaChild { child_pid, size })
                }
                Err(e) if e.is_forbidden() => {
                    record_child_denial(
                        listing,
                        config,
                        pid,
                        &title,
                        &studio,
                        &child_pid,
                        &child_title,
                        child_studio,
                    );
                    Ok(ItemOutcome::ForbiddenViaChild { child_pid })
                }
                Err(e) => Err(e.into()),
            };
        }
        // child without extracted text: keep scanning
    }

    listing.upsert(entry(pid, &title, config, studio, None, None));
    Ok(ItemOutcome::NoText)
}

/// The one child tried was denied: the child gets its own forbidden entry,
/// the member is tagged forbidden-via-child, and no further children run.
#[allow(clippy::too_many_arguments)]
fn record_child_denial(
    listing: &mut Listing,
    config: &RepoConfig,
    parent_pid: &str,
    parent_title: &str,
    parent_studio: &str,
    child_pid: &str,
    child_title: &str,
    child_studio: String,
) {
    listing.upsert(entry(
        child_pid,
        child_title,
        config,
        child_studio,
        None,
        Some(EntryStatus::Forbidden),
    ));
    listing.upsert(entry(
        parent_pid,
        parent_title,
        config,
        parent_studio.to_string(),
        None,
        Some(EntryStatus::ForbiddenViaChild),
    ));
}
