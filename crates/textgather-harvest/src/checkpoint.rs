//! Checkpoint ledger: compact progress snapshot for fast resume decisions.
//!
//! The listing stays authoritative for "already processed"; the checkpoint
//! exists so a resume decision and progress report never require re-reading
//! the full listing. Counts are carried incrementally by the orchestrator
//! (the only place an error outcome is distinguishable from "no text") and
//! re-derived from the listing only when no prior checkpoint survives.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use textgather_repo::MemberDoc;

use crate::listing::{EntryStatus, Listing};
use crate::outcome::ItemOutcome;
use crate::rundir::safe_collection_pid;
use crate::util::write_atomic;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Members reported by the collection search.
    pub total_docs: u64,
    /// Members that reached any terminal outcome.
    pub processed_count: u64,
    /// Members that contributed text (their own or a child's).
    pub appended_count: u64,
    /// Members with no text anywhere and no denial.
    pub no_text_count: u64,
    /// Direct permission denials (member or child); via-child tags on the
    /// member are not counted here.
    pub forbidden_count: u64,
}

impl Counts {
    /// Fold one member outcome into the counts.
    pub fn apply(&mut self, outcome: &ItemOutcome) {
        self.processed_count += 1;
        match outcome {
            ItemOutcome::Appended { .. } | ItemOutcome::HandledViaChild { .. } => {
                self.appended_count += 1;
            }
            ItemOutcome::NoText => self.no_text_count += 1,
            // a via-child denial writes the child's own forbidden entry
            ItemOutcome::Forbidden | ItemOutcome::ForbiddenViaChild { .. } => {
                self.forbidden_count += 1;
            }
            ItemOutcome::Error => {}
        }
    }

    /// Erroring members, left implicit in the persisted counts.
    pub fn error_count(&self) -> u64 {
        self.processed_count
            .saturating_sub(self.appended_count)
            .saturating_sub(self.no_text_count)
            .saturating_sub(self.forbidden_count)
    }

    /// Best-effort reconstruction from a listing when no checkpoint
    /// survived. Error entries are indistinguishable from "no text" on
    /// disk and fold into `no_text_count`.
    pub fn derive(listing: &Listing, members: &[MemberDoc]) -> Self {
        let member_pids: HashSet<&str> = members.iter().map(|m| m.pid.as_str()).collect();
        let mut counts = Self {
            total_docs: members.len() as u64,
            ..Self::default()
        };
        for entry in &listing.items {
            let is_member = member_pids.contains(entry.item_pid.as_str());
            match entry.status {
                Some(EntryStatus::Forbidden) => {
                    counts.forbidden_count += 1;
                    if is_member {
                        counts.processed_count += 1;
                    }
                }
                Some(EntryStatus::ForbiddenViaChild) => counts.processed_count += 1,
                Some(EntryStatus::HandledViaChild) => {
                    counts.processed_count += 1;
                    counts.appended_count += 1;
                }
                None => {
                    if is_member {
                        counts.processed_count += 1;
                        if entry.extracted_text_file_size.is_some() {
                            counts.appended_count += 1;
                        } else {
                            counts.no_text_count += 1;
                        }
                    }
                }
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointPaths {
    pub combined_text_path: String,
    pub listing_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub collection_pid: String,
    pub safe_collection_pid: String,
    /// Fixed at first creation; preserved by every later save.
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    pub run_directory_name: String,
    pub completed: bool,
    pub counts: Counts,
    pub paths: CheckpointPaths,
}

impl Checkpoint {
    pub fn new(collection_pid: &str, run_directory_name: &str, paths: CheckpointPaths) -> Self {
        let now = Local::now();
        Self {
            collection_pid: collection_pid.to_string(),
            safe_collection_pid: safe_collection_pid(collection_pid),
            created_at: now,
            updated_at: now,
            run_directory_name: run_directory_name.to_string(),
            completed: false,
            counts: Counts::default(),
            paths,
        }
    }

    /// Load a checkpoint; `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read checkpoint {}", path.display()))?;
        let checkpoint = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse checkpoint {}", path.display()))?;
        Ok(Some(checkpoint))
    }

    /// Persist, advancing `updated_at` and keeping `created_at` untouched.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Local::now();
        let json =
            serde_json::to_string_pretty(self).context("failed to serialize checkpoint")?;
        write_atomic(path, &json)
    }
}
