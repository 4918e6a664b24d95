//! Run directory management: creation, prior-run discovery, copy-forward.
//!
//! One directory per invocation, named from a local compact timestamp plus
//! the filesystem-safe collection pid, so lexicographic order matches
//! creation order within a collection's lineage.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::checkpoint::{Checkpoint, Counts};
use crate::listing::Listing;

/// Collection pid with the reserved separator substituted, safe for file
/// and directory names.
pub fn safe_collection_pid(pid: &str) -> String {
    pid.replace(':', "_")
}

pub fn combined_text_file(dir: &Path, safe_pid: &str) -> PathBuf {
    dir.join(format!("extracted_text_for_collection_pid-{safe_pid}.txt"))
}

pub fn listing_file(dir: &Path, safe_pid: &str) -> PathBuf {
    dir.join(format!("listing_for_collection_pid-{safe_pid}.json"))
}

pub fn checkpoint_file(dir: &Path, safe_pid: &str) -> PathBuf {
    dir.join(format!("checkpoint_for_collection_pid-{safe_pid}.json"))
}

/// Whether a directory name belongs to this collection's run lineage.
/// Expects `run-{compact-local-timestamp}-{safe_pid}`.
pub fn is_run_dir_for(name: &str, safe_pid: &str) -> bool {
    let Some(rest) = name.strip_prefix("run-") else {
        return false;
    };
    let Some(stamp) = rest.strip_suffix(safe_pid).and_then(|s| s.strip_suffix('-')) else {
        return false;
    };
    // compact timestamp starts with the 8-digit date
    stamp.len() >= 8 && stamp.as_bytes()[..8].iter().all(u8::is_ascii_digit)
}

pub struct RunDirectory {
    path: PathBuf,
    safe_pid: String,
}

impl RunDirectory {
    /// Create a fresh timestamped directory for this invocation. The stamp
    /// carries milliseconds; an invocation landing on a taken name waits
    /// out the collision.
    pub fn create(output_dir: &Path, collection_pid: &str) -> Result<Self> {
        let safe_pid = safe_collection_pid(collection_pid);
        let path = loop {
            let stamp = Local::now().format("%Y%m%dT%H%M%S%3f%z");
            let candidate = output_dir.join(format!("run-{stamp}-{safe_pid}"));
            if !candidate.exists() {
                break candidate;
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
        };
        std::fs::create_dir_all(&path)
            .with_context(|| format!("cannot create run directory {}", path.display()))?;
        Ok(Self { path, safe_pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn combined_text_path(&self) -> PathBuf {
        combined_text_file(&self.path, &self.safe_pid)
    }

    pub fn listing_path(&self) -> PathBuf {
        listing_file(&self.path, &self.safe_pid)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        checkpoint_file(&self.path, &self.safe_pid)
    }

    /// Most recent prior run worth resuming: an unfinished checkpoint, or a
    /// checkpoint-less directory that still has a listing. A completed
    /// checkpoint on the newest lineage member ends the search.
    pub fn find_prior_run(output_dir: &Path, collection_pid: &str) -> Result<Option<PathBuf>> {
        let safe_pid = safe_collection_pid(collection_pid);
        let mut names: Vec<String> = std::fs::read_dir(output_dir)
            .with_context(|| format!("cannot read output directory {}", output_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_run_dir_for(name, &safe_pid))
            .collect();
        names.sort();

        for name in names.iter().rev() {
            let dir = output_dir.join(name);
            match Checkpoint::load(&checkpoint_file(&dir, &safe_pid)) {
                Ok(Some(checkpoint)) => {
                    return Ok(if checkpoint.completed { None } else { Some(dir) });
                }
                Ok(None) => {}
                Err(e) => log::warn!("ignoring unreadable checkpoint in {name}: {e:#}"),
            }
            if listing_file(&dir, &safe_pid).exists() {
                return Ok(Some(dir));
            }
            // empty or artifact-less directory, keep looking
        }
        Ok(None)
    }

    /// Copy a prior run's combined text and listing into this directory,
    /// rewrite the listing's recorded display paths, and return the prior
    /// checkpoint's counts when readable.
    pub fn adopt_prior_run(&self, prior: &Path) -> Result<Option<Counts>> {
        let prior_combined = combined_text_file(prior, &self.safe_pid);
        if prior_combined.exists() {
            std::fs::copy(&prior_combined, self.combined_text_path()).with_context(|| {
                format!("cannot copy forward {}", prior_combined.display())
            })?;
        }

        let prior_listing = listing_file(prior, &self.safe_pid);
        if prior_listing.exists() {
            std::fs::copy(&prior_listing, self.listing_path())
                .with_context(|| format!("cannot copy forward {}", prior_listing.display()))?;
            let listing_path = self.listing_path();
            let mut listing = Listing::load_or_default(&listing_path)?;
            listing.refresh_summary(&self.combined_text_path(), &listing_path);
            listing.save(&listing_path)?;
        }

        match Checkpoint::load(&checkpoint_file(prior, &self.safe_pid)) {
            Ok(checkpoint) => Ok(checkpoint.map(|c| c.counts)),
            Err(e) => {
                log::warn!("prior checkpoint unreadable, counts will be re-derived: {e:#}");
                Ok(None)
            }
        }
    }
}
