//! Listing ledger: per-item outcomes plus the recomputed run summary.
//!
//! The listing is the authority for "already handled" on resume. Entries
//! are only ever added (one per item pid); the summary is a view rebuilt
//! from the entries and the on-disk combined-text size at every persist.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::HumanBytes;
use serde::{Deserialize, Serialize};

use crate::util::{display_path, now_iso, write_atomic};

/// Terminal status tags beyond the default "appended normally" /
/// "no text found" shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Permission denied fetching this item's own text.
    Forbidden,
    /// Item has no text of its own; the one child tried was denied.
    ForbiddenViaChild,
    /// Item has no text of its own; a child's text was appended for it.
    HandledViaChild,
}

/// One row per item that reached a terminal outcome.
///
/// No status with a size means "appended normally"; no status with a null
/// size means "no text found" (a per-item error is recorded with the same
/// shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingEntry {
    pub item_pid: String,
    pub primary_title: String,
    pub full_item_api_url: String,
    pub full_studio_url: String,
    pub extracted_text_file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub timestamp: String,
    pub all_extracted_text_file_size_bytes: u64,
    pub all_extracted_text_file_size_human: String,
    pub count_of_all_extracted_text_files: usize,
    /// Display paths recorded as "parent-dir/filename".
    pub combined_text_path: String,
    pub listing_path: String,
    pub collection_pid: String,
    pub collection_primary_title: String,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            timestamp: now_iso(),
            all_extracted_text_file_size_bytes: 0,
            all_extracted_text_file_size_human: HumanBytes(0).to_string(),
            count_of_all_extracted_text_files: 0,
            combined_text_path: String::new(),
            listing_path: String::new(),
            collection_pid: String::new(),
            collection_primary_title: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Listing {
    pub summary: Summary,
    pub items: Vec<ListingEntry>,
}

impl Listing {
    /// Load from disk, or start empty when no file exists yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read listing {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse listing {}", path.display()))
    }

    /// Pretty JSON, whole-file rewrite through a temp file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("failed to serialize listing")?;
        write_atomic(path, &json)
    }

    /// Add or replace the entry for an item pid; at most one per pid.
    pub fn upsert(&mut self, entry: ListingEntry) {
        match self.items.iter_mut().find(|e| e.item_pid == entry.item_pid) {
            Some(existing) => *existing = entry,
            None => self.items.push(entry),
        }
    }

    pub fn contains(&self, pid: &str) -> bool {
        self.items.iter().any(|e| e.item_pid == pid)
    }

    /// All pids with a terminal entry, for the resume skip rule.
    pub fn processed_pids(&self) -> HashSet<String> {
        self.items.iter().map(|e| e.item_pid.clone()).collect()
    }

    /// Entries that contributed text (non-null size).
    pub fn appended_entry_count(&self) -> usize {
        self.items
            .iter()
            .filter(|e| e.extracted_text_file_size.is_some())
            .count()
    }

    /// Rebuild the summary from the entries and the combined file's
    /// current on-disk size.
    pub fn refresh_summary(&mut self, combined_path: &Path, listing_path: &Path) {
        let size = std::fs::metadata(combined_path).map(|m| m.len()).unwrap_or(0);
        self.summary.count_of_all_extracted_text_files = self.appended_entry_count();
        self.summary.all_extracted_text_file_size_bytes = size;
        self.summary.all_extracted_text_file_size_human = HumanBytes(size).to_string();
        self.summary.timestamp = now_iso();
        self.summary.combined_text_path = display_path(combined_path);
        self.summary.listing_path = display_path(listing_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pid: &str, size: Option<u64>, status: Option<EntryStatus>) -> ListingEntry {
        ListingEntry {
            item_pid: pid.to_string(),
            primary_title: format!("Title {pid}"),
            full_item_api_url: format!("https://example.org/api/items/{pid}/"),
            full_studio_url: format!("https://example.org/studio/item/{pid}/"),
            extracted_text_file_size: size,
            status,
        }
    }

    #[test]
    fn upsert_keeps_one_entry_per_pid() {
        let mut listing = Listing::default();
        listing.upsert(entry("bdr:1", None, None));
        listing.upsert(entry("bdr:2", Some(10), None));
        listing.upsert(entry("bdr:1", Some(5), None));
        assert_eq!(listing.items.len(), 2);
        assert_eq!(listing.items[0].extracted_text_file_size, Some(5));
    }

    #[test]
    fn status_serializes_snake_case_and_absent_when_none() {
        let json = serde_json::to_string(&entry("bdr:1", None, Some(EntryStatus::ForbiddenViaChild))).unwrap();
        assert!(json.contains("\"status\":\"forbidden_via_child\""));

        let json = serde_json::to_string(&entry("bdr:1", Some(5), None)).unwrap();
        assert!(!json.contains("status"));
    }

    #[test]
    fn status_roundtrips() {
        for status in [
            EntryStatus::Forbidden,
            EntryStatus::ForbiddenViaChild,
            EntryStatus::HandledViaChild,
        ] {
            let json = serde_json::to_string(&entry("bdr:1", None, Some(status))).unwrap();
            let back: ListingEntry = serde_json::from_str(&json).unwrap();
            assert_eq!(back.status, Some(status));
        }
    }

    #[test]
    fn appended_count_ignores_null_sizes() {
        let mut listing = Listing::default();
        listing.upsert(entry("bdr:1", Some(10), None));
        listing.upsert(entry("bdr:2", None, None));
        listing.upsert(entry("bdr:3", None, Some(EntryStatus::HandledViaChild)));
        listing.upsert(entry("bdr:4", Some(3), None));
        assert_eq!(listing.appended_entry_count(), 2);
    }

    #[test]
    fn refresh_summary_tracks_disk_size_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("run-20250101T000000-0500-bdr_x");
        std::fs::create_dir_all(&run_dir).unwrap();
        let combined = run_dir.join("extracted_text_for_collection_pid-bdr_x.txt");
        let listing_path = run_dir.join("listing_for_collection_pid-bdr_x.json");
        std::fs::write(&combined, "0123456789").unwrap();

        let mut listing = Listing::default();
        listing.upsert(entry("bdr:1", Some(10), None));
        listing.refresh_summary(&combined, &listing_path);

        assert_eq!(listing.summary.all_extracted_text_file_size_bytes, 10);
        assert_eq!(
            listing.summary.all_extracted_text_file_size_human,
            HumanBytes(10).to_string()
        );
        assert_eq!(listing.summary.count_of_all_extracted_text_files, 1);
        assert_eq!(
            listing.summary.combined_text_path,
            "run-20250101T000000-0500-bdr_x/extracted_text_for_collection_pid-bdr_x.txt"
        );
        assert_eq!(
            listing.summary.listing_path,
            "run-20250101T000000-0500-bdr_x/listing_for_collection_pid-bdr_x.json"
        );
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listing.json");

        let mut listing = Listing::default();
        listing.summary.collection_pid = "bdr:c1".to_string();
        listing.upsert(entry("bdr:1", Some(7), None));
        listing.upsert(entry("bdr:2", None, Some(EntryStatus::Forbidden)));
        listing.save(&path).unwrap();

        let loaded = Listing::load_or_default(&path).unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.summary.collection_pid, "bdr:c1");
        assert_eq!(loaded.items[1].status, Some(EntryStatus::Forbidden));
    }

    #[test]
    fn load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let listing = Listing::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert!(listing.items.is_empty());
    }

    #[test]
    fn load_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listing.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Listing::load_or_default(&path).is_err());
    }
}
