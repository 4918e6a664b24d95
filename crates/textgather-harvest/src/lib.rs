//! Resumable harvest pipeline: run directories, the listing and checkpoint
//! ledgers, the combined-text appender, and the per-item orchestrator.
//!
//! Every invocation gets a fresh timestamped run directory; an unfinished
//! prior run's artifacts are copied forward so already-resolved items are
//! never fetched twice. The listing is the authority for "already handled";
//! the checkpoint is a compact snapshot for fast resume decisions.

pub mod checkpoint;
pub mod combined;
pub mod listing;
pub mod outcome;
pub mod rundir;
pub mod runner;
mod util;

pub use checkpoint::{Checkpoint, CheckpointPaths, Counts};
pub use combined::{CombinedText, delimiter_line};
pub use listing::{EntryStatus, Listing, ListingEntry, Summary};
pub use outcome::ItemOutcome;
pub use rundir::{RunDirectory, safe_collection_pid};
pub use runner::{HarvestOptions, HarvestSummary, run};
