//! textgather core - shared infrastructure for repository harvesting
//!
//! Provides the throttled retrying HTTP client, the fetch error taxonomy,
//! and logging/progress plumbing used by the harvest pipeline and the
//! one-shot audit tools.

pub mod client;
pub mod error;
pub mod logging;
pub mod progress;

// Re-exports for convenience
pub use client::{ApiClient, HttpConfig, SHARED_RUNTIME, backoff_duration, retry_with_backoff};
pub use error::FetchError;
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
