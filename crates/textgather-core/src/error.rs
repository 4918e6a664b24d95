//! Error type for repository HTTP fetches.

/// Error from a single HTTP fetch against the repository API.
///
/// A 403 is a terminal permission denial and is never retried; the
/// orchestrator records it as an outcome rather than an error. Server
/// errors and transport failures are retryable.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP-level failure with optional status code (None = transport error)
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Local I/O failure (includes per-attempt timeouts)
    Io(std::io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl FetchError {
    /// Build from a reqwest error, capturing the status when present.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Per-attempt timeout, surfaced as a retryable I/O error.
    pub fn timed_out(what: &str) -> Self {
        Self::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("{what} timed out"),
        ))
    }

    /// Permission denial; terminal, never retried.
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            Self::Http {
                status: Some(403),
                ..
            }
        )
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => match status {
                // 5xx and rate limiting retry; other client errors do not
                Some(s) => *s >= 500 || *s == 429,
                // transport failure without a status (refused, reset, DNS)
                None => true,
            },
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
        }
    }
}
