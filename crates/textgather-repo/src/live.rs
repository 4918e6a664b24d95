//! Repository access trait and its live HTTP implementation.

use serde_json::Value;

use textgather_core::{ApiClient, FetchError};

use crate::config::RepoConfig;
use crate::search::{self, MemberDoc, SEARCH_PAGE_SIZE};

/// Error from one repository operation: the fetch itself, or decoding the
/// returned body.
#[derive(Debug)]
pub enum RepoError {
    Fetch(FetchError),
    Json {
        url: String,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Json { url, source } => write!(f, "invalid JSON from {url}: {source}"),
        }
    }
}

impl std::error::Error for RepoError {}

impl From<FetchError> for RepoError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl RepoError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_forbidden())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_retryable())
    }
}

/// The repository operations the harvest pipeline needs. Implemented over
/// HTTP for real runs and in memory for orchestrator tests.
pub trait Repository {
    /// Item metadata document.
    fn fetch_item(&self, pid: &str) -> Result<Value, RepoError>;

    /// Collection metadata document (name + ancestor chain).
    fn fetch_collection(&self, pid: &str) -> Result<Value, RepoError>;

    /// All member item ids and titles for a collection, in server order.
    /// A collection with zero matches yields an empty list.
    fn list_members(&self, collection_pid: &str) -> Result<Vec<MemberDoc>, RepoError>;

    /// Raw text body from a resolved text location.
    fn fetch_text(&self, url: &str) -> Result<String, RepoError>;
}

/// Live implementation over the throttled retrying client.
pub struct HttpRepository {
    client: ApiClient,
    config: RepoConfig,
}

impl HttpRepository {
    pub fn new(client: ApiClient, config: RepoConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    fn get_json(&self, url: &str) -> Result<Value, RepoError> {
        let body = self.client.get_with_retries(url)?;
        serde_json::from_str(&body).map_err(|source| RepoError::Json {
            url: url.to_string(),
            source,
        })
    }
}

impl Repository for HttpRepository {
    fn fetch_item(&self, pid: &str) -> Result<Value, RepoError> {
        self.get_json(&self.config.item_url(pid))
    }

    fn fetch_collection(&self, pid: &str) -> Result<Value, RepoError> {
        self.get_json(&self.config.collection_url(pid))
    }

    fn list_members(&self, collection_pid: &str) -> Result<Vec<MemberDoc>, RepoError> {
        let url = self.config.search_url();
        let fq = search::membership_filter(collection_pid);
        let rows = SEARCH_PAGE_SIZE.to_string();

        let mut members = Vec::new();
        let mut start = 0u64;
        loop {
            let start_s = start.to_string();
            let query: [(&str, &str); 5] = [
                ("q", "*:*"),
                ("fq", &fq),
                ("fl", "pid,primary_title"),
                ("rows", &rows),
                ("start", &start_s),
            ];
            let body = self.client.get_with_query_with_retries(&url, &query)?;
            let page: Value = serde_json::from_str(&body).map_err(|source| RepoError::Json {
                url: url.clone(),
                source,
            })?;

            let (docs, num_found) = search::parse_search_page(&page);
            if docs.is_empty() {
                break;
            }
            members.extend(docs);
            start += SEARCH_PAGE_SIZE;
            if start >= num_found {
                break;
            }
        }
        log::debug!("collection {collection_pid}: {} members", members.len());
        Ok(members)
    }

    fn fetch_text(&self, url: &str) -> Result<String, RepoError> {
        Ok(self.client.stream_text_with_retries(url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_err(status: u16) -> RepoError {
        RepoError::Fetch(FetchError::Http {
            status: Some(status),
            message: "test".to_string(),
        })
    }

    #[test]
    fn forbidden_delegates_to_fetch_error() {
        assert!(http_err(403).is_forbidden());
        assert!(!http_err(500).is_forbidden());
    }

    #[test]
    fn json_error_is_not_retryable() {
        let err = RepoError::Json {
            url: "https://example.org/api/items/x/".to_string(),
            source: serde_json::from_str::<Value>("not json").unwrap_err(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_forbidden());
        assert!(format!("{err}").contains("invalid JSON"));
    }

    #[test]
    fn retryable_delegates_to_fetch_error() {
        assert!(http_err(502).is_retryable());
        assert!(!http_err(404).is_retryable());
    }
}
