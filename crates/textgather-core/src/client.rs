//! Throttled, retrying HTTP client for the repository API.
//!
//! Uses async reqwest internally with tokio::time::timeout per attempt,
//! but presents a sync interface since the harvest loop is strictly
//! sequential. Every attempt is preceded by a fixed courtesy delay so a
//! long run keeps a predictable, bounded request rate against the shared
//! upstream server.

use std::sync::LazyLock;
use std::time::Duration;

use futures_util::StreamExt;

use crate::error::FetchError;

/// Shared tokio runtime backing the sync facade.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// HTTP behavior knobs, passed in at construction so tests and the config
/// file can override delays and budgets.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Attempts per logical call (first try included).
    pub max_tries: u32,
    /// Fixed delay before every attempt.
    pub throttle: Duration,
    /// Upper bound on the exponential backoff sleep.
    pub backoff_cap: Duration,
    pub connect_timeout: Duration,
    /// Whole-attempt timeout for metadata GETs.
    pub read_timeout: Duration,
    /// Whole-attempt timeout for text body streaming.
    pub stream_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "textgather/0.1 (+https://repository.library.brown.edu/)".to_string(),
            max_tries: 4,
            throttle: Duration::from_millis(200),
            backoff_cap: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            stream_timeout: Duration::from_secs(60),
        }
    }
}

/// Exponential backoff clamped to the configured cap: min(2^attempt, cap).
pub fn backoff_duration(attempt: u32, cap: Duration) -> Duration {
    let secs = 2u64.saturating_pow(attempt.min(32));
    Duration::from_secs(secs).min(cap)
}

/// Retry a fallible fetch with throttle + exponential backoff.
///
/// A forbidden response short-circuits immediately; other errors retry
/// while retryable and attempts remain. The attempt counter is fresh per
/// logical call.
pub fn retry_with_backoff<T>(
    label: &str,
    config: &HttpConfig,
    mut attempt_fn: impl FnMut() -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    let max_tries = config.max_tries.max(1);
    let mut attempt = 0u32;
    loop {
        std::thread::sleep(config.throttle);
        attempt += 1;
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_forbidden() => {
                log::debug!("{label}: forbidden, not retrying");
                return Err(e);
            }
            Err(e) if attempt < max_tries && e.is_retryable() => {
                let delay = backoff_duration(attempt, config.backoff_cap);
                log::debug!(
                    "{label}: attempt {attempt}/{max_tries} failed: {e}, retrying in {delay:?}"
                );
                std::thread::sleep(delay);
            }
            Err(e) => {
                log::debug!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}

/// Sync HTTP client with per-call retry, throttle, and timeouts.
pub struct ApiClient {
    http: reqwest::Client,
    config: HttpConfig,
}

impl ApiClient {
    pub fn new(config: HttpConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| FetchError::from_reqwest(&e))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// GET a URL and return the response body as a string.
    pub fn get_with_retries(&self, url: &str) -> Result<String, FetchError> {
        retry_with_backoff(url, &self.config, || {
            self.attempt_get(url, &[], self.config.read_timeout)
        })
    }

    /// GET with query parameters (reqwest handles the encoding).
    pub fn get_with_query_with_retries(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        retry_with_backoff(url, &self.config, || {
            self.attempt_get(url, query, self.config.read_timeout)
        })
    }

    /// GET a text body by streaming chunks, with the longer stream timeout.
    ///
    /// Bytes are passed through as-is (lossily decoded if not valid UTF-8).
    pub fn stream_text_with_retries(&self, url: &str) -> Result<String, FetchError> {
        retry_with_backoff(url, &self.config, || self.attempt_stream(url))
    }

    fn attempt_get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<String, FetchError> {
        SHARED_RUNTIME.handle().block_on(async {
            let fetch = async {
                let mut req = self.http.get(url);
                if !query.is_empty() {
                    req = req.query(query);
                }
                let resp = req
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| FetchError::from_reqwest(&e))?;
                resp.text().await.map_err(|e| FetchError::from_reqwest(&e))
            };
            match tokio::time::timeout(timeout, fetch).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::timed_out("request")),
            }
        })
    }

    fn attempt_stream(&self, url: &str) -> Result<String, FetchError> {
        SHARED_RUNTIME.handle().block_on(async {
            let fetch = async {
                let resp = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| FetchError::from_reqwest(&e))?;
                let mut stream = resp.bytes_stream();
                let mut body: Vec<u8> = Vec::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| FetchError::from_reqwest(&e))?;
                    body.extend_from_slice(&chunk);
                }
                Ok::<_, FetchError>(String::from_utf8_lossy(&body).into_owned())
            };
            match tokio::time::timeout(self.config.stream_timeout, fetch).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::timed_out("stream")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> HttpConfig {
        HttpConfig {
            max_tries: 4,
            throttle: Duration::ZERO,
            backoff_cap: Duration::ZERO,
            ..HttpConfig::default()
        }
    }

    fn http_err(status: u16) -> FetchError {
        FetchError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn backoff_exponential_and_capped() {
        let cap = Duration::from_secs(15);
        assert_eq!(backoff_duration(1, cap), Duration::from_secs(2));
        assert_eq!(backoff_duration(2, cap), Duration::from_secs(4));
        assert_eq!(backoff_duration(3, cap), Duration::from_secs(8));
        assert_eq!(backoff_duration(4, cap), Duration::from_secs(15));
        assert_eq!(backoff_duration(10, cap), Duration::from_secs(15));
    }

    #[test]
    fn retry_succeeds_first_try() {
        let mut calls = 0;
        let result = retry_with_backoff("t", &fast_config(), || {
            calls += 1;
            Ok::<_, FetchError>(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_recovers_from_transient_failure() {
        let mut calls = 0;
        let result = retry_with_backoff("t", &fast_config(), || {
            calls += 1;
            if calls < 3 {
                Err(http_err(503))
            } else {
                Ok("body".to_string())
            }
        });
        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_exhausts_budget() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff("t", &fast_config(), || {
            calls += 1;
            Err(http_err(500))
        });
        assert!(result.is_err());
        assert_eq!(calls, 4);
    }

    #[test]
    fn forbidden_never_retried() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff("t", &fast_config(), || {
            calls += 1;
            Err(http_err(403))
        });
        assert!(result.unwrap_err().is_forbidden());
        assert_eq!(calls, 1);
    }

    #[test]
    fn non_retryable_client_error_fails_fast() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff("t", &fast_config(), || {
            calls += 1;
            Err(http_err(404))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn attempt_counter_resets_per_call() {
        let config = fast_config();
        for _ in 0..2 {
            let mut calls = 0;
            let _: Result<(), _> = retry_with_backoff("t", &config, || {
                calls += 1;
                Err(http_err(500))
            });
            assert_eq!(calls, 4);
        }
    }

    #[test]
    fn default_config_matches_server_courtesy() {
        let config = HttpConfig::default();
        assert_eq!(config.max_tries, 4);
        assert_eq!(config.throttle, Duration::from_millis(200));
        assert_eq!(config.backoff_cap, Duration::from_secs(15));
    }
}
