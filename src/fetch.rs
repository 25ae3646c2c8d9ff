use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::config::ResolverConfig;

/// Transport-level failure: no usable HTTP response was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Status code plus raw document body of a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the single outbound GET of a resolution.
///
/// Any status code is a successful fetch at this level; deciding what a
/// non-2xx status means is left to the caller.
pub trait PageFetcher: Send + Sync + std::fmt::Debug {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url)
    }
}

/// Fetcher backed by a ureq agent with a global timeout.
#[derive(Debug)]
pub struct UreqFetcher {
    agent: ureq::Agent,
    timeout: Duration,
    user_agent: String,
    max_body_bytes: u64,
}

impl UreqFetcher {
    pub fn new(config: &ResolverConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            // Status codes are reported, not turned into errors
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn map_error(&self, err: ureq::Error) -> FetchError {
        match err {
            ureq::Error::Timeout(_) => FetchError::Timeout(self.timeout),
            other => FetchError::Transport(other.to_string()),
        }
    }
}

impl PageFetcher for UreqFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        log::debug!("GET {url}");

        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(|e| self.map_error(e))?;

        log::debug!("  HTTP {status}, {} bytes", bytes.len());
        Ok(FetchedPage {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Fetcher that returns a fixed result for every request.
///
/// Used to resolve against a page saved to disk, and as a test double.
#[derive(Debug)]
pub struct StaticFetcher {
    result: Result<FetchedPage, FetchError>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    /// Always answer `200` with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            result: Ok(FetchedPage {
                status,
                body: body.into(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        log::debug!("static fetch {url}");
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let page = |status| FetchedPage { status, body: String::new() };
        assert!(page(200).is_success());
        assert!(page(204).is_success());
        assert!(!page(199).is_success());
        assert!(!page(301).is_success());
        assert!(!page(404).is_success());
        assert!(!page(503).is_success());
    }

    #[test]
    fn test_static_fetcher_counts_calls() {
        let fetcher = StaticFetcher::ok("<html></html>");
        assert_eq!(fetcher.calls(), 0);
        let page = fetcher.fetch("https://music.apple.com/x").unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<html></html>");
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_static_fetcher_failure() {
        let fetcher = StaticFetcher::failing(FetchError::Timeout(Duration::from_secs(5)));
        assert_eq!(
            fetcher.fetch("https://music.apple.com/x"),
            Err(FetchError::Timeout(Duration::from_secs(5)))
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(5)).to_string(),
            "request timed out after 5s"
        );
        assert_eq!(
            FetchError::Transport("dns failure".into()).to_string(),
            "transport error: dns failure"
        );
    }

    #[test]
    fn test_ureq_fetcher_times_out_on_silent_server() {
        // Accepts connections into the backlog but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let config = ResolverConfig {
            timeout_secs: 1,
            ..ResolverConfig::default()
        };
        let fetcher = UreqFetcher::new(&config);
        let result = fetcher.fetch(&format!("http://{addr}/song/1"));
        assert_eq!(result, Err(FetchError::Timeout(Duration::from_secs(1))));
        drop(listener);
    }
}
