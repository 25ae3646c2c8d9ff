pub mod identifier;
pub mod meta;
pub mod splitter;
pub mod text;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ResolverConfig;
use crate::fetch::{FetchError, PageFetcher, UreqFetcher};
use identifier::extract_track_id;
use meta::{read_meta, read_title_element};
use splitter::{artist_from_description, split_title_artist};
use text::normalize;

/// Title used when the page yields nothing usable.
pub const PLACEHOLDER_TITLE: &str = "Unknown Title";

/// Metadata keys tried for the title, in order.
const TITLE_KEYS: &[&str] = &["og:title", "twitter:title", "title"];

/// Metadata keys tried for the description, in order.
const DESCRIPTION_KEYS: &[&str] = &["og:description", "twitter:description", "description"];

/// Structured result of resolving one share link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFact {
    /// Never empty; [`PLACEHOLDER_TITLE`] when nothing was extracted.
    pub title: String,
    /// Empty when no heuristic found an artist.
    pub artist: String,
    /// Present only when all ASCII digits.
    pub track_id: Option<String>,
    /// The input URL as given.
    pub source_url: String,
}

impl ResolvedFact {
    pub fn has_placeholder_title(&self) -> bool {
        self.title == PLACEHOLDER_TITLE
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16 },
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
    #[error("internal error: {0}")]
    Server(String),
}

impl ResolveError {
    /// Error class name exposed at the response boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "InputError",
            Self::Upstream { .. } | Self::Timeout(_) | Self::Unreachable(_) => "UpstreamError",
            Self::Server(_) => "ServerError",
        }
    }

    /// HTTP status the boundary answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Input(_) => 400,
            Self::Upstream { .. } | Self::Timeout(_) | Self::Unreachable(_) => 502,
            Self::Server(_) => 500,
        }
    }

    /// Status code returned by the remote page, when there was one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<FetchError> for ResolveError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(d) => Self::Timeout(d),
            FetchError::Transport(msg) => Self::Unreachable(msg),
        }
    }
}

/// Turns share links into [`ResolvedFact`]s: validate, fetch, extract.
///
/// Holds no per-request state; each call to [`resolve`](Self::resolve) is
/// independent apart from the one outbound fetch.
#[derive(Debug)]
pub struct TrackResolver {
    config: ResolverConfig,
    fetcher: Box<dyn PageFetcher>,
}

impl TrackResolver {
    pub fn new(config: ResolverConfig, fetcher: Box<dyn PageFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Resolver that fetches over HTTP with the configured timeout.
    pub fn with_http(config: ResolverConfig) -> Self {
        let fetcher = UreqFetcher::new(&config);
        Self::new(config, Box::new(fetcher))
    }

    /// Resolve a share link. Every failure comes back as a [`ResolveError`];
    /// a panic during fetch or extraction is caught here and reported as
    /// [`ResolveError::Server`].
    pub fn resolve(&self, url: &str) -> Result<ResolvedFact, ResolveError> {
        let target = self.validate(url)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.fetch_and_extract(url, &target)));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Resolution of {url} panicked: {message}");
                Err(ResolveError::Server(message))
            }
        };

        match &result {
            Ok(fact) => log::info!(
                "Resolved {url}: title={:?} artist={:?} track_id={:?}",
                fact.title,
                fact.artist,
                fact.track_id
            ),
            Err(e) => log::warn!("Failed to resolve {url}: {e}"),
        }
        result
    }

    /// Check the link is a well-formed http(s) URL on an accepted host.
    fn validate(&self, url: &str) -> Result<Url, ResolveError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::Input("missing url".to_string()));
        }

        let parsed = Url::parse(trimmed)
            .map_err(|e| ResolveError::Input(format!("unparsable url {trimmed:?}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ResolveError::Input(format!(
                "unsupported scheme {:?}",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| ResolveError::Input(format!("url {trimmed:?} has no host")))?;
        if !self.config.accepts_host(host) {
            return Err(ResolveError::Input(format!("host {host:?} is not accepted")));
        }

        Ok(parsed)
    }

    fn fetch_and_extract(&self, url: &str, target: &Url) -> Result<ResolvedFact, ResolveError> {
        let page = self.fetcher.fetch(target.as_str())?;
        if !page.is_success() {
            return Err(ResolveError::Upstream {
                status: page.status,
            });
        }
        Ok(extract_fact(url, &page.body))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// First non-empty normalized value among `keys`.
fn first_meta(html: &str, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let value = normalize(&read_meta(html, key)?);
        log::debug!("meta {key}: {value:?}");
        (!value.is_empty()).then_some(value)
    })
}

/// Build a fact from an already fetched page. Pure; never fails.
///
/// Title comes from the title metadata (falling back to the `<title>`
/// element), split into title and artist. A missing artist is looked for in
/// the description. The track id depends only on the URL.
pub fn extract_fact(source_url: &str, html: &str) -> ResolvedFact {
    let track_id = extract_track_id(source_url);

    let raw_title = first_meta(html, TITLE_KEYS).or_else(|| {
        read_title_element(html)
            .map(|t| normalize(&t))
            .filter(|t| !t.is_empty())
    });

    let Some(raw_title) = raw_title else {
        log::warn!("No title metadata in page for {source_url}, using placeholder");
        return ResolvedFact {
            title: PLACEHOLDER_TITLE.to_string(),
            artist: String::new(),
            track_id,
            source_url: source_url.to_string(),
        };
    };

    let split = split_title_artist(&raw_title);
    log::debug!("split {raw_title:?} with {}", split.strategy);

    let artist = split.artist.or_else(|| {
        let description = first_meta(html, DESCRIPTION_KEYS)?;
        let artist = artist_from_description(&description);
        if let Some(a) = &artist {
            log::debug!("artist {a:?} recovered from description");
        }
        artist
    });

    let title = if split.title.is_empty() {
        PLACEHOLDER_TITLE.to_string()
    } else {
        split.title
    };

    ResolvedFact {
        title,
        artist: artist.unwrap_or_default(),
        track_id,
        source_url: source_url.to_string(),
    }
}
