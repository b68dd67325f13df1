use ::scraper::error::SelectorErrorKind;
use std::num::ParseIntError;

use crate::cache::CacheError;

/// All errors that can occur while resolving or parsing a tournament bracket.
#[derive(thiserror::Error, Debug)]
pub enum ChallongeError {
    /// The request cannot be resolved at all (missing or non-absolute URL).
    #[error("invalid request for {url}: {reason}")]
    InvalidRequest { url: String, reason: &'static str },

    /// The URL does not map onto a flat per-tournament cache key.
    #[error("{url} is not a valid Challonge tournament URL")]
    InvalidCacheKey { url: String },

    /// Override content, the live site and the cache all came up empty.
    #[error(
        "could not retrieve content for {url} from submitted content, Challonge, or storage"
    )]
    ContentUnavailable { url: String },

    /// HTTP request failed (network, DNS, TLS, timeout, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// The HTTP client could not be built from configuration.
    #[error("failed to build http client: {0}")]
    ClientBuild(reqwest::Error),

    /// Failed to read the live response body.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// Failed to read caller-submitted content.
    #[error("failed to read submitted content: {source}")]
    Read { source: std::io::Error },

    /// A CSS selector string could not be parsed.
    #[error("invalid CSS selector: {0}")]
    Selector(String),

    /// An expected HTML element was not found on the page.
    #[error("expected element not found: {context}")]
    ElementNotFound { context: &'static str },

    /// A singleton page field matched more than one element.
    #[error("expected exactly one element for {context}, found {count}")]
    AmbiguousElement { context: &'static str, count: usize },

    /// An embedded script assignment was missing or appeared more than once.
    #[error("expected exactly one embedded {context} script, found {count}")]
    EmbeddedJson { context: &'static str, count: usize },

    /// Embedded JSON was malformed or structurally unexpected.
    #[error("failed to deserialize {context}: {source}")]
    Json {
        context: &'static str,
        source: serde_json::Error,
    },

    /// Failed to parse an integer from scraped text.
    #[error("failed to parse integer: {0}")]
    IntParse(#[from] ParseIntError),

    /// Failed to parse a date/time from scraped text.
    #[error("failed to parse date: {0}")]
    DateParse(#[from] chrono::ParseError),

    /// The cache store failed while reading `key`.
    #[error("failed to read {key} from cache: {source}")]
    CacheRead { key: String, source: CacheError },

    /// The page parsed, but persisting it under `key` failed.
    #[error("failed to write {key} to cache: {source}")]
    CacheWrite { key: String, source: CacheError },

    /// A bracket's rounds did not share exactly one stage type.
    #[error("expected a single stage type across rounds, found {found:?}")]
    StageType { found: Vec<String> },

    /// The caller cancelled the resolution.
    #[error("resolution cancelled")]
    Cancelled,
}

impl<'a> From<SelectorErrorKind<'a>> for ChallongeError {
    fn from(err: SelectorErrorKind<'a>) -> Self {
        ChallongeError::Selector(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChallongeError>;
