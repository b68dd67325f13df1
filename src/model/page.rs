use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use reqwest::Url;
use serde::{Deserialize, Serialize, Serializer};
use tokio::io::AsyncRead;

use crate::error::{ChallongeError, Result};
use crate::model::TournamentBracket;

/// Identifies the bracket page to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TournamentBracketRequest {
    #[serde(serialize_with = "serialize_url")]
    pub url: Url,
}

fn serialize_url<S: Serializer>(url: &Url, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(url.as_str())
}

impl TournamentBracketRequest {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Parse an absolute tournament URL.
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|_| ChallongeError::InvalidRequest {
            url: url.to_string(),
            reason: "not an absolute URL",
        })?;
        Ok(Self { url })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |reason: &'static str| ChallongeError::InvalidRequest {
            url: self.url.to_string(),
            reason,
        };
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if self.url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }
        Ok(())
    }
}

/// Caller-supplied page content, used in place of a live fetch.
///
/// Only `text/html` content (any `+suffix` or parameters aside) is used;
/// anything else is ignored and resolution falls back to the live site.
pub struct TournamentBracketContent {
    pub media_type: String,
    pub content: Box<dyn AsyncRead + Send + Unpin>,
}

impl TournamentBracketContent {
    pub fn new(media_type: impl Into<String>, content: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            media_type: media_type.into(),
            content: Box::new(content),
        }
    }

    /// Convenience for content that is already in memory.
    pub fn html(content: impl Into<Vec<u8>>) -> Self {
        Self::new("text/html", std::io::Cursor::new(content.into()))
    }

    pub fn is_html(&self) -> bool {
        is_html_media_type(&self.media_type)
    }
}

impl fmt::Debug for TournamentBracketContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TournamentBracketContent")
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// `type/subtype+suffix; params` is HTML when the type is `text` and the
/// subtype without its suffix is `html`.
fn is_html_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    let subtype = subtype.split('+').next().unwrap_or_default();
    kind.eq_ignore_ascii_case("text") && subtype.eq_ignore_ascii_case("html")
}

/// Singleton fields scraped from the page markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentPageDetails {
    pub name: String,
    pub url: String,
}

/// Advertising key/values the page embeds; the shape varies between pages.
pub type TournamentTargetingKeyValues = BTreeMap<String, serde_json::Value>;

/// The `.meta-list` block under the tournament title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentMetaList {
    pub game: Option<String>,
    pub start_time: Option<DateTime<FixedOffset>>,
}

/// Everything a [`PageParser`](crate::PageParser) extracts from a bracket page.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentBracketPage {
    pub page_content: TournamentPageDetails,
    pub bracket: TournamentBracket,
    pub targeting_key_values: TournamentTargetingKeyValues,
    pub meta_list: TournamentMetaList,
}

/// A resolved bracket together with the request that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentBracketResponse {
    pub request: TournamentBracketRequest,
    pub page_content: TournamentPageDetails,
    pub bracket: TournamentBracket,
    pub targeting_key_values: TournamentTargetingKeyValues,
    pub meta_list: TournamentMetaList,
}

impl TournamentBracketResponse {
    pub(crate) fn from_page(request: TournamentBracketRequest, page: TournamentBracketPage) -> Self {
        Self {
            request,
            page_content: page.page_content,
            bracket: page.bracket,
            targeting_key_values: page.targeting_key_values,
            meta_list: page.meta_list,
        }
    }
}
