//! Retrieve Challonge tournament brackets and walk their structure.
//!
//! Pages are resolved from caller-submitted HTML, the live site, or a local
//! cache, in that order; freshly fetched pages are written back to the cache.

pub use bracket::distinct_players;
pub use cache::{CacheError, CacheStore, FsCacheStore, MemoryCacheStore};
pub use cache_key::derive_cache_key;
pub use client::{ChallongeClient, ChallongeClientConfig};
pub use error::{ChallongeError, Result};
pub use live::{HttpLiveSource, LiveBody, LiveResponse, LiveSource, FRESHNESS_HEADER};
pub use model::*;
pub use resolver::{ContentOrigin, ContentResolver};
pub use crate::scraper::{parse_tournament_list_page, HtmlBracketPageParser, PageParser};

mod bracket;
pub mod cache;
pub mod cache_key;
mod client;
mod error;
pub mod live;
pub mod model;
mod resolver;
mod scraper;
