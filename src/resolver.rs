use std::future::Future;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument};

use crate::cache::CacheStore;
use crate::cache_key::derive_cache_key;
use crate::error::{ChallongeError, Result};
use crate::live::{LiveSource, FRESHNESS_HEADER};
use crate::model::{TournamentBracketContent, TournamentBracketRequest, TournamentBracketResponse};
use crate::scraper::{decode_text, PageParser};

/// Where the bytes of a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ContentOrigin {
    Override,
    Live,
    Cache,
}

impl ContentOrigin {
    /// Only content fetched from the live site is written back to the cache.
    pub fn needs_write_back(self) -> bool {
        self == ContentOrigin::Live
    }
}

/// Resolves a bracket page from submitted content, the live site or the
/// cache, in that order, and writes live pages back to the cache.
pub struct ContentResolver {
    live: Arc<dyn LiveSource>,
    cache: Arc<dyn CacheStore>,
    parser: Arc<dyn PageParser>,
    freshness_header: String,
}

impl ContentResolver {
    pub fn new(
        live: Arc<dyn LiveSource>,
        cache: Arc<dyn CacheStore>,
        parser: Arc<dyn PageParser>,
    ) -> Self {
        Self {
            live,
            cache,
            parser,
            freshness_header: FRESHNESS_HEADER.to_string(),
        }
    }

    /// Use a different header to recognise genuine live pages.
    pub fn with_freshness_header(mut self, header: impl Into<String>) -> Self {
        self.freshness_header = header.into();
        self
    }

    /// Resolve and parse the bracket page for `request`.
    ///
    /// Dropping the returned future cancels the resolution; a write-back that
    /// has already started still commits atomically or not at all.
    #[instrument(skip_all, fields(url = %request.url))]
    pub async fn resolve(
        &self,
        request: TournamentBracketRequest,
        content: Option<TournamentBracketContent>,
    ) -> Result<TournamentBracketResponse> {
        request.validate()?;
        let key = derive_cache_key(&request.url)?;

        let (bytes, origin) = self.fetch_content(&request, &key, content).await?;
        debug!(origin = %origin, len = bytes.len(), "obtained content");

        let page = self.parser.parse(&decode_text(&bytes))?;

        if origin.needs_write_back() {
            self.cache
                .put(&key, &bytes)
                .await
                .map_err(|source| ChallongeError::CacheWrite {
                    key: key.clone(),
                    source,
                })?;
            info!(%key, "cached bracket page");
        }

        Ok(TournamentBracketResponse::from_page(request, page))
    }

    /// Like [`resolve`](Self::resolve), but gives up with
    /// [`ChallongeError::Cancelled`] as soon as `cancel` completes.
    pub async fn resolve_until<C>(
        &self,
        request: TournamentBracketRequest,
        content: Option<TournamentBracketContent>,
        cancel: C,
    ) -> Result<TournamentBracketResponse>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = cancel => {
                debug!("resolution cancelled");
                Err(ChallongeError::Cancelled)
            }
            result = self.resolve(request, content) => result,
        }
    }

    async fn fetch_content(
        &self,
        request: &TournamentBracketRequest,
        key: &str,
        content: Option<TournamentBracketContent>,
    ) -> Result<(Vec<u8>, ContentOrigin)> {
        if let Some(mut content) = content {
            if content.is_html() {
                debug!(media_type = %content.media_type, "using submitted content");
                let mut bytes = Vec::new();
                content
                    .content
                    .read_to_end(&mut bytes)
                    .await
                    .map_err(|source| ChallongeError::Read { source })?;
                return Ok((bytes, ContentOrigin::Override));
            }
            debug!(media_type = %content.media_type, "ignoring non-html submitted content");
        }

        let response = self.live.fetch(&request.url).await?;
        if response.has_header(&self.freshness_header) {
            debug!(status = %response.status, "live page is fresh");
            return Ok((response.bytes().await?, ContentOrigin::Live));
        }
        debug!(
            status = %response.status,
            header = %self.freshness_header,
            "live response lacks freshness header"
        );

        let cache_read = |source| ChallongeError::CacheRead {
            key: key.to_string(),
            source,
        };
        if self.cache.exists(key).await.map_err(cache_read)? {
            if let Some(bytes) = self.cache.get(key).await.map_err(cache_read)? {
                debug!(key, "using cached page");
                return Ok((bytes, ContentOrigin::Cache));
            }
        }

        Err(ChallongeError::ContentUnavailable {
            url: request.url.to_string(),
        })
    }
}
