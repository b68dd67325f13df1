use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::cache::{CacheStore, FsCacheStore};
use crate::error::{ChallongeError, Result};
use crate::live::{HttpLiveSource, LiveSource, FRESHNESS_HEADER};
use crate::model::*;
use crate::resolver::ContentResolver;
use crate::scraper::{HtmlBracketPageParser, PageParser};

/// Settings for [`ChallongeClient::from_config`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChallongeClientConfig {
    /// Sent as the `User-Agent` of every live request when not blank.
    pub user_agent: Option<String>,
    /// Root directory of the page cache.
    pub cache_dir: PathBuf,
    /// Response header that marks a live page as usable.
    pub freshness_header: String,
}

impl Default for ChallongeClientConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            cache_dir: PathBuf::from("challonge-cache"),
            freshness_header: FRESHNESS_HEADER.to_string(),
        }
    }
}

/// The main entry point for retrieving Challonge brackets.
///
/// `ChallongeClient` resolves bracket pages through a [`ContentResolver`],
/// fetching from challonge.com and keeping a copy of every fresh page in a
/// cache that is used whenever the live site cannot serve one.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> challonge_scraper::Result<()> {
/// use challonge_scraper::{ChallongeClient, TournamentBracketRequest};
///
/// let client = ChallongeClient::new();
/// let request = TournamentBracketRequest::parse("https://challonge.com/weekly42")?;
/// let bracket = client.get_tournament_bracket(request, None).await?;
/// println!(
///     "{} has {} players",
///     bracket.page_content.name,
///     bracket.players().len()
/// );
/// # Ok(())
/// # }
/// ```
pub struct ChallongeClient {
    resolver: ContentResolver,
}

impl ChallongeClient {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new(), ChallongeClientConfig::default())
    }

    /// Create a client from configuration, building its own HTTP client.
    pub fn from_config(config: ChallongeClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(user_agent) = config.user_agent.as_deref().map(str::trim) {
            if !user_agent.is_empty() {
                match HeaderValue::from_str(user_agent) {
                    Ok(value) => {
                        headers.insert(USER_AGENT, value);
                    }
                    Err(e) => warn!(error = %e, "ignoring invalid user agent"),
                }
            }
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ChallongeError::ClientBuild)?;
        Ok(Self::with_client(http, config))
    }

    /// Create a client using the provided [`reqwest::Client`].
    ///
    /// Use this when you need to configure timeouts, proxies, headers, etc.
    pub fn with_client(client: reqwest::Client, config: ChallongeClientConfig) -> Self {
        let resolver = ContentResolver::new(
            Arc::new(HttpLiveSource::new(client)),
            Arc::new(FsCacheStore::new(config.cache_dir)),
            Arc::new(HtmlBracketPageParser),
        )
        .with_freshness_header(config.freshness_header);
        Self { resolver }
    }

    /// Create a client from explicit collaborators.
    pub fn with_parts(
        live: Arc<dyn LiveSource>,
        cache: Arc<dyn CacheStore>,
        parser: Arc<dyn PageParser>,
    ) -> Self {
        Self {
            resolver: ContentResolver::new(live, cache, parser),
        }
    }

    pub fn resolver(&self) -> &ContentResolver {
        &self.resolver
    }

    /// Fetch the bracket of a tournament.
    ///
    /// `content` is a page the caller already has; when it is HTML it is
    /// used instead of contacting challonge.com.
    #[instrument(skip(self, content), fields(url = %request.url))]
    pub async fn get_tournament_bracket(
        &self,
        request: TournamentBracketRequest,
        content: Option<TournamentBracketContent>,
    ) -> Result<TournamentBracketResponse> {
        self.resolver.resolve(request, content).await
    }

    /// Fetch the bracket of a tournament, giving up once `cancel` completes.
    #[instrument(skip(self, content, cancel), fields(url = %request.url))]
    pub async fn get_tournament_bracket_until<C>(
        &self,
        request: TournamentBracketRequest,
        content: Option<TournamentBracketContent>,
        cancel: C,
    ) -> Result<TournamentBracketResponse>
    where
        C: Future<Output = ()>,
    {
        self.resolver.resolve_until(request, content, cancel).await
    }
}

impl Default for ChallongeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: ChallongeClientConfig =
            serde_json::from_str(r#"{"user_agent": "bracket-bot/1.0"}"#).unwrap();
        assert_eq!(config.user_agent.as_deref(), Some("bracket-bot/1.0"));
        assert_eq!(config.cache_dir, PathBuf::from("challonge-cache"));
        assert_eq!(config.freshness_header, FRESHNESS_HEADER);
    }

    #[test]
    fn from_config_accepts_blank_user_agent() {
        let config = ChallongeClientConfig {
            user_agent: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(ChallongeClient::from_config(config).is_ok());
    }

    #[tokio::test]
    async fn submitted_page_resolves_without_network() {
        let html = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/double_elimination.html"
        ))
        .unwrap();
        let cache = Arc::new(MemoryCacheStore::new());
        let client = ChallongeClient::with_parts(
            Arc::new(HttpLiveSource::default()),
            cache.clone(),
            Arc::new(HtmlBracketPageParser),
        );

        let response = client
            .get_tournament_bracket(
                TournamentBracketRequest::parse("https://challonge.com/de_cup").unwrap(),
                Some(TournamentBracketContent::html(html)),
            )
            .await
            .unwrap();

        assert_eq!(response.page_content.name, "Double Elimination Cup");
        assert!(!response.is_multi_stage());
        assert!(response.bracket.is_tournament().unwrap());
        let players = response.players();
        let names: Vec<&str> = players.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, ["Ada", "Bo", "Cy", "Di"]);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn cancelled_lookup_reports_cancelled() {
        let client = ChallongeClient::with_parts(
            Arc::new(HttpLiveSource::default()),
            Arc::new(MemoryCacheStore::new()),
            Arc::new(HtmlBracketPageParser),
        );
        let err = client
            .get_tournament_bracket_until(
                TournamentBracketRequest::parse("https://challonge.com/cup").unwrap(),
                None,
                std::future::ready(()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChallongeError::Cancelled));
    }
}
