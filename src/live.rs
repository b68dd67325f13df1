use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::error::{ChallongeError, Result};

/// Header Challonge sets on pages it served from its own render cache; a
/// response without it is not a usable bracket page.
pub const FRESHNESS_HEADER: &str = "x-challonge-cache-id";

/// Something that can fetch a bracket page from the live site.
#[async_trait]
pub trait LiveSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<LiveResponse>;
}

/// Response from a [`LiveSource`]; the body is only read on demand.
pub struct LiveResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body: Box<dyn LiveBody>,
}

impl LiveResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl LiveBody + 'static) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Buffer the whole body.
    pub async fn bytes(self) -> Result<Vec<u8>> {
        self.body.bytes().await
    }
}

/// A response body that has not been read yet.
#[async_trait]
pub trait LiveBody: Send {
    async fn bytes(self: Box<Self>) -> Result<Vec<u8>>;
}

#[async_trait]
impl LiveBody for Vec<u8> {
    async fn bytes(self: Box<Self>) -> Result<Vec<u8>> {
        Ok(*self)
    }
}

#[async_trait]
impl LiveBody for reqwest::Response {
    async fn bytes(self: Box<Self>) -> Result<Vec<u8>> {
        let url = self.url().to_string();
        let body = (*self)
            .bytes()
            .await
            .map_err(|source| ChallongeError::ResponseBody { url, source })?;
        Ok(body.to_vec())
    }
}

/// Fetches pages over HTTP with a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpLiveSource {
    http: reqwest::Client,
}

impl HttpLiveSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LiveSource for HttpLiveSource {
    async fn fetch(&self, url: &Url) -> Result<LiveResponse> {
        debug!(%url, "fetching page");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ChallongeError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        let headers = response.headers().clone();
        debug!(%url, %status, "received response");
        Ok(LiveResponse::new(status, headers, response))
    }
}
