use crate::api::constants::{Category, Language, SortBy};
use crate::api::types::{ApiError, Article, ArticlesResponse, SourcesResponse};
use crate::refresher::{ArticleFetcher, ArticlePage};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::StreamExt;
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// NewsAPI rejects `/everything` calls naming more than 20 sources.
pub const MAX_SOURCES_PER_REQUEST: usize = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
const MAX_QUERY_LEN: usize = 500;
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Failures of a single NewsAPI call.
///
/// [`FetchError::Api`] is the only variant carrying an upstream verdict; every
/// other variant is a transport, protocol, or local validation failure.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Non-2xx response whose body was not a NewsAPI error object
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Non-2xx response with a structured `{status, code, message}` body
    #[error("API error (HTTP {status}): {error}")]
    Api {
        status: u16,
        #[source]
        error: ApiError,
    },
    /// 2xx response whose body did not match the expected schema
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Parameters rejected before any request was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Insecure base URL {0}: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl(String),
}

impl FetchError {
    /// The upstream error object, if the API itself rejected the call.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            FetchError::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    /// True for failures below the API layer (network, timeout, bad framing).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_)
                | FetchError::Timeout(_)
                | FetchError::HttpStatus(_)
                | FetchError::Decode(_)
                | FetchError::ResponseTooLarge(_)
        )
    }
}

/// Query for `GET /sources`.
#[derive(Debug, Clone, Default)]
pub struct SourcesParams {
    pub category: Option<Category>,
    pub language: Option<Language>,
    /// Two-letter ISO-3166 country code.
    pub country: Option<String>,
}

impl SourcesParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(category) = self.category {
            query.push(("category", category.as_str().to_string()));
        }
        if let Some(language) = self.language {
            query.push(("language", language.as_str().to_string()));
        }
        if let Some(country) = &self.country {
            query.push(("country", country.to_ascii_lowercase()));
        }
        query
    }
}

/// Query for `GET /everything`.
///
/// At least one of `q`, `sources` or `domains` must be set. `page` and
/// `page_size` are left to the server defaults when `None`.
#[derive(Debug, Clone, Default)]
pub struct EverythingParams {
    pub q: Option<String>,
    pub sources: Vec<String>,
    pub domains: Vec<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub language: Option<Language>,
    pub sort_by: Option<SortBy>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl EverythingParams {
    /// Check the parameters against the documented endpoint limits.
    ///
    /// Every violation is reported in one [`FetchError::InvalidRequest`].
    pub fn validate(&self) -> Result<(), FetchError> {
        let mut problems = Vec::new();

        let has_query = self.q.as_deref().is_some_and(|q| !q.trim().is_empty());
        if !has_query && self.sources.is_empty() && self.domains.is_empty() {
            problems.push("one of q, sources or domains is required".to_string());
        }
        if let Some(q) = &self.q {
            if q.chars().count() > MAX_QUERY_LEN {
                problems.push(format!("q exceeds {MAX_QUERY_LEN} characters"));
            }
        }
        if self.sources.len() > MAX_SOURCES_PER_REQUEST {
            problems.push(format!(
                "at most {MAX_SOURCES_PER_REQUEST} sources per request (got {})",
                self.sources.len()
            ));
        }
        if self.page == Some(0) {
            problems.push("page must be at least 1".to_string());
        }
        if let Some(size) = self.page_size {
            if size == 0 || size > MAX_PAGE_SIZE {
                problems.push(format!("pageSize must be between 1 and {MAX_PAGE_SIZE} (got {size})"));
            }
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                problems.push("from must not be after to".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(FetchError::InvalidRequest(problems.join("; ")))
        }
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(q) = &self.q {
            query.push(("q", q.clone()));
        }
        if !self.sources.is_empty() {
            query.push(("sources", self.sources.join(",")));
        }
        if !self.domains.is_empty() {
            query.push(("domains", self.domains.join(",")));
        }
        if let Some(from) = self.from {
            query.push(("from", from.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(to) = self.to {
            query.push(("to", to.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(language) = self.language {
            query.push(("language", language.as_str().to_string()));
        }
        if let Some(sort_by) = self.sort_by {
            query.push(("sortBy", sort_by.as_str().to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            query.push(("pageSize", page_size.to_string()));
        }
        query
    }
}

/// Thin client over the NewsAPI v2 REST endpoints.
///
/// Performs exactly one HTTP request per call: no retries, no caching. The
/// API key travels in the `X-Api-Key` header and is never logged.
#[derive(Clone)]
pub struct NewsApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl std::fmt::Debug for NewsApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsApiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NewsApiClient {
    /// Build a client for `base_url` (e.g. [`DEFAULT_BASE_URL`]).
    ///
    /// # Errors
    ///
    /// [`FetchError::InsecureBaseUrl`] when the URL is not HTTPS, unless it
    /// points at localhost (used by test servers).
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: SecretString,
    ) -> Result<Self, FetchError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidRequest(format!("invalid base URL: {e}")))?;

        if parsed.scheme() != "https" {
            let is_localhost = parsed.scheme() == "http"
                && matches!(parsed.host_str(), Some("localhost" | "127.0.0.1"));
            if !is_localhost {
                tracing::error!(base_url = %base_url, "Rejecting non-HTTPS NewsAPI base URL");
                return Err(FetchError::InsecureBaseUrl(base_url.to_string()));
            }
            tracing::warn!(base_url = %base_url, "Using non-HTTPS NewsAPI base URL (localhost only)");
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /sources`: the publishers available to this key.
    pub async fn fetch_sources(&self, params: &SourcesParams) -> Result<SourcesResponse, FetchError> {
        self.get("sources", &params.to_query()).await
    }

    /// `GET /everything`: one page of articles matching `params`.
    pub async fn fetch_everything(
        &self,
        params: &EverythingParams,
    ) -> Result<ArticlesResponse, FetchError> {
        params.validate()?;
        self.get("everything", &params.to_query()).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, FetchError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, endpoint))
            .map_err(|e| FetchError::InvalidRequest(format!("invalid endpoint URL: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let mut key = HeaderValue::from_str(self.api_key.expose_secret())
            .map_err(|_| FetchError::InvalidRequest("API key is not a valid header value".into()))?;
        key.set_sensitive(true);

        tracing::debug!(endpoint = endpoint, params = query.len(), "NewsAPI request");

        // The deadline covers the body too; a stalled body must not block the caller.
        let request = async {
            let response = self
                .http
                .get(url)
                .header("X-Api-Key", key)
                .send()
                .await
                .map_err(FetchError::Network)?;
            let status = response.status();
            let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
            Ok::<_, FetchError>((status, bytes))
        };
        let (status, bytes) = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<ApiError>(&bytes) {
                Ok(error) => {
                    tracing::debug!(
                        endpoint = endpoint,
                        status = status.as_u16(),
                        code = %error.code,
                        "NewsAPI returned an error body"
                    );
                    FetchError::Api {
                        status: status.as_u16(),
                        error,
                    }
                }
                Err(_) => FetchError::HttpStatus(status.as_u16()),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ArticleFetcher for NewsApiClient {
    type Article = Article;

    async fn fetch(
        &self,
        source_ids: &[String],
        page: u32,
        page_size: u32,
    ) -> Result<ArticlePage<Article>, FetchError> {
        let params = EverythingParams {
            sources: source_ids.to_vec(),
            page: Some(page),
            page_size: Some(page_size),
            ..Default::default()
        };
        let response = self.fetch_everything(&params).await?;
        Ok(ArticlePage {
            articles: response.articles,
            total_results: response.total_results,
        })
    }
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
