//! NewsAPI v2 client.
//!
//! - [`client`] - HTTP transport, parameter checks, error classification
//! - [`types`] - JSON payloads (`Article`, `Source`, `ApiError`, responses)
//! - [`constants`] - closed value sets for query parameters
//!
//! [`NewsApiClient`] implements [`crate::refresher::ArticleFetcher`], which is
//! how the refresher reaches the network.

pub mod client;
pub mod constants;
pub mod types;

pub use client::{
    EverythingParams, FetchError, NewsApiClient, SourcesParams, DEFAULT_BASE_URL,
    DEFAULT_TIMEOUT, MAX_PAGE_SIZE, MAX_SOURCES_PER_REQUEST,
};
pub use constants::{Category, Language, SortBy, UnknownValue};
pub use types::{ApiError, Article, ArticleSource, ArticlesResponse, Source, SourcesResponse};
