use crate::api::FetchError;
use async_trait::async_trait;

/// One page of results for one batch of sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticlePage<A> {
    pub articles: Vec<A>,
    /// Total matches the API reports for the query, across all pages.
    pub total_results: u64,
}

/// Where the refresher gets its articles from.
///
/// The refresher calls `fetch` strictly sequentially and never inspects the
/// returned articles; it only forwards them.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use headliner::api::FetchError;
/// use headliner::refresher::{ArticleFetcher, ArticlePage};
///
/// struct Echo;
///
/// #[async_trait]
/// impl ArticleFetcher for Echo {
///     type Article = String;
///
///     async fn fetch(
///         &self,
///         source_ids: &[String],
///         page: u32,
///         _page_size: u32,
///     ) -> Result<ArticlePage<String>, FetchError> {
///         let articles = source_ids.iter().map(|id| format!("{id}@{page}")).collect();
///         Ok(ArticlePage { articles, total_results: source_ids.len() as u64 })
///     }
/// }
/// ```
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Opaque article type forwarded to the consumer.
    type Article: Send + 'static;

    /// Fetch `page` (1-based) of `page_size` articles published by `source_ids`.
    async fn fetch(
        &self,
        source_ids: &[String],
        page: u32,
        page_size: u32,
    ) -> Result<ArticlePage<Self::Article>, FetchError>;
}
