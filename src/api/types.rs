//! Wire types for the NewsAPI v2 endpoints.
//!
//! Field names follow the JSON payloads (camelCase on the wire). NewsAPI sends
//! `null` for most descriptive fields, so anything that is not guaranteed by
//! the API is an `Option`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error body returned with any non-2xx response.
///
/// ```json
/// {"status": "error", "code": "apiKeyMissing", "message": "Your API key is missing."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code} - {message}")]
pub struct ApiError {
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Codes NewsAPI uses when the key has run out of requests or is being throttled.
    const QUOTA_CODES: [&'static str; 2] = ["rateLimited", "apiKeyExhausted"];

    /// True when the upstream rejected the call because of request quota.
    pub fn is_quota_exceeded(&self) -> bool {
        Self::QUOTA_CODES.contains(&self.code.as_str())
    }

    /// True when the key itself is missing, invalid or disabled.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self.code.as_str(),
            "apiKeyMissing" | "apiKeyInvalid" | "apiKeyDisabled"
        )
    }
}

/// A news publisher as listed by `/sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// The `source` object embedded in every article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    /// `null` for publishers NewsAPI has no source id for.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source: ArticleSource,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Truncated article body (NewsAPI cuts it at ~200 characters).
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub status: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesResponse {
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub articles: Vec<Article>,
}
