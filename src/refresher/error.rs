use crate::api::FetchError;
use crate::refresher::config::ConfigError;
use std::ops::Range;
use thiserror::Error;

/// Coarse classification of a [`RefreshError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal: the run never started fetching.
    Configuration,
    /// Recoverable: one batch failed, the run carried on.
    Fetch,
}

/// An error delivered on the refresher's error stream.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("invalid refresher configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// One fetch attempt failed; `batch` indexes into the configured source ids.
    #[error("fetching sources {}..{} on page {page} failed: {source}", .batch.start, .batch.end)]
    Fetch {
        batch: Range<usize>,
        page: u32,
        #[source]
        source: FetchError,
    },
}

impl RefreshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RefreshError::Configuration(_) => ErrorKind::Configuration,
            RefreshError::Fetch { .. } => ErrorKind::Fetch,
        }
    }

    /// Source-id range of the failed batch, for fetch errors.
    pub fn batch(&self) -> Option<Range<usize>> {
        match self {
            RefreshError::Fetch { batch, .. } => Some(batch.clone()),
            RefreshError::Configuration(_) => None,
        }
    }

    pub fn page(&self) -> Option<u32> {
        match self {
            RefreshError::Fetch { page, .. } => Some(*page),
            RefreshError::Configuration(_) => None,
        }
    }

    /// The collaborator's failure, for fetch errors.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            RefreshError::Fetch { source, .. } => Some(source),
            RefreshError::Configuration(_) => None,
        }
    }
}
