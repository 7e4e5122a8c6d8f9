//! Daily polling engine.
//!
//! A run validates its [`RefresherConfig`], partitions the source ids into
//! batches, and walks NewsAPI pages in passes: every batch at page `p`, then
//! every batch at page `p + 1`, with a sleep between passes. Before each fetch
//! the [`Gate`] checks the request budget and the end-of-day cutoff; once it
//! denies, the run terminates and its three streams close together.
//!
//! - [`config`] - raw configuration, defaults, validation
//! - [`batch`] - contiguous batches over the source id list
//! - [`gate`] - budget, cutoff, clock
//! - [`sink`] - the article, tick and error streams
//! - [`poller`] - the refresh loop itself
//!
//! # Example
//!
//! ```ignore
//! let client = NewsApiClient::new(http, DEFAULT_BASE_URL, api_key)?;
//! let mut handle = Refresher::new(client).spawn(settings.refresher);
//!
//! while let Some(event) = handle.streams.recv().await {
//!     match event {
//!         RefreshEvent::Articles(articles) => { /* ... */ }
//!         RefreshEvent::Tick(_) => {}
//!         RefreshEvent::Error(e) => tracing::warn!(error = %e, "Refresh error"),
//!     }
//! }
//! let summary = handle.join().await?;
//! ```

pub mod batch;
pub mod config;
mod error;
mod fetcher;
pub mod gate;
mod poller;
pub mod sink;

pub use batch::{Batch, Batches};
pub use config::{ConfigError, FieldViolation, RefresherConfig, ValidatedConfig};
pub use error::{ErrorKind, RefreshError};
pub use fetcher::{ArticleFetcher, ArticlePage};
pub use gate::{cutoff_for, Clock, Gate, StopReason, SystemClock};
pub use poller::{RefreshHandle, Refresher, RunSummary};
pub use sink::{channel, RefreshEvent, RefreshStreams, Sink, REQUEST_TICK};
