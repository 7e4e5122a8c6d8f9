use crate::refresher::batch::Batches;
use crate::refresher::config::RefresherConfig;
use crate::refresher::error::RefreshError;
use crate::refresher::fetcher::ArticleFetcher;
use crate::refresher::gate::{cutoff_for, Clock, Gate, StopReason, SystemClock};
use crate::refresher::sink::{self, RefreshStreams, Sink};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// What a finished run did, returned when the refresh task completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Fetch calls made (equals ticks emitted).
    pub requests: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Articles forwarded on the article stream.
    pub articles: u64,
    /// Passes that visited every batch.
    pub passes: u64,
    /// Page the run was on when it stopped; `None` if it never started.
    pub page: Option<u32>,
    pub stop: StopReason,
}

impl RunSummary {
    fn new(page: Option<u32>) -> Self {
        Self {
            requests: 0,
            succeeded: 0,
            failed: 0,
            articles: 0,
            passes: 0,
            page,
            stop: StopReason::InvalidConfiguration,
        }
    }
}

/// Polls an [`ArticleFetcher`] in passes over batched source ids until the
/// request budget runs out, the daily cutoff passes, or the run is cancelled.
///
/// A run is `Validating → Running → Terminated`. Validation failure sends the
/// single configuration error and terminates without fetching. While running,
/// each fetch is preceded by a gate check and a request tick; failures are
/// reported and the pass continues with the next batch. After a full pass the
/// page advances and the refresher sleeps before the next pass.
pub struct Refresher<F, C = SystemClock> {
    fetcher: F,
    clock: C,
}

impl<F: ArticleFetcher> Refresher<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            clock: SystemClock,
        }
    }
}

impl<F, C> Refresher<F, C>
where
    F: ArticleFetcher,
    C: Clock,
{
    /// Replace the wall clock used for the cutoff check.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Refresher<F, C2> {
        Refresher {
            fetcher: self.fetcher,
            clock,
        }
    }

    /// Run on a new tokio task; the streams and the task handle are returned.
    pub fn spawn(self, config: RefresherConfig) -> RefreshHandle<F::Article>
    where
        F: 'static,
        C: 'static,
    {
        let (sink, streams) = sink::channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(&config, sink, token).await });

        RefreshHandle {
            streams,
            task,
            cancel,
        }
    }

    /// Drive one complete run, writing into `sink`.
    ///
    /// `config` is validated here and never modified. The sink is dropped on
    /// return, which closes all three streams together.
    pub async fn run(
        &self,
        config: &RefresherConfig,
        sink: Sink<F::Article>,
        cancel: CancellationToken,
    ) -> RunSummary {
        let config = match config.validate() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Refresher configuration rejected");
                sink.error(RefreshError::Configuration(e)).await;
                return RunSummary::new(None);
            }
        };

        let started = self.clock.now();
        let mut gate = Gate::new(
            config.remaining_requests(),
            cutoff_for(started, config.last_moment_minutes()),
            cancel.clone(),
        );
        let mut page = config.start_page();
        let mut summary = RunSummary::new(Some(page));

        tracing::info!(
            sources = config.source_ids().len(),
            batch_size = config.batch_size(),
            page_size = config.page_size(),
            budget = gate.remaining(),
            start_page = page,
            cutoff = %gate.cutoff(),
            "Refresher started"
        );

        let stop = 'run: loop {
            for batch in Batches::new(config.source_ids(), config.batch_size()) {
                if sink.is_closed() {
                    break 'run StopReason::ConsumerGone;
                }
                if let Err(reason) = gate.may_proceed(self.clock.now()) {
                    break 'run reason;
                }

                gate.spend();
                summary.requests += 1;
                sink.tick().await;

                tracing::debug!(
                    page = page,
                    batch = ?batch.range(),
                    remaining = gate.remaining(),
                    "Fetching batch"
                );

                match self.fetcher.fetch(batch.ids, page, config.page_size()).await {
                    Ok(result) => {
                        summary.succeeded += 1;
                        summary.articles += result.articles.len() as u64;
                        tracing::debug!(
                            page = page,
                            batch = ?batch.range(),
                            articles = result.articles.len(),
                            total_results = result.total_results,
                            "Batch fetched"
                        );
                        sink.articles(result.articles).await;
                    }
                    Err(source) => {
                        summary.failed += 1;
                        tracing::warn!(
                            page = page,
                            batch = ?batch.range(),
                            error = %source,
                            "Batch fetch failed, continuing with next batch"
                        );
                        sink.error(RefreshError::Fetch {
                            batch: batch.range(),
                            page,
                            source,
                        })
                        .await;
                    }
                }
            }

            summary.passes += 1;
            page = page.saturating_add(1);
            summary.page = Some(page);

            // Permanent stop conditions end the run before the sleep.
            if sink.is_closed() {
                break 'run StopReason::ConsumerGone;
            }
            if let Err(reason @ (StopReason::BudgetExhausted | StopReason::Cancelled)) =
                gate.may_proceed(self.clock.now())
            {
                break 'run reason;
            }

            tracing::info!(
                next_page = page,
                remaining = gate.remaining(),
                sleep_secs = config.sleep().as_secs(),
                "Pass complete, sleeping"
            );

            tokio::select! {
                _ = cancel.cancelled() => break 'run StopReason::Cancelled,
                _ = tokio::time::sleep(config.sleep()) => {}
            }
        };

        summary.stop = stop;
        tracing::info!(
            stop = %stop,
            requests = summary.requests,
            succeeded = summary.succeeded,
            failed = summary.failed,
            articles = summary.articles,
            passes = summary.passes,
            "Refresher terminated"
        );
        summary
    }
}

/// A spawned run: its output streams, cancellation, and completion.
pub struct RefreshHandle<A> {
    pub streams: RefreshStreams<A>,
    task: JoinHandle<RunSummary>,
    cancel: CancellationToken,
}

impl<A> RefreshHandle<A> {
    /// Ask the run to stop at its next gate check or during its sleep.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to finish.
    ///
    /// Drops the streams first. A run with no consumer left stops at its next
    /// gate check with [`StopReason::ConsumerGone`], so joining early costs at
    /// most the fetch already in flight.
    pub async fn join(self) -> Result<RunSummary, JoinError> {
        drop(self.streams);
        self.task.await
    }
}
