//! Output side of a refresh run.
//!
//! Three bounded channels (articles, request ticks, errors) opened together by
//! [`channel`]. The producer half, [`Sink`], owns all three senders, so the
//! streams close together, exactly once, when the sink is dropped at the end of
//! the run. Capacity is one item per stream: a consumer that stops reading
//! stalls the refresher instead of letting fetched pages pile up in memory.

use crate::refresher::error::RefreshError;
use tokio::sync::mpsc;

const STREAM_CAPACITY: usize = 1;

/// Value sent on the tick stream for every fetch attempt.
pub const REQUEST_TICK: u32 = 1;

/// One item from any of the three streams.
#[derive(Debug)]
pub enum RefreshEvent<A> {
    /// Articles of one successful fetch, in API order.
    Articles(Vec<A>),
    /// A request was spent (sent before the fetch outcome is known).
    Tick(u32),
    Error(RefreshError),
}

/// Create the producer and consumer halves of a run's output.
pub fn channel<A>() -> (Sink<A>, RefreshStreams<A>) {
    let (articles_tx, articles_rx) = mpsc::channel(STREAM_CAPACITY);
    let (requests_tx, requests_rx) = mpsc::channel(STREAM_CAPACITY);
    let (errors_tx, errors_rx) = mpsc::channel(STREAM_CAPACITY);

    (
        Sink {
            articles: articles_tx,
            requests: requests_tx,
            errors: errors_tx,
        },
        RefreshStreams {
            articles: Some(articles_rx),
            requests: Some(requests_rx),
            errors: Some(errors_rx),
        },
    )
}

/// Producer half, owned by the refresh loop.
///
/// A send to a stream whose receiver was dropped is logged and skipped. Once
/// all three receivers are gone, [`Sink::is_closed`] reports it and the run stops.
#[derive(Debug)]
pub struct Sink<A> {
    articles: mpsc::Sender<Vec<A>>,
    requests: mpsc::Sender<u32>,
    errors: mpsc::Sender<RefreshError>,
}

impl<A> Sink<A> {
    pub async fn articles(&self, articles: Vec<A>) {
        if self.articles.send(articles).await.is_err() {
            tracing::warn!(stream = "articles", "Refresh stream receiver dropped");
        }
    }

    pub async fn tick(&self) {
        if self.requests.send(REQUEST_TICK).await.is_err() {
            tracing::warn!(stream = "requests", "Refresh stream receiver dropped");
        }
    }

    pub async fn error(&self, error: RefreshError) {
        if let Err(e) = self.errors.send(error).await {
            tracing::warn!(stream = "errors", error = %e.0, "Refresh stream receiver dropped");
        }
    }

    /// True when no receiver of any stream is left.
    pub fn is_closed(&self) -> bool {
        self.articles.is_closed() && self.requests.is_closed() && self.errors.is_closed()
    }
}

/// Consumer half: the article, tick and error receivers of one run.
///
/// Either read the streams individually (`articles`, `requests`, `errors`) or
/// let [`RefreshStreams::recv`] merge them. In both cases the end of the run is
/// observed as all three streams closing.
#[derive(Debug)]
pub struct RefreshStreams<A> {
    articles: Option<mpsc::Receiver<Vec<A>>>,
    requests: Option<mpsc::Receiver<u32>>,
    errors: Option<mpsc::Receiver<RefreshError>>,
}

enum Stream {
    Articles,
    Requests,
    Errors,
}

impl<A> RefreshStreams<A> {
    /// Take the three receivers for independent consumption.
    ///
    /// Returns `None` for a receiver already closed by [`RefreshStreams::recv`].
    pub fn split(
        self,
    ) -> (
        Option<mpsc::Receiver<Vec<A>>>,
        Option<mpsc::Receiver<u32>>,
        Option<mpsc::Receiver<RefreshError>>,
    ) {
        (self.articles, self.requests, self.errors)
    }

    /// Next item from whichever stream has one.
    ///
    /// Ticks are preferred over errors, errors over articles, so a tick always
    /// surfaces before the outcome of the fetch it accounts for. Returns `None`
    /// once every stream has closed.
    pub async fn recv(&mut self) -> Option<RefreshEvent<A>> {
        loop {
            let (stream, event) = tokio::select! {
                biased;

                tick = next(&mut self.requests), if self.requests.is_some() => {
                    (Stream::Requests, tick.map(RefreshEvent::Tick))
                }
                error = next(&mut self.errors), if self.errors.is_some() => {
                    (Stream::Errors, error.map(RefreshEvent::Error))
                }
                articles = next(&mut self.articles), if self.articles.is_some() => {
                    (Stream::Articles, articles.map(RefreshEvent::Articles))
                }
                else => return None,
            };

            match event {
                Some(event) => return Some(event),
                None => match stream {
                    Stream::Articles => self.articles = None,
                    Stream::Requests => self.requests = None,
                    Stream::Errors => self.errors = None,
                },
            }
        }
    }

    /// True once all three streams have closed and been drained.
    pub fn is_closed(&self) -> bool {
        self.articles.is_none() && self.requests.is_none() && self.errors.is_none()
    }
}

async fn next<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchError;

    #[tokio::test]
    async fn test_merged_stream_ends_after_all_close() {
        let (sink, mut streams) = channel::<&'static str>();

        let producer = tokio::spawn(async move {
            sink.tick().await;
            sink.articles(vec!["a", "b"]).await;
            sink.tick().await;
            sink.error(RefreshError::Fetch {
                batch: 0..1,
                page: 1,
                source: FetchError::HttpStatus(500),
            })
            .await;
        });

        let mut ticks = 0;
        let mut articles = Vec::new();
        let mut errors = 0;
        while let Some(event) = streams.recv().await {
            match event {
                RefreshEvent::Tick(n) => ticks += n,
                RefreshEvent::Articles(a) => articles.extend(a),
                RefreshEvent::Error(_) => errors += 1,
            }
        }
        producer.await.unwrap();

        assert_eq!(ticks, 2);
        assert_eq!(articles, vec!["a", "b"]);
        assert_eq!(errors, 1);
        assert!(streams.is_closed());
        assert!(streams.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_sink_survives_dropped_receivers() {
        let (sink, streams) = channel::<u8>();
        drop(streams);

        sink.tick().await;
        sink.articles(vec![1]).await;
        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_sink_open_while_any_receiver_lives() {
        let (sink, streams) = channel::<u8>();
        let (articles, requests, _errors) = streams.split();
        drop(articles);
        drop(requests);

        assert!(!sink.is_closed());
    }

    #[tokio::test]
    async fn test_split_streams_close_together() {
        let (sink, streams) = channel::<u8>();
        let (articles, requests, errors) = streams.split();
        let (mut articles, mut requests, mut errors) =
            (articles.unwrap(), requests.unwrap(), errors.unwrap());

        drop(sink);
        assert!(articles.recv().await.is_none());
        assert!(requests.recv().await.is_none());
        assert!(errors.recv().await.is_none());
    }
}
