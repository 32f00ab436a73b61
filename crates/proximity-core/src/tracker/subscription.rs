use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::geo::LocationSample;

/// Default channel capacity between a producer and its subscription.
pub const DEFAULT_BUFFER: usize = 16;

enum Stop {
    /// Producer task spawned on the runtime.
    Task {
        cancel: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
    /// Producer lives elsewhere; the hook detaches it.
    Hook(Box<dyn FnOnce() + Send>),
}

/// A live stream of location samples.
///
/// Delivery is monotonic in timestamp: a sample older than the last one
/// handed out is dropped. [`Subscription::unsubscribe`] returns only once
/// the producer has stopped; dropping the subscription cancels it too.
pub struct Subscription {
    rx: mpsc::Receiver<LocationSample>,
    stop: Option<Stop>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Run `producer` as a task on the current tokio runtime.
    ///
    /// The producer owns the sending half; it is cancelled at the next
    /// await point once the subscription stops.
    pub fn spawn<F, Fut>(buffer: usize, producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<LocationSample>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer);
        let (cancel, cancelled) = oneshot::channel::<()>();
        let producer = producer(tx);
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled => {}
                _ = producer => {}
            }
        });
        Self {
            rx,
            stop: Some(Stop::Task { cancel, task }),
            last_timestamp: None,
        }
    }

    /// Wrap a receiver fed by an external producer.
    ///
    /// `detach` must guarantee the producer never sends again once it
    /// returns.
    pub fn from_receiver(
        rx: mpsc::Receiver<LocationSample>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            stop: Some(Stop::Hook(Box::new(detach))),
            last_timestamp: None,
        }
    }

    /// Next sample, or `None` once the producer is exhausted.
    pub async fn next(&mut self) -> Option<LocationSample> {
        loop {
            let sample = self.rx.recv().await?;
            if let Some(prev) = self.last_timestamp {
                if sample.timestamp < prev {
                    tracing::warn!(
                        timestamp = %sample.timestamp,
                        previous = %prev,
                        "dropping out-of-order sample"
                    );
                    continue;
                }
            }
            self.last_timestamp = Some(sample.timestamp);
            return Some(sample);
        }
    }

    /// Stop delivery and wait for the producer to finish.
    pub async fn unsubscribe(mut self) {
        self.rx.close();
        match self.stop.take() {
            Some(Stop::Task { cancel, task }) => {
                let _ = cancel.send(());
                if let Err(e) = task.await {
                    if !e.is_cancelled() {
                        tracing::warn!(error = %e, "location producer panicked");
                    }
                }
            }
            Some(Stop::Hook(detach)) => detach(),
            None => {}
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        match self.stop.take() {
            Some(Stop::Task { cancel, task }) => {
                let _ = cancel.send(());
                task.abort();
            }
            Some(Stop::Hook(detach)) => detach(),
            None => {}
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.stop.is_some())
            .field("last_timestamp", &self.last_timestamp)
            .finish()
    }
}
