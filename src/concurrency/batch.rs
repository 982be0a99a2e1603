// src/concurrency/batch.rs
//
// Generic batch runner: drives a stream of items through an async handler
// with bounded parallelism, flushing one batch at a time.

use futures::stream::{FuturesUnordered, Stream, StreamExt};
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BulkError, BulkResult};

/// What a call to [`BatchRunner::run`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items handed to a worker
    pub dispatched: usize,
    /// Batches flushed
    pub batches: usize,
    /// Dispatch stopped early because the token was cancelled
    pub cancelled: bool,
}

/// Bounded-concurrency batch engine.
///
/// Items are read from the input into a buffer of `batch_size`. A full
/// buffer (or the tail of the input) is flushed: every item is dispatched to
/// its own tokio task, gated by a semaphore of `max_parallel` permits, and
/// the flush waits for all of them before the next batch is read.
///
/// The semaphore lives on the runner, so every run sharing one runner shares
/// the same parallelism bound.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    max_parallel: usize,
    limiter: Arc<Semaphore>,
}

impl BatchRunner {
    pub fn new(max_parallel: usize) -> Self {
        let max_parallel = max_parallel.max(1);
        Self {
            max_parallel,
            limiter: Arc::new(Semaphore::new(max_parallel)),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Run every item of `input` through `handler`.
    ///
    /// Exactly one of `on_success` / `on_error` is called per dispatched item,
    /// from the worker task. An `Err` in the input stream is an enumeration
    /// failure: nothing more is read or dispatched and it is returned once
    /// in-flight work has finished. Cancellation is checked before each
    /// dispatch; work already dispatched always runs to completion.
    pub async fn run<T, S, E, H, Fut, OnOk, OnErr>(
        &self,
        input: S,
        batch_size: usize,
        cancel: &CancellationToken,
        handler: H,
        on_success: OnOk,
        on_error: OnErr,
    ) -> BulkResult<RunSummary>
    where
        T: Send + 'static,
        S: Stream<Item = anyhow::Result<T>>,
        E: Send + 'static,
        H: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        OnOk: Fn() + Send + Sync + 'static,
        OnErr: Fn(E) + Send + Sync + 'static,
    {
        let batch_size = batch_size.max(1);
        let handler = Arc::new(handler);
        let on_success = Arc::new(on_success);
        let on_error = Arc::new(on_error);

        let mut input = pin!(input);
        let mut summary = RunSummary::default();
        let mut batch: Vec<T> = Vec::with_capacity(batch_size.min(4096));

        loop {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            match input.next().await {
                Some(Ok(item)) => {
                    batch.push(item);
                    if batch.len() >= batch_size {
                        self.flush(&mut batch, cancel, &handler, &on_success, &on_error, &mut summary)
                            .await?;
                    }
                }
                Some(Err(e)) => {
                    warn!(
                        "enumeration failed after {} dispatched item(s); {} buffered item(s) dropped",
                        summary.dispatched,
                        batch.len()
                    );
                    return Err(BulkError::Enumeration(e));
                }
                None => {
                    if !batch.is_empty() {
                        self.flush(&mut batch, cancel, &handler, &on_success, &on_error, &mut summary)
                            .await?;
                    }
                    break;
                }
            }
        }

        debug!(
            "batch run finished: dispatched={} batches={} cancelled={}",
            summary.dispatched, summary.batches, summary.cancelled
        );
        Ok(summary)
    }

    async fn flush<T, E, H, Fut, OnOk, OnErr>(
        &self,
        batch: &mut Vec<T>,
        cancel: &CancellationToken,
        handler: &Arc<H>,
        on_success: &Arc<OnOk>,
        on_error: &Arc<OnErr>,
        summary: &mut RunSummary,
    ) -> BulkResult<()>
    where
        T: Send + 'static,
        E: Send + 'static,
        H: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        OnOk: Fn() + Send + Sync + 'static,
        OnErr: Fn(E) + Send + Sync + 'static,
    {
        summary.batches += 1;
        debug!("flushing batch {} ({} items)", summary.batches, batch.len());

        let mut workers = FuturesUnordered::new();
        for item in batch.drain(..) {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = self.limiter.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                summary.cancelled = true;
                break;
            };
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let handler = handler.clone();
            let on_success = on_success.clone();
            let on_error = on_error.clone();
            summary.dispatched += 1;

            workers.push(tokio::spawn(async move {
                // Released on drop, whatever the handler does.
                let _permit = permit;
                match handler(item).await {
                    Ok(()) => on_success(),
                    Err(e) => on_error(e),
                }
            }));
        }

        let mut failed = None;
        while let Some(joined) = workers.next().await {
            if let Err(e) = joined {
                warn!("batch worker did not complete: {}", e);
                failed.get_or_insert_with(|| e.to_string());
            }
        }

        match failed {
            Some(msg) => Err(BulkError::Worker(msg)),
            None => Ok(()),
        }
    }
}
