//! Sliding-window map with one tokio task per slot.
//!
//! The in-flight set is a queue of completion channels ordered by source
//! position. The consumer only ever waits on the front channel; every task
//! writes its own result whenever it finishes.

use crate::concurrency::Concurrency;
use crate::error::{BoxError, Error, Result};
use crate::task::SlotTask;
use crate::transform::Transform;
use futures::stream::{FusedStream, TryStream};
use futures::Stream;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

type SlotResult<R> = std::result::Result<R, BoxError>;

/// Order-preserving map whose transforms run as spawned tokio tasks.
///
/// Created by [`parallel_map_spawned`](crate::parallel_map_spawned). Must be
/// polled inside a tokio runtime. Dropping the stream aborts every task that
/// has not been delivered yet.
#[must_use = "streams do nothing unless polled"]
pub struct SpawnedParallelMap<S, F>
where
    S: TryStream,
    F: Transform<S::Ok>,
{
    /// Dropped as soon as it is exhausted, fails or the stream finishes.
    source: Option<Pin<Box<S>>>,
    transform: F,
    concurrency: Concurrency,
    in_flight: VecDeque<SlotTask<SlotResult<F::Ok>>>,
    next_index: usize,
    source_done: bool,
    source_error: Option<(usize, BoxError)>,
    finished: bool,
}

impl<S, F> Unpin for SpawnedParallelMap<S, F>
where
    S: TryStream,
    F: Transform<S::Ok>,
{
}

impl<S, F> SpawnedParallelMap<S, F>
where
    S: TryStream,
    S::Error: Into<BoxError>,
    F: Transform<S::Ok>,
    F::Future: Send + 'static,
    F::Ok: Send + 'static,
    F::Error: Send + 'static,
{
    pub(crate) fn new(concurrency: Concurrency, transform: F, source: S) -> Self {
        Self {
            source: Some(Box::pin(source)),
            transform,
            concurrency,
            in_flight: VecDeque::new(),
            next_index: 0,
            source_done: false,
            source_error: None,
            finished: false,
        }
    }

    /// The configured limit.
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Tasks spawned but not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn top_up(&mut self, cx: &mut Context<'_>) {
        while !self.source_done && self.concurrency.has_capacity(self.in_flight.len()) {
            let Some(source) = self.source.as_mut() else {
                break;
            };
            match source.as_mut().try_poll_next(cx) {
                Poll::Ready(Some(Ok(item))) => {
                    let index = self.next_index;
                    self.next_index += 1;
                    let future = self.transform.call(item);
                    log::trace!("spawning slot {index} ({} in flight)", self.in_flight.len());
                    self.in_flight.push_back(SlotTask::spawn(index, async move {
                        future.await.map_err(Into::into)
                    }));
                }
                Poll::Ready(Some(Err(e))) => {
                    log::debug!("source failed after {} items", self.next_index);
                    self.source_error = Some((self.next_index, e.into()));
                    self.source_done = true;
                    self.source = None;
                }
                Poll::Ready(None) => {
                    log::debug!("source exhausted after {} items", self.next_index);
                    self.source_done = true;
                    self.source = None;
                }
                Poll::Pending => break,
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.source_done = true;
        self.source = None;
        // Dropping the slots aborts their tasks.
        self.in_flight.clear();
    }
}

impl<S, F> Stream for SpawnedParallelMap<S, F>
where
    S: TryStream,
    S::Error: Into<BoxError>,
    F: Transform<S::Ok>,
    F::Future: Send + 'static,
    F::Ok: Send + 'static,
    F::Error: Send + 'static,
{
    type Item = Result<F::Ok>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        this.top_up(cx);

        if let Some(head) = this.in_flight.front_mut() {
            let index = head.index();
            let outcome = match Pin::new(head).poll(cx) {
                Poll::Ready(outcome) => outcome,
                Poll::Pending => return Poll::Pending,
            };
            this.in_flight.pop_front();
            return match outcome {
                Ok(Ok(value)) => {
                    log::trace!("delivering slot {index}");
                    Poll::Ready(Some(Ok(value)))
                }
                Ok(Err(source)) => {
                    log::debug!(
                        "transform failed for slot {index}, aborting {} tasks",
                        this.in_flight.len()
                    );
                    this.finish();
                    Poll::Ready(Some(Err(Error::Transform { index, source })))
                }
                Err(lost) => {
                    log::debug!("slot {index} lost its task");
                    this.finish();
                    Poll::Ready(Some(Err(lost)))
                }
            };
        }

        if let Some((index, source)) = this.source_error.take() {
            this.finish();
            return Poll::Ready(Some(Err(Error::Source { index, source })));
        }

        if this.source_done {
            this.finished = true;
            return Poll::Ready(None);
        }

        Poll::Pending
    }
}

impl<S, F> FusedStream for SpawnedParallelMap<S, F>
where
    S: TryStream,
    S::Error: Into<BoxError>,
    F: Transform<S::Ok>,
    F::Future: Send + 'static,
    F::Ok: Send + 'static,
    F::Error: Send + 'static,
{
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl<S, F> Drop for SpawnedParallelMap<S, F>
where
    S: TryStream,
    F: Transform<S::Ok>,
{
    fn drop(&mut self) {
        if !self.finished && !self.in_flight.is_empty() {
            log::debug!(
                "spawned parallel map dropped early, aborting {} tasks",
                self.in_flight.len()
            );
        }
    }
}

impl<S, F> fmt::Debug for SpawnedParallelMap<S, F>
where
    S: TryStream,
    F: Transform<S::Ok>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnedParallelMap")
            .field("concurrency", &self.concurrency)
            .field("in_flight", &self.in_flight.len())
            .field("next_index", &self.next_index)
            .field("source_done", &self.source_done)
            .field("finished", &self.finished)
            .finish()
    }
}
