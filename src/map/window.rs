//! Cooperative sliding-window map.
//!
//! All in-flight transforms live inside the stream itself and are driven
//! whenever the consumer polls it, so no runtime is required.

use crate::concurrency::Concurrency;
use crate::error::{BoxError, Error, Result};
use crate::transform::Transform;
use futures::stream::{FusedStream, FuturesUnordered, TryStream};
use futures::{Stream, StreamExt as _};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// One scheduled transform tied to its source position.
pub(crate) struct Slot<Fut> {
    index: usize,
    future: Pin<Box<Fut>>,
}

impl<Fut> Slot<Fut> {
    pub(crate) fn new(index: usize, future: Fut) -> Self {
        Self {
            index,
            future: Box::pin(future),
        }
    }
}

impl<Fut, R, E> Future for Slot<Fut>
where
    Fut: Future<Output = Result<R, E>>,
    E: Into<BoxError>,
{
    type Output = (usize, Result<R, BoxError>);

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let index = self.index;
        self.future
            .as_mut()
            .poll(cx)
            .map(|result| (index, result.map_err(Into::into)))
    }
}

/// Completed slots waiting for their turn.
///
/// Values leave strictly in source order; a completion that is ahead of the
/// cursor stays here until every earlier position has been delivered.
pub(crate) struct DeliveryBuffer<R> {
    cursor: usize,
    completed: BTreeMap<usize, Result<R, BoxError>>,
}

impl<R> DeliveryBuffer<R> {
    pub(crate) fn new() -> Self {
        Self {
            cursor: 0,
            completed: BTreeMap::new(),
        }
    }

    /// Next position owed to the consumer.
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn len(&self) -> usize {
        self.completed.len()
    }

    pub(crate) fn insert(&mut self, index: usize, result: Result<R, BoxError>) {
        debug_assert!(index >= self.cursor, "slot {index} is behind the delivery cursor");
        self.completed.insert(index, result);
    }

    /// Remove the result at the cursor, if it has completed, and advance.
    pub(crate) fn take_next(&mut self) -> Option<(usize, Result<R, BoxError>)> {
        let index = self.cursor;
        let result = self.completed.remove(&index)?;
        self.cursor += 1;
        Some((index, result))
    }

    pub(crate) fn clear(&mut self) {
        self.completed.clear();
    }
}

/// Lazily consumed, order-preserving, concurrency-limited map.
///
/// Created by [`parallel_map`](crate::parallel_map) and friends. Nothing is
/// pulled from the source until the stream is first polled. Each poll tops up
/// the window and then waits for the slot at the next expected position; the
/// other slots keep running in the meantime.
#[must_use = "streams do nothing unless polled"]
pub struct ParallelMap<S, F>
where
    S: TryStream,
    F: Transform<S::Ok>,
{
    /// Dropped as soon as it is exhausted, fails or the stream finishes.
    source: Option<Pin<Box<S>>>,
    transform: F,
    concurrency: Concurrency,
    in_flight: FuturesUnordered<Slot<F::Future>>,
    buffer: DeliveryBuffer<F::Ok>,
    next_index: usize,
    source_done: bool,
    source_error: Option<(usize, BoxError)>,
    finished: bool,
}

impl<S, F> Unpin for ParallelMap<S, F>
where
    S: TryStream,
    F: Transform<S::Ok>,
{
}

impl<S, F> ParallelMap<S, F>
where
    S: TryStream,
    S::Error: Into<BoxError>,
    F: Transform<S::Ok>,
{
    pub(crate) fn new(concurrency: Concurrency, transform: F, source: S) -> Self {
        Self {
            source: Some(Box::pin(source)),
            transform,
            concurrency,
            in_flight: FuturesUnordered::new(),
            buffer: DeliveryBuffer::new(),
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

    /// Slots pulled from the source but not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len() + self.buffer.len()
    }

    /// Pull from the source and start transforms until the window is full
    /// or the source has nothing ready.
    fn top_up(&mut self, cx: &mut Context<'_>) {
        while !self.source_done && self.concurrency.has_capacity(self.in_flight()) {
            let Some(source) = self.source.as_mut() else {
                break;
            };
            match source.as_mut().try_poll_next(cx) {
                Poll::Ready(Some(Ok(item))) => {
                    let index = self.next_index;
                    self.next_index += 1;
                    log::trace!("scheduling slot {index} ({} in flight)", self.in_flight());
                    let future = self.transform.call(item);
                    self.in_flight.push(Slot::new(index, future));
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
        self.in_flight.clear();
        self.buffer.clear();
    }
}

impl<S, F> Stream for ParallelMap<S, F>
where
    S: TryStream,
    S::Error: Into<BoxError>,
    F: Transform<S::Ok>,
{
    type Item = Result<F::Ok>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        this.top_up(cx);

        // Drive every slot; early finishers park in the delivery buffer.
        while let Poll::Ready(Some((index, result))) = this.in_flight.poll_next_unpin(cx) {
            this.buffer.insert(index, result);
        }

        if let Some((index, result)) = this.buffer.take_next() {
            return match result {
                Ok(value) => {
                    log::trace!("delivering slot {index}");
                    Poll::Ready(Some(Ok(value)))
                }
                Err(source) => {
                    log::debug!(
                        "transform failed for slot {index}, abandoning {} slots",
                        this.in_flight()
                    );
                    this.finish();
                    Poll::Ready(Some(Err(Error::Transform { index, source })))
                }
            };
        }

        let cursor = this.buffer.cursor();
        if matches!(&this.source_error, Some((index, _)) if *index == cursor) {
            if let Some((index, source)) = this.source_error.take() {
                this.finish();
                return Poll::Ready(Some(Err(Error::Source { index, source })));
            }
        }

        if this.source_done && this.in_flight() == 0 {
            this.finished = true;
            return Poll::Ready(None);
        }

        Poll::Pending
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let pending = self.in_flight();
        if self.source_done {
            return (0, Some(pending));
        }
        let upper = match &self.source {
            Some(source) => source.size_hint().1,
            None => Some(0),
        };
        (0, upper.and_then(|upper| upper.checked_add(pending)))
    }
}

impl<S, F> FusedStream for ParallelMap<S, F>
where
    S: TryStream,
    S::Error: Into<BoxError>,
    F: Transform<S::Ok>,
{
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl<S, F> Drop for ParallelMap<S, F>
where
    S: TryStream,
    F: Transform<S::Ok>,
{
    fn drop(&mut self) {
        if !self.finished {
            let outstanding = self.in_flight.len() + self.buffer.len();
            if outstanding > 0 || !self.source_done {
                log::debug!("parallel map dropped early, releasing source and {outstanding} slots");
            }
        }
    }
}

impl<S, F> fmt::Debug for ParallelMap<S, F>
where
    S: TryStream,
    F: Transform<S::Ok>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelMap")
            .field("concurrency", &self.concurrency)
            .field("running", &self.in_flight.len())
            .field("buffered", &self.buffer.len())
            .field("next_index", &self.next_index)
            .field("source_done", &self.source_done)
            .field("finished", &self.finished)
            .finish()
    }
}
