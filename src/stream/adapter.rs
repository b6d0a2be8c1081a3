//! Pull-based adapter over a push stream
//!
//! Two queues meet here: chunks pushed but not yet pulled, and pull requests
//! made while no chunk was queued. At most one of them is non-empty at any
//! time.

use super::{FlowControl, PushStream};
use crate::config::AdapterConfig;
use crate::error::{BoxError, Error, Result};
use crate::source::IntoSource;
use futures::channel::oneshot;
use futures::stream::FusedStream;
use futures::Stream;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

/// What a single pull resolves to: a chunk, a failure, or end of stream.
type Delivery<C> = Option<Result<C>>;

struct State<C> {
    chunks: VecDeque<C>,
    requests: VecDeque<oneshot::Sender<Delivery<C>>>,
    error: Option<Error>,
    paused: bool,
    ended: bool,
    failed: bool,
}

impl<C> State<C> {
    fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
            requests: VecDeque::new(),
            error: None,
            paused: false,
            ended: false,
            failed: false,
        }
    }

    fn is_closed(&self) -> bool {
        self.ended || self.failed
    }
}

struct Shared<C> {
    state: Mutex<State<C>>,
    flow: Arc<dyn FlowControl>,
    /// Pause state last signalled to `flow`. Held while signalling, so pause
    /// and resume reach the stream one caller at a time.
    signalled: ReentrantMutex<Cell<bool>>,
    config: AdapterConfig,
}

impl<C> Shared<C> {
    /// Hand a chunk to the oldest waiting request, or queue it.
    /// Returns whether the producer may keep pushing.
    fn push(&self, chunk: C) -> bool {
        {
            let mut state = self.state.lock();
            if state.is_closed() {
                return false;
            }

            let mut delivery = Some(Ok(chunk));
            while let Some(request) = state.requests.pop_front() {
                match request.send(delivery) {
                    Ok(()) => return true,
                    Err(returned) => delivery = returned,
                }
            }
            if let Some(Ok(chunk)) = delivery {
                state.chunks.push_back(chunk);
            }

            if state.paused {
                return false;
            }
            if state.chunks.len() < self.config.high_water_mark {
                return true;
            }
            state.paused = true;
        }

        self.sync_flow();
        false
    }

    /// Signal the stream until its pause state matches `state.paused`.
    ///
    /// Never called with the state lock held. Re-entrant: a resumed stream
    /// may push straight back into the adapter from inside `resume`.
    fn sync_flow(&self) {
        let signalled = self.signalled.lock();
        loop {
            let paused = self.state.lock().paused;
            if paused == signalled.get() {
                return;
            }
            signalled.set(paused);
            if paused {
                log::trace!("adapter queue full, pausing stream");
                self.flow.pause();
            } else {
                log::trace!("adapter queue drained, resuming stream");
                self.flow.resume();
            }
        }
    }

    fn end(&self) {
        let requests = {
            let mut state = self.state.lock();
            if state.is_closed() {
                return;
            }
            state.ended = true;
            std::mem::take(&mut state.requests)
        };
        log::debug!("push stream ended");
        for request in requests {
            let _ = request.send(None);
        }
    }

    /// Fail the oldest live request, or keep the error for the next pull.
    /// Queued chunks are discarded.
    fn fail(&self, error: Error) {
        let requests = {
            let mut state = self.state.lock();
            if state.is_closed() {
                return;
            }
            state.failed = true;
            state.chunks.clear();

            let mut requests = std::mem::take(&mut state.requests);
            let mut error = Some(error);
            while let Some(e) = error.take() {
                match requests.pop_front() {
                    Some(request) => {
                        if let Err(Some(Err(returned))) = request.send(Some(Err(e))) {
                            error = Some(returned);
                        }
                    }
                    None => state.error = Some(e),
                }
            }
            requests
        };
        log::debug!("push stream failed");
        for request in requests {
            let _ = request.send(None);
        }
    }

    /// Take the next chunk if one is queued, otherwise register a request.
    fn request(&self) -> NextChunk<C> {
        let (chunk, resume) = {
            let mut state = self.state.lock();
            if let Some(error) = state.error.take() {
                return NextChunk::ready(Some(Err(error)));
            }
            let Some(chunk) = state.chunks.pop_front() else {
                if state.is_closed() {
                    return NextChunk::ready(None);
                }
                let (tx, rx) = oneshot::channel();
                state.requests.push_back(tx);
                return NextChunk::waiting(rx);
            };
            let resume = state.paused
                && !state.is_closed()
                && state.chunks.len() < self.config.low_water_mark;
            if resume {
                state.paused = false;
            }
            (chunk, resume)
        };

        if resume {
            self.sync_flow();
        }
        NextChunk::ready(Some(Ok(chunk)))
    }
}

impl<C> Drop for Shared<C> {
    fn drop(&mut self) {
        if !self.state.get_mut().is_closed() {
            log::debug!("adapter dropped before the stream ended, destroying it");
            self.flow.destroy();
        }
    }
}

//────────────────────────────────────────────────────────────────────────────
// Listener – producer-facing side
//────────────────────────────────────────────────────────────────────────────

/// Receives the events of a push stream on behalf of its adapter.
///
/// Holds a weak reference: once every [`FromStream`] handle is gone, events
/// are discarded and [`Listener::data`] returns `false`.
pub struct Listener<C> {
    shared: Weak<Shared<C>>,
}

impl<C> Clone for Listener<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C> Listener<C> {
    /// Push one chunk. Returns `false` when the producer should stop until it
    /// is resumed.
    pub fn data(&self, chunk: C) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.push(chunk),
            None => false,
        }
    }

    /// Signal end of stream.
    pub fn end(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.end();
        }
    }

    /// Signal a stream failure.
    pub fn error(&self, error: impl Into<BoxError>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.fail(Error::Stream(error.into()));
        }
    }

    /// Whether the adapter is still alive.
    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl<C> fmt::Debug for Listener<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("attached", &self.is_attached())
            .finish()
    }
}

//────────────────────────────────────────────────────────────────────────────
// NextChunk – one pull request
//────────────────────────────────────────────────────────────────────────────

enum Pending<C> {
    Ready(Option<Delivery<C>>),
    Waiting(oneshot::Receiver<Delivery<C>>),
}

/// Future for a single pull from a [`FromStream`].
///
/// Resolves to `None` at end of stream.
#[must_use = "futures do nothing unless polled"]
pub struct NextChunk<C> {
    pending: Pending<C>,
}

impl<C> NextChunk<C> {
    fn ready(delivery: Delivery<C>) -> Self {
        Self {
            pending: Pending::Ready(Some(delivery)),
        }
    }

    fn waiting(receiver: oneshot::Receiver<Delivery<C>>) -> Self {
        Self {
            pending: Pending::Waiting(receiver),
        }
    }
}

impl<C> Unpin for NextChunk<C> {}

impl<C> Future for NextChunk<C> {
    type Output = Delivery<C>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.pending {
            Pending::Ready(delivery) => Poll::Ready(delivery.take().flatten()),
            // A dropped sender means the adapter shut down without a value.
            Pending::Waiting(receiver) => Pin::new(receiver).poll(cx).map(|r| r.unwrap_or(None)),
        }
    }
}

//────────────────────────────────────────────────────────────────────────────
// FromStream – consumer-facing side
//────────────────────────────────────────────────────────────────────────────

/// Lazy pull-based view of a push stream.
///
/// Yields chunks in push order, ends when the stream ends and yields the
/// stream's error as an `Err` item before ending. Clones share the same
/// queues; dropping the last one destroys a stream that has not ended.
#[must_use = "streams do nothing unless polled"]
pub struct FromStream<C> {
    shared: Arc<Shared<C>>,
    pending: Option<NextChunk<C>>,
    done: bool,
}

/// Adapt `stream` with the default backpressure thresholds.
pub fn from_stream<C, S>(stream: S) -> FromStream<C>
where
    S: PushStream<C> + 'static,
{
    FromStream::new(stream, AdapterConfig::default())
}

/// Adapt `stream` with custom backpressure thresholds.
pub fn from_stream_with<C, S>(stream: S, config: AdapterConfig) -> Result<FromStream<C>>
where
    S: PushStream<C> + 'static,
{
    config.validate()?;
    Ok(FromStream::new(stream, config))
}

impl<C> FromStream<C> {
    fn new<S>(stream: S, config: AdapterConfig) -> Self
    where
        S: PushStream<C> + 'static,
    {
        let stream = Arc::new(stream);
        let flow: Arc<dyn FlowControl> = stream.clone();
        let shared = Arc::new(Shared {
            state: Mutex::new(State::new()),
            flow,
            signalled: ReentrantMutex::new(Cell::new(false)),
            config,
        });
        stream.attach(Listener {
            shared: Arc::downgrade(&shared),
        });
        Self {
            shared,
            pending: None,
            done: false,
        }
    }

    /// Pull the next chunk. Several pulls may be outstanding at once; they
    /// are satisfied in the order they were made.
    pub fn next_chunk(&self) -> NextChunk<C> {
        self.shared.request()
    }

    /// Chunks pushed but not yet pulled.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().chunks.len()
    }

    /// Whether the adapter has paused the stream.
    pub fn is_paused(&self) -> bool {
        self.shared.state.lock().paused
    }
}

impl<C> Clone for FromStream<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            pending: None,
            done: self.done,
        }
    }
}

impl<C> Unpin for FromStream<C> {}

impl<C> Stream for FromStream<C> {
    type Item = Result<C>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }
        let request = this.pending.get_or_insert_with(|| this.shared.request());
        match Pin::new(request).poll(cx) {
            Poll::Ready(delivery) => {
                this.pending = None;
                if !matches!(delivery, Some(Ok(_))) {
                    this.done = true;
                }
                Poll::Ready(delivery)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<C> FusedStream for FromStream<C> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl<C> IntoSource for FromStream<C> {
    type Item = C;
    type Error = Error;
    type Source = Self;

    fn into_source(self) -> Self {
        self
    }
}

impl<C> fmt::Debug for FromStream<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("FromStream")
            .field("queued", &state.chunks.len())
            .field("waiting", &state.requests.len())
            .field("paused", &state.paused)
            .field("ended", &state.ended)
            .field("failed", &state.failed)
            .finish()
    }
}
