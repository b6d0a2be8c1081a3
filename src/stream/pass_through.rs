//! In-memory push stream
//!
//! [`PassThrough`] is the producer half used by callers that generate chunks
//! themselves: whatever is written comes out of the attached adapter in the
//! same order.

use super::{FlowControl, Listener, PushStream};
use crate::error::BoxError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

enum Event<C> {
    Data(C),
    End,
    Error(BoxError),
}

struct Inner<C> {
    listener: Option<Listener<C>>,
    backlog: VecDeque<Event<C>>,
    paused: bool,
    flushing: bool,
    ended: bool,
    destroyed: bool,
    drain_wakers: Vec<Waker>,
}

impl<C> Inner<C> {
    /// Whether new events must queue behind the backlog instead of going
    /// straight to the listener.
    fn must_queue(&self) -> bool {
        self.paused || self.flushing || self.listener.is_none() || !self.backlog.is_empty()
    }
}

/// Push stream fed by explicit writes.
///
/// Writes made before an adapter is attached, or while the adapter has paused
/// the stream, wait in a backlog and are flushed in order later. Clones share
/// the same stream.
pub struct PassThrough<C> {
    inner: Arc<Mutex<Inner<C>>>,
}

impl<C> Clone for PassThrough<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> Default for PassThrough<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> PassThrough<C> {
    /// Create an open stream with no listener.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                listener: None,
                backlog: VecDeque::new(),
                paused: false,
                flushing: false,
                ended: false,
                destroyed: false,
                drain_wakers: Vec::new(),
            })),
        }
    }

    /// Write one chunk. Returns `false` once the stream is paused, ended or
    /// destroyed; the chunk is still kept unless the stream is closed.
    pub fn write(&self, chunk: C) -> bool {
        let listener = {
            let mut inner = self.inner.lock();
            if inner.ended || inner.destroyed {
                return false;
            }
            if inner.must_queue() {
                inner.backlog.push_back(Event::Data(chunk));
                return !inner.paused;
            }
            match inner.listener.clone() {
                Some(listener) => listener,
                None => return false,
            }
        };
        listener.data(chunk)
    }

    /// Signal that no more chunks will be written.
    pub fn end(&self) {
        let listener = {
            let mut inner = self.inner.lock();
            if inner.ended || inner.destroyed {
                return;
            }
            inner.ended = true;
            if inner.must_queue() {
                inner.backlog.push_back(Event::End);
                return;
            }
            inner.listener.clone()
        };
        if let Some(listener) = listener {
            listener.end();
        }
    }

    /// Fail the stream. The error overtakes any chunks still in the backlog.
    pub fn fail(&self, error: impl Into<BoxError>) {
        let error = error.into();
        let listener = {
            let mut inner = self.inner.lock();
            if inner.ended || inner.destroyed {
                return;
            }
            inner.ended = true;
            inner.backlog.clear();
            match inner.listener.clone() {
                Some(listener) => listener,
                None => {
                    inner.backlog.push_back(Event::Error(error));
                    return;
                }
            }
        };
        listener.error(error);
    }

    /// Whether the consumer side has asked the producer to stop.
    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    /// Whether the stream was destroyed, usually because its adapter was
    /// dropped early.
    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }

    /// Whether [`PassThrough::end`] or [`PassThrough::fail`] was called.
    pub fn is_ended(&self) -> bool {
        self.inner.lock().ended
    }

    /// Chunks and signals waiting to be handed to the listener.
    pub fn backlog(&self) -> usize {
        self.inner.lock().backlog.len()
    }

    /// Resolve once the stream is no longer paused.
    pub fn drained(&self) -> Drained<C> {
        Drained {
            stream: self.clone(),
        }
    }

    /// Hand backlog events to the listener until it pauses or the backlog
    /// runs dry. Only one caller flushes at a time.
    fn flush(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.flushing {
                return;
            }
            inner.flushing = true;
        }

        loop {
            let (event, listener) = {
                let mut inner = self.inner.lock();
                let listener = match inner.listener.clone() {
                    Some(listener) if !inner.paused && !inner.destroyed => listener,
                    _ => {
                        inner.flushing = false;
                        return;
                    }
                };
                let Some(event) = inner.backlog.pop_front() else {
                    inner.flushing = false;
                    return;
                };
                (event, listener)
            };
            match event {
                Event::Data(chunk) => {
                    listener.data(chunk);
                }
                Event::End => listener.end(),
                Event::Error(error) => listener.error(error),
            }
        }
    }
}

impl<C: Send> FlowControl for PassThrough<C> {
    fn pause(&self) {
        self.inner.lock().paused = true;
    }

    fn resume(&self) {
        let wakers = {
            let mut inner = self.inner.lock();
            inner.paused = false;
            std::mem::take(&mut inner.drain_wakers)
        };
        for waker in wakers {
            waker.wake();
        }
        self.flush();
    }

    fn destroy(&self) {
        let wakers = {
            let mut inner = self.inner.lock();
            inner.destroyed = true;
            inner.ended = true;
            inner.listener = None;
            inner.backlog.clear();
            std::mem::take(&mut inner.drain_wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }
}

impl<C: Send> PushStream<C> for PassThrough<C> {
    fn attach(&self, listener: Listener<C>) {
        self.inner.lock().listener = Some(listener);
        self.flush();
    }
}

impl<C> fmt::Debug for PassThrough<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PassThrough")
            .field("attached", &inner.listener.is_some())
            .field("backlog", &inner.backlog.len())
            .field("paused", &inner.paused)
            .field("ended", &inner.ended)
            .field("destroyed", &inner.destroyed)
            .finish()
    }
}

/// Future returned by [`PassThrough::drained`].
#[must_use = "futures do nothing unless polled"]
pub struct Drained<C> {
    stream: PassThrough<C>,
}

impl<C> Future for Drained<C> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut inner = self.stream.inner.lock();
        if !inner.paused || inner.destroyed {
            return Poll::Ready(());
        }
        inner.drain_wakers.push(cx.waker().clone());
        Poll::Pending
    }
}
