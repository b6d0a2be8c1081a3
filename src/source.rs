//! Item sources accepted by the combinator.
//!
//! Every source is turned into a fallible pull stream. In-memory sequences
//! never fail, lazily pulled streams may, and push-based streams go through
//! [`from_stream`](crate::stream::from_stream) first.

use crate::error::BoxError;
use futures::Stream;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::ops::Range;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Conversion into a pull-based, possibly failing, stream of items.
pub trait IntoSource {
    /// Items handed to the transform
    type Item;
    /// Error reported when pulling fails
    type Error: Into<BoxError>;
    /// The resulting pull stream
    type Source: Stream<Item = Result<Self::Item, Self::Error>>;

    /// Convert into the pull stream.
    fn into_source(self) -> Self::Source;
}

//────────────────────────────────────────────────────────────────────────────
// Iter – finite ordered sequences held in memory
//────────────────────────────────────────────────────────────────────────────

/// Source over a synchronous iterator.
#[derive(Debug, Clone)]
#[must_use = "sources do nothing unless consumed"]
pub struct Iter<I> {
    iter: I,
}

/// Build a source from anything iterable.
pub fn iter<I: IntoIterator>(items: I) -> Iter<I::IntoIter> {
    Iter {
        iter: items.into_iter(),
    }
}

impl<I> Unpin for Iter<I> {}

impl<I: Iterator> Stream for Iter<I> {
    type Item = Result<I::Item, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.iter.next().map(Ok))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<I: Iterator> IntoSource for Iter<I> {
    type Item = I::Item;
    type Error = Infallible;
    type Source = Self;

    fn into_source(self) -> Self {
        self
    }
}

impl<T> IntoSource for Vec<T> {
    type Item = T;
    type Error = Infallible;
    type Source = Iter<std::vec::IntoIter<T>>;

    fn into_source(self) -> Self::Source {
        iter(self)
    }
}

impl<T> IntoSource for VecDeque<T> {
    type Item = T;
    type Error = Infallible;
    type Source = Iter<std::collections::vec_deque::IntoIter<T>>;

    fn into_source(self) -> Self::Source {
        iter(self)
    }
}

impl<T, const N: usize> IntoSource for [T; N] {
    type Item = T;
    type Error = Infallible;
    type Source = Iter<std::array::IntoIter<T, N>>;

    fn into_source(self) -> Self::Source {
        iter(self)
    }
}

impl<T> IntoSource for Range<T>
where
    Range<T>: Iterator<Item = T>,
{
    type Item = T;
    type Error = Infallible;
    type Source = Iter<Range<T>>;

    fn into_source(self) -> Self::Source {
        iter(self)
    }
}

//────────────────────────────────────────────────────────────────────────────
// Pull / TryPull – lazy pull-based sequences
//────────────────────────────────────────────────────────────────────────────

/// Source over an infallible [`Stream`]; items may take time to arrive.
#[must_use = "sources do nothing unless consumed"]
pub struct Pull<S> {
    stream: Pin<Box<S>>,
}

/// Build a source from a stream that cannot fail.
pub fn pull<S: Stream>(stream: S) -> Pull<S> {
    Pull {
        stream: Box::pin(stream),
    }
}

impl<S: Stream> Stream for Pull<S> {
    type Item = Result<S::Item, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx).map(|item| item.map(Ok))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl<S: Stream> IntoSource for Pull<S> {
    type Item = S::Item;
    type Error = Infallible;
    type Source = Self;

    fn into_source(self) -> Self {
        self
    }
}

/// Source over a [`Stream`] of results; an `Err` ends the source.
#[must_use = "sources do nothing unless consumed"]
pub struct TryPull<S> {
    stream: Pin<Box<S>>,
}

/// Build a source from a stream whose items may be errors.
pub fn try_pull<S, T, E>(stream: S) -> TryPull<S>
where
    S: Stream<Item = Result<T, E>>,
    E: Into<BoxError>,
{
    TryPull {
        stream: Box::pin(stream),
    }
}

impl<S, T, E> Stream for TryPull<S>
where
    S: Stream<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl<S, T, E> IntoSource for TryPull<S>
where
    S: Stream<Item = Result<T, E>>,
    E: Into<BoxError>,
{
    type Item = T;
    type Error = E;
    type Source = Self;

    fn into_source(self) -> Self {
        self
    }
}
