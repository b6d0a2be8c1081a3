//! The per-item transform applied by the combinator.
//!
//! A transform always hands back a future. Synchronous functions are wrapped
//! so their return value becomes an already-resolved future, which lets the
//! combinator treat every call the same way.

use crate::error::BoxError;
use futures::future::{self, FutureExt as _, Map, Ready};
use std::convert::Infallible;
use std::future::Future;

/// A function from an item to a pending, possibly failing, result.
pub trait Transform<T> {
    /// Value produced for one item
    type Ok;
    /// Error produced for one item
    type Error: Into<BoxError>;
    /// The pending computation returned by [`Transform::call`]
    type Future: Future<Output = Result<Self::Ok, Self::Error>>;

    /// Start the transform for `item` without awaiting it.
    fn call(&mut self, item: T) -> Self::Future;
}

impl<T, F, Fut, R, E> Transform<T> for F
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Into<BoxError>,
{
    type Ok = R;
    type Error = E;
    type Future = Fut;

    fn call(&mut self, item: T) -> Fut {
        self(item)
    }
}

/// Infallible synchronous transform, see [`sync_fn`].
#[derive(Debug, Clone, Copy)]
pub struct SyncFn<F> {
    f: F,
}

/// Wrap `FnMut(T) -> R` as a transform whose futures are already resolved.
pub fn sync_fn<T, R, F>(f: F) -> SyncFn<F>
where
    F: FnMut(T) -> R,
{
    SyncFn { f }
}

impl<T, R, F> Transform<T> for SyncFn<F>
where
    F: FnMut(T) -> R,
{
    type Ok = R;
    type Error = Infallible;
    type Future = Ready<Result<R, Infallible>>;

    fn call(&mut self, item: T) -> Self::Future {
        future::ready(Ok((self.f)(item)))
    }
}

/// Fallible synchronous transform, see [`try_sync_fn`].
#[derive(Debug, Clone, Copy)]
pub struct TrySyncFn<F> {
    f: F,
}

/// Wrap `FnMut(T) -> Result<R, E>` as a transform.
pub fn try_sync_fn<T, R, E, F>(f: F) -> TrySyncFn<F>
where
    F: FnMut(T) -> Result<R, E>,
    E: Into<BoxError>,
{
    TrySyncFn { f }
}

impl<T, R, E, F> Transform<T> for TrySyncFn<F>
where
    F: FnMut(T) -> Result<R, E>,
    E: Into<BoxError>,
{
    type Ok = R;
    type Error = E;
    type Future = Ready<Result<R, E>>;

    fn call(&mut self, item: T) -> Self::Future {
        future::ready((self.f)(item))
    }
}

/// Infallible asynchronous transform, see [`async_fn`].
#[derive(Debug, Clone, Copy)]
pub struct AsyncFn<F> {
    f: F,
}

/// Wrap an async function that cannot fail as a transform.
pub fn async_fn<T, F, Fut>(f: F) -> AsyncFn<F>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    AsyncFn { f }
}

impl<T, F, Fut> Transform<T> for AsyncFn<F>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    type Ok = Fut::Output;
    type Error = Infallible;
    type Future = Map<Fut, fn(Fut::Output) -> Result<Fut::Output, Infallible>>;

    fn call(&mut self, item: T) -> Self::Future {
        (self.f)(item).map(Ok as fn(Fut::Output) -> Result<Fut::Output, Infallible>)
    }
}
