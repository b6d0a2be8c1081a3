//! Partial application of the combinator.
//!
//! A validated concurrency limit, optionally paired with a transform, can be
//! kept around and applied to many sources.

use super::window::ParallelMap;
use crate::concurrency::Concurrency;
use crate::source::IntoSource;
use crate::transform::Transform;

/// The combinator with only its concurrency bound.
///
/// Returned by [`parallel_map_with`](crate::parallel_map_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialMap {
    concurrency: Concurrency,
}

impl PartialMap {
    pub(crate) fn new(concurrency: Concurrency) -> Self {
        Self { concurrency }
    }

    /// The bound limit.
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Bind the transform, leaving a function of the source.
    pub fn transform<F>(self, transform: F) -> MapFn<F> {
        MapFn {
            concurrency: self.concurrency,
            transform,
        }
    }

    /// Apply to a transform and a source in one go.
    pub fn apply<F, I>(self, transform: F, source: I) -> ParallelMap<I::Source, F>
    where
        I: IntoSource,
        F: Transform<I::Item>,
    {
        ParallelMap::new(self.concurrency, transform, source.into_source())
    }
}

/// The combinator with its concurrency bound and transform.
///
/// Returned by [`parallel_map_fn`](crate::parallel_map_fn) and
/// [`PartialMap::transform`].
#[derive(Debug, Clone, Copy)]
pub struct MapFn<F> {
    concurrency: Concurrency,
    transform: F,
}

impl<F> MapFn<F> {
    pub(crate) fn new(concurrency: Concurrency, transform: F) -> Self {
        Self {
            concurrency,
            transform,
        }
    }

    /// The bound limit.
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Map over `source` with a copy of the bound transform.
    pub fn apply<I>(&self, source: I) -> ParallelMap<I::Source, F>
    where
        I: IntoSource,
        F: Transform<I::Item> + Clone,
    {
        ParallelMap::new(self.concurrency, self.transform.clone(), source.into_source())
    }

    /// Map over `source`, consuming the bound transform.
    pub fn into_map<I>(self, source: I) -> ParallelMap<I::Source, F>
    where
        I: IntoSource,
        F: Transform<I::Item>,
    {
        ParallelMap::new(self.concurrency, self.transform, source.into_source())
    }

    /// Like [`MapFn::apply`], running every transform on its own tokio task.
    #[cfg(feature = "tokio-async")]
    pub fn apply_spawned<I>(&self, source: I) -> super::spawned::SpawnedParallelMap<I::Source, F>
    where
        I: IntoSource,
        F: Transform<I::Item> + Clone,
        F::Future: Send + 'static,
        F::Ok: Send + 'static,
        F::Error: Send + 'static,
    {
        super::spawned::SpawnedParallelMap::new(
            self.concurrency,
            self.transform.clone(),
            source.into_source(),
        )
    }
}
