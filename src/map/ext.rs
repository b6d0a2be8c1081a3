//! Stream extension trait for the combinator

use super::window::ParallelMap;
use crate::concurrency::IntoConcurrency;
use crate::error::{BoxError, Result};
use crate::transform::Transform;
use futures::stream::TryStream;

//────────────────────────────────────────────────────────────────────────────
// ParallelMapExt – fluent form on any fallible stream
//────────────────────────────────────────────────────────────────────────────

/// Extension trait adding the combinator to fallible streams.
///
/// Infallible streams can be wrapped with [`source::pull`](crate::source::pull)
/// first.
pub trait ParallelMapExt: TryStream + Sized {
    /// Map with at most `concurrency` transforms in flight, in source order.
    fn parallel_map<C, F>(self, concurrency: C, transform: F) -> Result<ParallelMap<Self, F>>
    where
        C: IntoConcurrency,
        F: Transform<Self::Ok>,
        Self::Error: Into<BoxError>,
    {
        Ok(ParallelMap::new(
            concurrency.into_concurrency()?,
            transform,
            self,
        ))
    }

    /// Like [`ParallelMapExt::parallel_map`], spawning each transform on tokio.
    #[cfg(feature = "tokio-async")]
    fn parallel_map_spawned<C, F>(
        self,
        concurrency: C,
        transform: F,
    ) -> Result<super::spawned::SpawnedParallelMap<Self, F>>
    where
        C: IntoConcurrency,
        F: Transform<Self::Ok>,
        F::Future: Send + 'static,
        F::Ok: Send + 'static,
        F::Error: Send + 'static,
        Self::Error: Into<BoxError>,
    {
        Ok(super::spawned::SpawnedParallelMap::new(
            concurrency.into_concurrency()?,
            transform,
            self,
        ))
    }
}

impl<S: TryStream> ParallelMapExt for S {}
