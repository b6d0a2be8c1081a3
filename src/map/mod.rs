//! The order-preserving, concurrency-limited map.
//!
//! Entry points come in three arities:
//!
//! - [`parallel_map`] takes the limit, the transform and the source
//! - [`parallel_map_fn`] takes the limit and the transform
//! - [`parallel_map_with`] takes only the limit
//!
//! The shorter forms return values that finish the application later, so a
//! limit or a limit/transform pair can be reused across sources. The
//! [`parallel_map!`](crate::parallel_map!) macro picks the right form by
//! argument count.

pub mod curry;
pub mod ext;
#[cfg(feature = "tokio-async")]
pub mod spawned;
pub mod window;

pub use curry::{MapFn, PartialMap};
pub use ext::ParallelMapExt;
#[cfg(feature = "tokio-async")]
pub use spawned::SpawnedParallelMap;
pub use window::ParallelMap;

use crate::concurrency::IntoConcurrency;
use crate::error::Result;
use crate::source::IntoSource;
use crate::transform::Transform;

/// Map `transform` over `source` with at most `concurrency` calls in flight.
///
/// Fails immediately if `concurrency` is invalid. The returned stream yields
/// results in source order and stops after the first error.
///
/// ```
/// use futures::TryStreamExt;
/// use sugars_parallel_map::{parallel_map, transform::sync_fn};
///
/// # futures::executor::block_on(async {
/// let out: Vec<String> = parallel_map(2, sync_fn(|x: u32| x.to_string()), vec![1, 2, 3])?
///     .try_collect()
///     .await?;
/// assert_eq!(out, ["1", "2", "3"]);
/// # Ok::<(), sugars_parallel_map::Error>(())
/// # }).unwrap();
/// ```
pub fn parallel_map<C, F, I>(
    concurrency: C,
    transform: F,
    source: I,
) -> Result<ParallelMap<I::Source, F>>
where
    C: IntoConcurrency,
    I: IntoSource,
    F: Transform<I::Item>,
{
    Ok(ParallelMap::new(
        concurrency.into_concurrency()?,
        transform,
        source.into_source(),
    ))
}

/// Bind only the concurrency limit.
pub fn parallel_map_with<C: IntoConcurrency>(concurrency: C) -> Result<PartialMap> {
    Ok(PartialMap::new(concurrency.into_concurrency()?))
}

/// Bind the concurrency limit and the transform.
pub fn parallel_map_fn<C: IntoConcurrency, F>(concurrency: C, transform: F) -> Result<MapFn<F>> {
    Ok(MapFn::new(concurrency.into_concurrency()?, transform))
}

/// Like [`parallel_map`], running every transform on its own tokio task.
///
/// The consumer waits only on the task for the next position; the others run
/// to completion on the runtime in the meantime.
#[cfg(feature = "tokio-async")]
pub fn parallel_map_spawned<C, F, I>(
    concurrency: C,
    transform: F,
    source: I,
) -> Result<SpawnedParallelMap<I::Source, F>>
where
    C: IntoConcurrency,
    I: IntoSource,
    F: Transform<I::Item>,
    F::Future: Send + 'static,
    F::Ok: Send + 'static,
    F::Error: Send + 'static,
{
    Ok(SpawnedParallelMap::new(
        concurrency.into_concurrency()?,
        transform,
        source.into_source(),
    ))
}
