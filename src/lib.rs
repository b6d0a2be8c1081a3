//! # Sugars Parallel Map
//!
//! Order-preserving, concurrency-limited async map over iterators, streams and
//! push-based sources.
//!
//! `parallel_map(limit, transform, source)` returns a lazy stream: nothing runs
//! until it is polled, at most `limit` transforms are in flight at once, and
//! results come out in source order no matter which transform finishes first.
//!
//! ## Features
//!
//! - `tokio-async` (default) - [`parallel_map_spawned`] runs each transform on
//!   its own tokio task
//! - `serde` - serialization for [`Concurrency`] and [`AdapterConfig`]
//!
//! ## Example
//!
//! ```rust
//! use futures::TryStreamExt;
//! use sugars_parallel_map::{parallel_map, transform::async_fn, Concurrency};
//!
//! # futures::executor::block_on(async {
//! let lengths: Vec<usize> = parallel_map(
//!     Concurrency::new(3)?,
//!     async_fn(|word: &'static str| async move { word.len() }),
//!     vec!["one", "three", "five"],
//! )?
//! .try_collect()
//! .await?;
//! assert_eq!(lengths, [3, 5, 4]);
//! # Ok::<(), sugars_parallel_map::Error>(())
//! # }).unwrap();
//! ```
//!
//! ### Push-based streams
//!
//! ```rust
//! use futures::TryStreamExt;
//! use sugars_parallel_map::{from_stream, parallel_map, transform::sync_fn, PassThrough};
//!
//! # futures::executor::block_on(async {
//! let stream = PassThrough::new();
//! stream.write(1);
//! stream.write(2);
//! stream.end();
//!
//! let doubled: Vec<i32> = parallel_map(2, sync_fn(|x: i32| x * 2), from_stream(stream.clone()))?
//!     .try_collect()
//!     .await?;
//! assert_eq!(doubled, [2, 4]);
//! # Ok::<(), sugars_parallel_map::Error>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod concurrency;
pub mod config;
pub mod error;
pub mod macros;
pub mod map;
pub mod source;
pub mod stream;
#[cfg(feature = "tokio-async")]
mod task;
pub mod transform;

pub use concurrency::{Concurrency, IntoConcurrency};
pub use config::{AdapterConfig, AdapterConfigBuilder, ConfigBuilder};
pub use error::{BoxError, Error, Result};
pub use map::{
    parallel_map, parallel_map_fn, parallel_map_with, MapFn, ParallelMap, ParallelMapExt,
    PartialMap,
};
#[cfg(feature = "tokio-async")]
pub use map::{parallel_map_spawned, SpawnedParallelMap};
pub use source::IntoSource;
pub use stream::{from_stream, from_stream_with, FlowControl, FromStream, PassThrough, PushStream};
pub use transform::Transform;
