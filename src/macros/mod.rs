//! Macro sugar for the combinator

//────────────────────────────────────────────────────────────────────────────
// macros – arity-overloaded entry point for the combinator
//────────────────────────────────────────────────────────────────────────────

/// Build the combinator from one, two or three arguments.
///
/// - `parallel_map!(limit)` is [`parallel_map_with`](crate::parallel_map_with)
/// - `parallel_map!(limit, transform)` is [`parallel_map_fn`](crate::parallel_map_fn)
/// - `parallel_map!(limit, transform, source)` is [`parallel_map`](crate::parallel_map())
///
/// Every form returns a `Result`, failing on an invalid limit.
///
/// ```
/// use futures::TryStreamExt;
/// use sugars_parallel_map::{parallel_map, transform::sync_fn};
///
/// # futures::executor::block_on(async {
/// let double_time = parallel_map!(2)?;
/// let stringify = double_time.transform(sync_fn(|x: u32| x.to_string()));
/// let out: Vec<String> = stringify.apply(vec![1, 2, 3]).try_collect().await?;
/// assert_eq!(out, ["1", "2", "3"]);
/// # Ok::<(), sugars_parallel_map::Error>(())
/// # }).unwrap();
/// ```
#[macro_export]
macro_rules! parallel_map {
    ($concurrency:expr $(,)?) => {
        $crate::parallel_map_with($concurrency)
    };
    ($concurrency:expr, $transform:expr $(,)?) => {
        $crate::parallel_map_fn($concurrency, $transform)
    };
    ($concurrency:expr, $transform:expr, $source:expr $(,)?) => {
        $crate::parallel_map($concurrency, $transform, $source)
    };
}
