//! Tests for the task-per-slot parallel map
#![cfg(feature = "tokio-async")]

use futures::stream::FusedStream;
use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sugars_parallel_map::transform::{sync_fn, try_sync_fn};
use sugars_parallel_map::{
    from_stream, parallel_map_fn, parallel_map_spawned, source, Error, ParallelMapExt, PassThrough,
};

#[tokio::test(start_paused = true)]
async fn test_spawned_order_preserved_under_skew() {
    let skewed = |item: u64| async move {
        tokio::time::sleep(Duration::from_millis((6 - item) * 10)).await;
        Ok::<_, Infallible>(item.to_string())
    };
    let values: Vec<String> = parallel_map_spawned(3, skewed, 1..7u64)
        .expect("valid limit")
        .try_collect()
        .await
        .expect("ok");
    assert_eq!(values, vec!["1", "2", "3", "4", "5", "6"]);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_slots_progress_while_head_is_slow() {
    let finished = Arc::new(AtomicUsize::new(0));
    let transform = {
        let finished = finished.clone();
        move |item: u64| {
            let finished = finished.clone();
            async move {
                if item == 0 {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                finished.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(item)
            }
        }
    };

    let mut mapped = parallel_map_spawned(3, transform, 0..6u64).expect("valid limit");
    assert_eq!(mapped.next().await.map(|r| r.ok()), Some(Some(0)));
    assert!(finished.load(Ordering::SeqCst) >= 3);
    assert_eq!(mapped.in_flight(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_failure_aborts_remaining_tasks() {
    let late_write = Arc::new(AtomicBool::new(false));
    let transform = {
        let late_write = late_write.clone();
        move |item: u32| {
            let late_write = late_write.clone();
            async move {
                match item {
                    1 => Err("slot one broke"),
                    2 => {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        late_write.store(true, Ordering::SeqCst);
                        Ok(item)
                    }
                    _ => Ok(item),
                }
            }
        }
    };

    let mut mapped = parallel_map_spawned(3, transform, vec![0, 1, 2]).expect("valid limit");
    assert_eq!(mapped.next().await.map(|r| r.ok()), Some(Some(0)));
    match mapped.next().await {
        Some(Err(Error::Transform { index, .. })) => assert_eq!(index, 1),
        other => panic!("expected transform failure, got {other:?}"),
    }
    assert!(mapped.next().await.is_none());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!late_write.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_spawned_map_aborts_tasks() {
    let completed = Arc::new(AtomicUsize::new(0));
    let transform = {
        let completed = completed.clone();
        move |item: u64| {
            let completed = completed.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10 * (item + 1))).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(item)
            }
        }
    };

    let mut mapped = parallel_map_spawned(4, transform, 0..8u64).expect("valid limit");
    assert_eq!(mapped.next().await.map(|r| r.ok()), Some(Some(0)));
    drop(mapped);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_transform_reports_lost_task() {
    let transform = |item: u32| async move {
        if item == 2 {
            panic!("transform panicked on purpose");
        }
        Ok::<_, Infallible>(item)
    };
    let results: Vec<_> = parallel_map_spawned(2, transform, vec![1, 2, 3])
        .expect("valid limit")
        .collect()
        .await;

    assert_eq!(results.len(), 2);
    assert!(matches!(results[0], Ok(1)));
    assert!(matches!(results[1], Err(Error::TaskLost { index: 1 })));
}

#[tokio::test]
async fn test_spawned_source_failure() {
    let source = source::try_pull(futures::stream::iter(vec![
        Ok(1u32),
        Err(std::io::Error::other("gone")),
    ]));
    let results: Vec<_> = parallel_map_spawned(2, sync_fn(|x: u32| x * 3), source)
        .expect("valid limit")
        .collect()
        .await;

    assert_eq!(results.len(), 2);
    assert!(matches!(results[0], Ok(3)));
    assert!(matches!(results[1], Err(Error::Source { index: 1, .. })));
}

#[tokio::test]
async fn test_spawned_curried_and_extension_forms() {
    let pair = parallel_map_fn(2, sync_fn(|x: u32| x + 1)).expect("valid limit");
    let curried: Vec<u32> = pair.apply_spawned(vec![1, 2, 3]).try_collect().await.expect("ok");
    assert_eq!(curried, vec![2, 3, 4]);

    let fluent: Vec<u32> = futures::stream::iter(vec![Ok::<_, std::io::Error>(5u32), Ok(6)])
        .parallel_map_spawned(2, sync_fn(|x: u32| x * 2))
        .expect("valid limit")
        .try_collect()
        .await
        .expect("ok");
    assert_eq!(fluent, vec![10, 12]);
}

#[tokio::test]
async fn test_spawned_terminal_failure_releases_push_source() {
    let stream = PassThrough::new();
    for chunk in 0..4u32 {
        stream.write(chunk);
    }

    let failing = try_sync_fn(|x: u32| if x == 0 { Err("zero") } else { Ok(x) });
    let mut mapped =
        parallel_map_spawned(2, failing, from_stream(stream.clone())).expect("valid limit");

    assert!(matches!(mapped.next().await, Some(Err(Error::Transform { index: 0, .. }))));
    assert!(mapped.is_terminated());
    assert!(stream.is_destroyed());
}
