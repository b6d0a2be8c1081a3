//! Tests for the pull-based adapter over push streams

use futures::executor::block_on;
use futures::StreamExt;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sugars_parallel_map::stream::Listener;
use sugars_parallel_map::{
    from_stream, from_stream_with, AdapterConfig, ConfigBuilder, Error, FlowControl, PassThrough,
    PushStream,
};
use tokio_test::{assert_pending, assert_ready, task};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tight(high: usize, low: usize) -> AdapterConfig {
    AdapterConfig::builder()
        .high_water_mark(high)
        .low_water_mark(low)
        .build()
        .expect("valid thresholds")
}

fn chunk<C>(delivery: Option<sugars_parallel_map::Result<C>>) -> Option<C> {
    delivery.map(|r| r.expect("chunk, not failure"))
}

#[tokio::test]
async fn test_ended_empty_stream_yields_nothing() {
    init();
    let stream = PassThrough::<String>::new();
    stream.end();

    let adapter = from_stream(stream);
    let chunks: Vec<_> = adapter.collect().await;
    assert!(chunks.is_empty());
}

#[tokio::test]
async fn test_chunks_arrive_in_write_order() {
    init();
    let stream = PassThrough::new();
    let adapter = from_stream(stream.clone());
    for word in ["alpha", "beta", "gamma"] {
        assert!(stream.write(word));
    }
    stream.end();

    let chunks: Vec<&str> = adapter.map(|r| r.expect("chunk")).collect().await;
    assert_eq!(chunks, vec!["alpha", "beta", "gamma"]);
}

#[tokio::test]
async fn test_writes_before_attach_are_flushed_in_order() {
    let stream = PassThrough::new();
    stream.write(1);
    stream.write(2);
    assert_eq!(stream.backlog(), 2);

    let adapter = from_stream(stream.clone());
    assert_eq!(stream.backlog(), 0);
    assert_eq!(adapter.queued(), 2);

    assert_eq!(chunk(adapter.next_chunk().await), Some(1));
    assert_eq!(chunk(adapter.next_chunk().await), Some(2));
}

#[test]
fn test_waiting_pulls_are_satisfied_in_request_order() {
    let stream = PassThrough::new();
    let adapter = from_stream(stream.clone());

    let mut first = task::spawn(adapter.next_chunk());
    let mut second = task::spawn(adapter.next_chunk());
    assert_pending!(first.poll());
    assert_pending!(second.poll());

    stream.write(10);
    assert!(first.is_woken());
    assert!(!second.is_woken());
    stream.write(20);
    assert!(second.is_woken());

    assert_eq!(chunk(assert_ready!(first.poll())), Some(10));
    assert_eq!(chunk(assert_ready!(second.poll())), Some(20));
}

#[test]
fn test_end_resolves_waiting_pulls_with_none() {
    let stream = PassThrough::<u8>::new();
    let adapter = from_stream(stream.clone());

    let mut waiting = task::spawn(adapter.next_chunk());
    assert_pending!(waiting.poll());
    stream.end();

    assert!(assert_ready!(waiting.poll()).is_none());
    assert!(task::spawn(adapter.next_chunk()).poll().is_ready());
}

#[tokio::test]
async fn test_backpressure_pauses_at_high_and_resumes_below_low() {
    init();
    let stream = PassThrough::new();
    let adapter = from_stream_with(stream.clone(), tight(2, 1)).expect("valid config");

    assert!(stream.write(1));
    assert!(!stream.write(2));
    assert!(stream.is_paused());
    assert!(adapter.is_paused());

    assert!(!stream.write(3));
    assert_eq!(stream.backlog(), 1);
    assert_eq!(adapter.queued(), 2);

    assert_eq!(chunk(adapter.next_chunk().await), Some(1));
    assert!(stream.is_paused());

    assert_eq!(chunk(adapter.next_chunk().await), Some(2));
    assert!(!stream.is_paused());
    assert_eq!(stream.backlog(), 0);
    assert_eq!(adapter.queued(), 1);

    assert_eq!(chunk(adapter.next_chunk().await), Some(3));
}

#[tokio::test]
async fn test_producer_honouring_backpressure_delivers_everything() {
    init();
    let stream = PassThrough::new();
    let adapter = from_stream_with(stream.clone(), tight(4, 2)).expect("valid config");

    let producer = tokio::spawn(async move {
        for i in 0..100u32 {
            if !stream.write(i) {
                stream.drained().await;
            }
        }
        stream.end();
    });

    let chunks: Vec<u32> = adapter.map(|r| r.expect("chunk")).collect().await;
    producer.await.expect("producer finished");
    assert_eq!(chunks, (0..100).collect::<Vec<_>>());
}

#[test]
fn test_error_fails_the_waiting_pull() {
    let stream = PassThrough::<u32>::new();
    let adapter = from_stream(stream.clone());

    let mut waiting = task::spawn(adapter.next_chunk());
    let mut behind = task::spawn(adapter.next_chunk());
    assert_pending!(waiting.poll());
    assert_pending!(behind.poll());

    stream.fail("socket reset");
    match assert_ready!(waiting.poll()) {
        Some(Err(Error::Stream(source))) => assert_eq!(source.to_string(), "socket reset"),
        other => panic!("expected stream failure, got {other:?}"),
    }
    assert!(assert_ready!(behind.poll()).is_none());
}

#[tokio::test]
async fn test_error_overtakes_queued_chunks() {
    let stream = PassThrough::new();
    let mut adapter = from_stream(stream.clone());
    stream.write(1);
    stream.write(2);
    stream.fail(std::io::Error::other("truncated"));

    assert!(matches!(adapter.next().await, Some(Err(Error::Stream(_)))));
    assert!(adapter.next().await.is_none());
    assert!(!stream.write(3));
}

#[tokio::test]
async fn test_dropping_adapter_destroys_unfinished_stream() {
    let stream = PassThrough::new();
    let mut adapter = from_stream(stream.clone());
    stream.write(1);
    assert_eq!(chunk(adapter.next().await), Some(1));

    drop(adapter);
    assert!(stream.is_destroyed());
    assert!(!stream.write(2));
}

#[tokio::test]
async fn test_dropping_adapter_after_end_leaves_stream_alone() {
    let stream = PassThrough::<u32>::new();
    let adapter = from_stream(stream.clone());
    stream.end();
    drop(adapter);
    assert!(stream.is_ended());
    assert!(!stream.is_destroyed());
}

#[test]
fn test_invalid_config_is_rejected() {
    let inverted = AdapterConfig {
        high_water_mark: 1,
        low_water_mark: 2,
    };
    let stream = PassThrough::<u32>::new();
    assert!(matches!(
        from_stream_with(stream.clone(), inverted),
        Err(Error::InvalidConfig(_))
    ));
    assert!(AdapterConfig::builder().low_water_mark(0).build().is_err());
    assert_eq!(stream.backlog(), 0);
}

/// Push stream that records the flow control calls it receives.
#[derive(Clone, Default)]
struct Recorder {
    listener: Arc<Mutex<Option<Listener<u32>>>>,
    pauses: Arc<AtomicUsize>,
    resumes: Arc<AtomicUsize>,
    destroyed: Arc<AtomicBool>,
}

impl Recorder {
    fn listener(&self) -> Listener<u32> {
        self.listener.lock().clone().expect("attached")
    }
}

impl FlowControl for Recorder {
    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

impl PushStream<u32> for Recorder {
    fn attach(&self, listener: Listener<u32>) {
        *self.listener.lock() = Some(listener);
    }
}

#[tokio::test]
async fn test_custom_push_stream_sees_flow_control() {
    let recorder = Recorder::default();
    let adapter = from_stream_with(recorder.clone(), tight(2, 1)).expect("valid config");
    let listener = recorder.listener();
    assert!(listener.is_attached());

    assert!(listener.data(1));
    assert!(!listener.data(2));
    assert_eq!(recorder.pauses.load(Ordering::SeqCst), 1);

    assert_eq!(chunk(adapter.next_chunk().await), Some(1));
    assert_eq!(recorder.resumes.load(Ordering::SeqCst), 0);
    assert_eq!(chunk(adapter.next_chunk().await), Some(2));
    assert_eq!(recorder.resumes.load(Ordering::SeqCst), 1);

    drop(adapter);
    assert!(recorder.destroyed.load(Ordering::SeqCst));
    assert!(!listener.is_attached());
    assert!(!listener.data(3));
}

/// Forwards to a `PassThrough`, delivering `pause` only after a delay.
#[derive(Clone)]
struct SlowPause {
    inner: PassThrough<u32>,
    delay: Duration,
}

impl FlowControl for SlowPause {
    fn pause(&self) {
        std::thread::sleep(self.delay);
        self.inner.pause();
    }

    fn resume(&self) {
        self.inner.resume();
    }

    fn destroy(&self) {
        self.inner.destroy();
    }
}

impl PushStream<u32> for SlowPause {
    fn attach(&self, listener: Listener<u32>) {
        self.inner.attach(listener);
    }
}

#[test]
fn test_resume_is_not_overtaken_by_a_late_pause() {
    let stream = PassThrough::new();
    let slow = SlowPause {
        inner: stream.clone(),
        delay: Duration::from_millis(100),
    };
    let adapter = from_stream_with(slow, tight(1, 1)).expect("valid config");

    let producer = {
        let stream = stream.clone();
        std::thread::spawn(move || stream.write(1))
    };
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(chunk(block_on(adapter.next_chunk())), Some(1));
    producer.join().expect("producer thread");

    assert!(!adapter.is_paused());
    assert!(!stream.is_paused());

    stream.write(2);
    let mut next = task::spawn(adapter.next_chunk());
    assert_eq!(chunk(assert_ready!(next.poll())), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_threaded_producer_never_stalls_consumer() {
    init();
    for round in 0..200 {
        let stream = PassThrough::new();
        let adapter = from_stream_with(stream.clone(), tight(1, 1)).expect("valid config");

        let producer = std::thread::spawn(move || {
            for i in 0..50u32 {
                if !stream.write(i) {
                    block_on(stream.drained());
                }
            }
            stream.end();
        });

        let pulled = adapter.map(|r| r.expect("chunk")).collect::<Vec<u32>>();
        let chunks = tokio::time::timeout(Duration::from_secs(5), pulled)
            .await
            .unwrap_or_else(|_| panic!("consumer stalled in round {round}"));
        producer.join().expect("producer thread");
        assert_eq!(chunks, (0..50).collect::<Vec<_>>());
    }
}
