//! Push-based streams and their pull-based adapter
//!
//! A push stream hands chunks to a [`Listener`] on its own schedule. The
//! adapter returned by [`from_stream`] queues those chunks until the consumer
//! asks for them, and pauses the producer while the queue is full.

pub mod adapter;
pub mod pass_through;

pub use adapter::{from_stream, from_stream_with, FromStream, Listener, NextChunk};
pub use pass_through::{Drained, PassThrough};

/// Backpressure and lifecycle signals a push stream accepts.
///
/// Calls may arrive from any thread, so implementations use interior
/// mutability.
pub trait FlowControl: Send + Sync {
    /// Stop emitting chunks until [`FlowControl::resume`] is called.
    fn pause(&self);

    /// Start emitting chunks again.
    fn resume(&self);

    /// Release the stream; no further events are wanted.
    fn destroy(&self) {}
}

/// A producer that pushes chunks of type `C` to an attached listener.
pub trait PushStream<C>: FlowControl {
    /// Register the listener that receives every event from now on.
    fn attach(&self, listener: Listener<C>);
}
