//! Spawned transform slots
//!
//! A [`SlotTask`] runs one transform on the tokio runtime and reports its
//! result through a oneshot channel, so the consumer can wait on exactly the
//! slot it needs while the others keep running on their own.

use crate::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// A transform running on its own task, tied to a source position.
///
/// Dropping the slot aborts the task.
pub(crate) struct SlotTask<T> {
    index: usize,
    receiver: oneshot::Receiver<T>,
    abort: AbortHandle,
}

impl<T> SlotTask<T> {
    /// Spawn `future` for the item at `index`.
    pub(crate) fn spawn<F>(index: usize, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let result = future.await;
            let _ = tx.send(result);
        });
        Self {
            index,
            receiver: rx,
            abort: handle.abort_handle(),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

impl<T> Future for SlotTask<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let index = self.index;
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(Ok(result)),
            // The sender only disappears if the task panicked or was cancelled.
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::TaskLost { index })),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for SlotTask<T> {
    fn drop(&mut self) {
        self.abort.abort();
    }
}
