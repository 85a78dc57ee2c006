//! Stream adapters tying process lifetime to the consumer.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use tokio_util::sync::{CancellationToken, DropGuard};

pin_project! {
    /// Cancels a token when dropped before the inner stream ends.
    ///
    /// Reaching the end of the stream disarms the guard, so a consumer that
    /// read everything does not cancel the producer.
    pub struct CancelOnDrop<S> {
        #[pin]
        inner: S,
        guard: Option<DropGuard>,
    }
}

impl<S> CancelOnDrop<S> {
    /// Wrap `inner`, cancelling `token` on early drop.
    pub fn new(inner: S, token: CancellationToken) -> Self {
        Self {
            inner,
            guard: Some(token.drop_guard()),
        }
    }
}

impl<S: Stream> Stream for CancelOnDrop<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let polled = this.inner.poll_next(cx);
        if let Poll::Ready(None) = polled {
            if let Some(guard) = this.guard.take() {
                guard.disarm();
            }
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_early_drop_cancels() {
        let token = CancellationToken::new();
        let stream = CancelOnDrop::new(futures::stream::iter([1, 2, 3]), token.clone());
        let mut stream = Box::pin(stream);
        assert_eq!(stream.next().await, Some(1));
        drop(stream);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_full_read_does_not_cancel() {
        let token = CancellationToken::new();
        let stream = CancelOnDrop::new(futures::stream::iter([1, 2]), token.clone());
        let items: Vec<i32> = stream.collect().await;
        assert_eq!(items, vec![1, 2]);
        assert!(!token.is_cancelled());
    }
}
