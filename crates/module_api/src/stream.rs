//! Replay-latest broadcast of a lifecycle value.
//!
//! A [`StateStream`] holds the current value of some state and fans every new
//! value out to all subscribers. A new subscriber receives the current value
//! first, then every later value in publication order with no gaps. Each
//! subscriber owns an unbounded queue so publishing never waits on readers.

use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

struct Inner<T> {
    current: T,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

/// Observable state with replay of the latest value.
pub struct StateStream<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + PartialEq + Send + 'static> StateStream<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: initial,
                subscribers: Vec::new(),
            }),
        }
    }

    /// The most recently published value.
    pub fn current(&self) -> T {
        self.inner.lock().current.clone()
    }

    /// Subscribes to the stream, starting with the current value.
    pub fn subscribe(&self) -> StateSubscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        // Seeding under the lock keeps the replayed value ordered before any later publish.
        let _ = tx.send(inner.current.clone());
        inner.subscribers.push(tx);
        StateSubscription { rx }
    }

    /// Stores `value` and delivers it to every live subscriber.
    pub fn publish(&self, value: T) {
        let mut inner = self.inner.lock();
        inner.current = value.clone();
        inner
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
    }

    /// Publishes `next` only if the current value equals `expected`.
    ///
    /// Returns the value that was current when the check failed.
    pub fn advance_from(&self, expected: &T, next: T) -> Result<(), T> {
        let mut inner = self.inner.lock();
        if inner.current != *expected {
            return Err(inner.current.clone());
        }
        inner.current = next.clone();
        inner.subscribers.retain(|tx| tx.send(next.clone()).is_ok());
        Ok(())
    }

    /// Number of subscribers that have not been dropped yet.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StateStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StateStream")
            .field("current", &inner.current)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Receiving side of a [`StateStream`].
///
/// Ends once the stream it came from is dropped and every queued value has
/// been consumed.
#[derive(Debug)]
pub struct StateSubscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> StateSubscription<T> {
    /// Waits for the next value.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns a value that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for StateSubscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_new_subscriber_sees_current_value_first() {
        let stream = StateStream::new(1u32);
        stream.publish(2);

        let mut sub = stream.subscribe();
        stream.publish(3);

        assert_eq!(sub.recv().await, Some(2));
        assert_eq!(sub.recv().await, Some(3));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_slow_subscriber_gets_every_value() {
        let stream = StateStream::new(0u32);
        let sub = stream.subscribe();
        for value in 1..=100 {
            stream.publish(value);
        }
        drop(stream);

        let seen: Vec<u32> = sub.collect().await;
        assert_eq!(seen, (0..=100).collect::<Vec<_>>());
    }

    #[test]
    fn test_advance_from_checks_expected_value() {
        let stream = StateStream::new("a");
        assert_eq!(stream.advance_from(&"a", "b"), Ok(()));
        assert_eq!(stream.advance_from(&"a", "c"), Err("b"));
        assert_eq!(stream.current(), "b");
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let stream = StateStream::new(0u8);
        let keep = stream.subscribe();
        drop(stream.subscribe());
        assert_eq!(stream.subscriber_count(), 1);
        stream.publish(1);
        assert_eq!(stream.subscriber_count(), 1);
        drop(keep);
        assert_eq!(stream.subscriber_count(), 0);
    }
}
