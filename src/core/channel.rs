//! Bounded typed channels between service units.
//!
//! A channel is the only resource two units ever mutate together: producers
//! `send`, consumers `recv`, nothing touches the buffer directly. Capacity is
//! part of the type, and a full buffer is always visible to the producer as a
//! timeout rather than a silent drop - that timeout is the backpressure
//! mechanism by which upstream work slows to match downstream capacity.
//!
//! Channels are `const`-constructible so module images can declare them as
//! `static`s next to the units that share them:
//!
//! ```
//! use std::time::Duration;
//! use flightcore::core::channel::Channel;
//!
//! static TELEMETRY: Channel<u32, 8> = Channel::new();
//!
//! TELEMETRY.send(7, Duration::from_millis(5)).ok();
//! assert_eq!(TELEMETRY.recv(Duration::from_millis(5)).ok(), Some(7));
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use heapless::Deque;
use thiserror::Error;

/// The send deadline elapsed before buffer room appeared. The rejected value
/// is handed back so the caller decides whether to retry or drop it - the
/// channel never retries internally.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("send timed out on a full channel")]
pub struct SendTimeoutError<T>(pub T);

/// The receive deadline elapsed before an element arrived.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("receive timed out on an empty channel")]
pub struct RecvTimeoutError;

/// Non-blocking send found the buffer full.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("channel full")]
pub struct TrySendError<T>(pub T);

/// Bounded FIFO channel carrying fixed-size values from producers to
/// consumers.
///
/// Ordering is FIFO by completion order of `send`; concurrent senders are
/// serialized by the internal lock, so the total order is always well
/// defined. The buffered element count never exceeds `N`.
pub struct Channel<T, const N: usize> {
    queue: Mutex<Deque<T, N>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T, const N: usize> Channel<T, N> {
    /// Creates an empty channel. Usable in `static` position.
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(Deque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Blocks until the value is enqueued at the tail or the timeout elapses.
    ///
    /// On timeout the value comes back in the error; nothing is dropped
    /// inside the channel.
    pub fn send(&self, value: T, timeout: Duration) -> Result<(), SendTimeoutError<T>> {
        let deadline = Instant::now() + timeout;
        let mut value = value;
        let mut queue = self.lock();
        loop {
            match queue.push_back(value) {
                Ok(()) => {
                    drop(queue);
                    self.not_empty.notify_one();
                    return Ok(());
                }
                Err(rejected) => value = rejected,
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SendTimeoutError(value));
            }
            let (guard, _timed_out) = self
                .not_full
                .wait_timeout(queue, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            queue = guard;
        }
    }

    /// Blocks until an element is dequeued from the head or the timeout
    /// elapses.
    pub fn recv(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.lock();
        loop {
            if let Some(value) = queue.pop_front() {
                drop(queue);
                self.not_full.notify_one();
                return Ok(value);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(RecvTimeoutError);
            }
            let (guard, _timed_out) = self
                .not_empty
                .wait_timeout(queue, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            queue = guard;
        }
    }

    /// Enqueues without blocking, handing the value back if the buffer is
    /// full.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut queue = self.lock();
        match queue.push_back(value) {
            Ok(()) => {
                drop(queue);
                self.not_empty.notify_one();
                Ok(())
            }
            Err(rejected) => Err(TrySendError(rejected)),
        }
    }

    /// Dequeues without blocking.
    pub fn try_recv(&self) -> Option<T> {
        let mut queue = self.lock();
        let value = queue.pop_front();
        if value.is_some() {
            drop(queue);
            self.not_full.notify_one();
        }
        value
    }

    /// Number of buffered elements.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no elements are buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Buffer capacity `N`.
    pub const fn capacity(&self) -> usize {
        N
    }

    fn lock(&self) -> MutexGuard<'_, Deque<T, N>> {
        // A poisoned lock means a unit panicked mid-send/recv; the queue
        // itself is still structurally sound, so keep the vehicle running.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, const N: usize> Default for Channel<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const SHORT: Duration = Duration::from_millis(10);

    #[test]
    fn fifo_order_preserved() {
        let channel: Channel<u32, 4> = Channel::new();
        for n in 0..4 {
            channel.send(n, SHORT).expect("buffer has room");
        }
        for n in 0..4 {
            assert_eq!(channel.recv(SHORT), Ok(n));
        }
    }

    #[test]
    fn buffered_count_never_exceeds_capacity() {
        let channel: Channel<u8, 3> = Channel::new();
        for n in 0..3 {
            channel.send(n, SHORT).expect("buffer has room");
        }
        assert_eq!(channel.len(), 3);
        assert_eq!(channel.try_send(99), Err(TrySendError(99)));
        assert_eq!(channel.len(), 3);
    }

    #[test]
    fn send_timeout_hands_the_value_back() {
        let channel: Channel<u8, 1> = Channel::new();
        channel.send(1, SHORT).expect("buffer has room");

        let started = Instant::now();
        assert_eq!(channel.send(2, SHORT), Err(SendTimeoutError(2)));
        assert!(started.elapsed() >= SHORT);

        // The original element is untouched.
        assert_eq!(channel.recv(SHORT), Ok(1));
    }

    #[test]
    fn recv_timeout_on_empty() {
        let channel: Channel<u8, 2> = Channel::new();
        let started = Instant::now();
        assert_eq!(channel.recv(SHORT), Err(RecvTimeoutError));
        assert!(started.elapsed() >= SHORT);
    }

    #[test]
    fn try_recv_on_empty_is_none() {
        let channel: Channel<u8, 2> = Channel::new();
        assert_eq!(channel.try_recv(), None);
    }

    #[test]
    fn blocked_sender_resumes_when_consumer_drains() {
        let channel: Arc<Channel<u32, 2>> = Arc::new(Channel::new());
        channel.send(0, SHORT).expect("buffer has room");
        channel.send(1, SHORT).expect("buffer has room");

        let producer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.send(2, Duration::from_secs(2)))
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(channel.recv(SHORT), Ok(0));

        producer.join().expect("producer thread").expect("send resumed");
        assert_eq!(channel.recv(SHORT), Ok(1));
        assert_eq!(channel.recv(SHORT), Ok(2));
    }

    #[test]
    fn concurrent_senders_are_serialized() {
        static CHANNEL: Channel<u32, 64> = Channel::new();

        let handles: Vec<_> = (0..4)
            .map(|producer| {
                thread::spawn(move || {
                    for n in 0..16 {
                        CHANNEL
                            .send(producer * 16 + n, Duration::from_secs(1))
                            .expect("capacity covers all sends");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("producer thread");
        }

        let mut seen = Vec::new();
        while let Some(value) = CHANNEL.try_recv() {
            seen.push(value);
        }
        seen.sort_unstable();
        let expected: Vec<u32> = (0..64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn per_producer_order_is_preserved() {
        static CHANNEL: Channel<(u8, u32), 8> = Channel::new();

        let producer = thread::spawn(|| {
            for n in 0..32 {
                CHANNEL
                    .send((0, n), Duration::from_secs(1))
                    .expect("consumer drains");
            }
        });

        let mut last: Option<u32> = None;
        for _ in 0..32 {
            let (_, n) = CHANNEL.recv(Duration::from_secs(1)).expect("producer sends");
            if let Some(previous) = last {
                assert!(n > previous, "out of order: {} after {}", n, previous);
            }
            last = Some(n);
        }
        producer.join().expect("producer thread");
    }
}
