//! Multicast result channel with bounded replay and producer backpressure.
//!
//! Every run owns exactly one of these channels. Subscribers are independent:
//! each receives every value pushed after it attached, plus up to `replay`
//! values pushed before. The producer side suspends — it never drops and
//! never errors — once the slowest active subscriber falls
//! `replay + extra_buffer` values behind.
//!
//! [`tokio::sync::broadcast`] cannot host these semantics (it evicts the
//! oldest value when a subscriber lags), so the channel is built from a
//! shared ordered log with per-subscriber cursors. Wakeups on both sides ride
//! a single [`watch`] pulse: waiters mark the pulse seen, re-check state
//! under the lock, and sleep until the next mutation bumps it.
//!
//! With no active subscribers only the `replay` suffix is retained (older
//! values are evicted) and a push never suspends — results are buffered for
//! whoever attaches later, not held hostage to absent observers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;

/// Creates a multicast channel.
///
/// `replay` is the suffix of history a late subscriber receives immediately;
/// `extra_buffer` is the additional pending capacity before a push suspends.
/// A total capacity of zero degrades to a rendezvous: each push waits until
/// every subscriber has consumed everything already pushed.
#[must_use]
pub fn channel<T>(replay: usize, extra_buffer: usize) -> (MulticastSender<T>, MulticastHandle<T>) {
    let (pulse, _) = watch::channel(0_u64);
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            buffer: VecDeque::new(),
            head: 0,
            next: 0,
            replay,
            capacity: replay.saturating_add(extra_buffer),
            cursors: HashMap::new(),
            next_subscriber: 0,
            closed: false,
        }),
        pulse,
    });

    (
        MulticastSender {
            shared: Arc::clone(&shared),
        },
        MulticastHandle { shared },
    )
}

/// Error returned by [`MulticastReceiver::try_recv`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing is available right now; the channel is still open.
    #[error("no value is currently available")]
    Empty,

    /// The channel is closed and this subscriber has drained everything.
    #[error("channel is closed and fully drained")]
    Closed,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    pulse: watch::Sender<u64>,
}

impl<T> Shared<T> {
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap()
    }

    /// Wakes every waiter (producer and subscribers) to re-check state.
    fn bump(&self) {
        self.pulse.send_modify(|version| *version = version.wrapping_add(1));
    }
}

struct Inner<T> {
    /// Retained log entries; `buffer[0]` has absolute index `head`.
    buffer: VecDeque<T>,
    head: u64,
    /// Absolute index the next push receives.
    next: u64,
    replay: usize,
    capacity: usize,
    /// Subscriber id → absolute index of the next value it reads.
    cursors: HashMap<u64, u64>,
    next_subscriber: u64,
    closed: bool,
}

impl<T> Inner<T> {
    fn slowest(&self) -> u64 {
        self.cursors.values().copied().min().unwrap_or(self.next)
    }

    fn pending(&self) -> u64 {
        self.next - self.slowest()
    }

    fn has_room(&self) -> bool {
        self.cursors.is_empty() || self.pending() < self.capacity.max(1) as u64
    }

    /// Evicts entries that are both consumed by every subscriber and outside
    /// the replay suffix.
    fn trim(&mut self) {
        let replay_floor = self.next.saturating_sub(self.replay as u64);
        let keep_from = self.slowest().min(replay_floor);
        while self.head < keep_from {
            self.buffer.pop_front();
            self.head += 1;
        }
    }
}

/// Producer side of the channel. Held by exactly one run.
pub struct MulticastSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> MulticastSender<T> {
    /// Pushes a value, suspending under backpressure.
    ///
    /// Suspends while the slowest active subscriber is `replay +
    /// extra_buffer` values behind; resumes as soon as a subscriber drains
    /// or detaches. Nothing is ever dropped. A push after [`close`] is
    /// silently discarded — the sender is the only party that closes, so the
    /// case is unreachable in normal use.
    ///
    /// [`close`]: MulticastSender::close
    pub async fn send(&self, value: T) {
        let mut pulse = self.shared.pulse.subscribe();
        let mut value = Some(value);

        loop {
            // Mark the pulse seen before checking state, so a mutation
            // between the check and the await still wakes us.
            let _ = pulse.borrow_and_update();

            {
                let mut inner = self.shared.lock();
                if inner.closed {
                    return;
                }
                if inner.has_room() {
                    if let Some(value) = value.take() {
                        inner.buffer.push_back(value);
                        inner.next += 1;
                        inner.trim();
                    }
                    drop(inner);
                    self.shared.bump();
                    return;
                }
            }

            if pulse.changed().await.is_err() {
                return;
            }
        }
    }

    /// Closes the channel.
    ///
    /// Subscribers drain what is already retained, then observe the end of
    /// the channel. Dropping the sender closes implicitly.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        if !inner.closed {
            inner.closed = true;
            drop(inner);
            self.shared.bump();
        }
    }

    /// Whether the channel has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl<T> Drop for MulticastSender<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Subscribe handle for a channel. Cheap to clone and hand out.
pub struct MulticastHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for MulticastHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> MulticastHandle<T> {
    /// Attaches a new subscriber.
    ///
    /// The subscriber immediately has access to the most recent
    /// `min(pushed, replay)` values, then every value pushed afterwards, in
    /// push order. Attaching never affects the producer or other
    /// subscribers.
    #[must_use]
    pub fn subscribe(&self) -> MulticastReceiver<T> {
        let id = {
            let mut inner = self.shared.lock();
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            let start = inner.head.max(inner.next.saturating_sub(inner.replay as u64));
            inner.cursors.insert(id, start);
            id
        };

        MulticastReceiver {
            pulse: self.shared.pulse.subscribe(),
            shared: Arc::clone(&self.shared),
            id,
        }
    }

    /// Number of currently attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().cursors.len()
    }
}

/// One subscriber's view of the channel.
///
/// Dropping the receiver detaches it: its backpressure contribution is
/// released and nobody else is affected.
pub struct MulticastReceiver<T> {
    shared: Arc<Shared<T>>,
    pulse: watch::Receiver<u64>,
    id: u64,
}

impl<T: Clone> MulticastReceiver<T> {
    /// Receives the next value, waiting if none is available yet.
    ///
    /// Returns `None` once the channel is closed and this subscriber has
    /// drained everything retained for it.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let _ = self.pulse.borrow_and_update();

            {
                let mut inner = self.shared.lock();
                let cursor = inner.cursors.get(&self.id).copied()?;
                if cursor < inner.next {
                    #[allow(clippy::cast_possible_truncation)] // Log length is bounded by channel capacity
                    let offset = (cursor - inner.head) as usize;
                    let value = inner.buffer[offset].clone();
                    inner.cursors.insert(self.id, cursor + 1);
                    inner.trim();
                    drop(inner);
                    self.shared.bump();
                    return Some(value);
                }
                if inner.closed {
                    return None;
                }
            }

            if self.pulse.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Non-blocking variant of [`recv`](MulticastReceiver::recv).
    ///
    /// # Errors
    ///
    /// [`TryRecvError::Empty`] when the channel is open but nothing is
    /// available; [`TryRecvError::Closed`] once the channel is closed and
    /// drained.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        let mut inner = self.shared.lock();
        let cursor = inner
            .cursors
            .get(&self.id)
            .copied()
            .ok_or(TryRecvError::Closed)?;

        if cursor < inner.next {
            #[allow(clippy::cast_possible_truncation)] // Log length is bounded by channel capacity
            let offset = (cursor - inner.head) as usize;
            let value = inner.buffer[offset].clone();
            inner.cursors.insert(self.id, cursor + 1);
            inner.trim();
            drop(inner);
            self.shared.bump();
            return Ok(value);
        }

        if inner.closed {
            Err(TryRecvError::Closed)
        } else {
            Err(TryRecvError::Empty)
        }
    }
}

impl<T> Drop for MulticastReceiver<T> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if inner.cursors.remove(&self.id).is_some() {
            inner.trim();
            drop(inner);
            // Detaching may free the producer's backpressure slot.
            self.shared.bump();
        }
    }
}
