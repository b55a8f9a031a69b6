//! FIFO queues of one-shot waiters, resolved in bulk by native callbacks.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};

use futures::channel::oneshot;

/// Returned when registering on a queue that has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("waiter queue is closed")]
pub struct QueueClosed;

struct Slots<T> {
    next_id: u64,
    pending: VecDeque<(u64, oneshot::Sender<T>)>,
    closed: bool,
}

fn lock<T>(slots: &Mutex<Slots<T>>) -> MutexGuard<'_, Slots<T>> {
    slots.lock().expect("waiter queue mutex poisoned")
}

/// A thread-safe queue of callers waiting for the next event of one kind.
///
/// Callers [`register`](Self::register) and await the returned [`Waiter`].
/// The event source calls [`resolve_all`](Self::resolve_all), which drains
/// the queue and hands every waiter a clone of the same value in
/// registration order.
pub struct WaiterQueue<T> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T> Default for WaiterQueue<T> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                pending: VecDeque::new(),
                closed: false,
            })),
        }
    }
}

impl<T> fmt::Debug for WaiterQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = lock(&self.slots);
        f.debug_struct("WaiterQueue")
            .field("pending", &slots.pending.len())
            .field("closed", &slots.closed)
            .finish()
    }
}

impl<T: Clone> WaiterQueue<T> {
    /// Creates an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a waiter to the back of the queue.
    ///
    /// # Errors
    /// Returns [`QueueClosed`] once [`close`](Self::close) has run.
    pub fn register(&self) -> Result<Registration<T>, QueueClosed> {
        let mut slots = lock(&self.slots);
        if slots.closed {
            return Err(QueueClosed);
        }

        let id = slots.next_id;
        slots.next_id += 1;
        let first = slots.pending.is_empty();
        let (sender, receiver) = oneshot::channel();
        slots.pending.push_back((id, sender));

        Ok(Registration {
            waiter: Waiter {
                id,
                receiver,
                slots: Arc::downgrade(&self.slots),
                finished: false,
            },
            first,
        })
    }

    /// Resolves every pending waiter with `value`. Returns how many were resolved.
    pub fn resolve_all(&self, value: T) -> usize {
        let drained: Vec<_> = lock(&self.slots).pending.drain(..).collect();
        broadcast(drained, &value)
    }

    /// Resolves every pending waiter with `value` and refuses later registrations.
    ///
    /// Returns `None` if the queue was already closed.
    pub fn close(&self, value: T) -> Option<usize> {
        let drained: Vec<_> = {
            let mut slots = lock(&self.slots);
            if slots.closed {
                return None;
            }
            slots.closed = true;
            slots.pending.drain(..).collect()
        };
        Some(broadcast(drained, &value))
    }

    /// Number of waiters still pending.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.slots).pending.len()
    }

    /// Returns `true` if nobody is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.slots).closed
    }
}

fn broadcast<T: Clone>(drained: Vec<(u64, oneshot::Sender<T>)>, value: &T) -> usize {
    let mut delivered = 0;
    for (_, sender) in drained {
        // A waiter whose caller went away between drain and send is simply skipped.
        if sender.send(value.clone()).is_ok() {
            delivered += 1;
        }
    }
    delivered
}

/// The outcome of [`WaiterQueue::register`].
#[derive(Debug)]
pub struct Registration<T> {
    /// Resolves with the next value broadcast to the queue.
    pub waiter: Waiter<T>,
    /// `true` if no other waiter was pending when this one registered.
    pub first: bool,
}

/// A pending slot in a [`WaiterQueue`].
///
/// Resolves to `None` only if the queue itself was dropped. Dropping an
/// unresolved waiter removes it from the queue and leaves the others alone.
pub struct Waiter<T> {
    id: u64,
    receiver: oneshot::Receiver<T>,
    slots: Weak<Mutex<Slots<T>>>,
    finished: bool,
}

impl<T> fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.id)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<T> Future for Waiter<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(result) => {
                this.finished = true;
                Poll::Ready(result.ok())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for Waiter<T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(slots) = self.slots.upgrade() {
            lock(&slots).pending.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::{QueueClosed, WaiterQueue};

    #[test]
    fn first_flag_tracks_empty_queue() {
        let queue = WaiterQueue::<u32>::new();
        let a = queue.register().unwrap();
        let b = queue.register().unwrap();
        assert!(a.first);
        assert!(!b.first);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn resolve_all_broadcasts_the_same_value() {
        let queue = WaiterQueue::new();
        let waiters: Vec<_> = (0..3).map(|_| queue.register().unwrap().waiter).collect();

        assert_eq!(queue.resolve_all("fix"), 3);
        assert!(queue.is_empty());
        for waiter in waiters {
            assert_eq!(waiter.now_or_never(), Some(Some("fix")));
        }
    }

    #[test]
    fn waiters_registered_after_a_broadcast_wait_for_the_next_one() {
        let queue = WaiterQueue::new();
        let early = queue.register().unwrap().waiter;
        queue.resolve_all(1);
        let late = queue.register().unwrap();

        assert!(late.first);
        assert_eq!(early.now_or_never(), Some(Some(1)));
        let mut late = late.waiter;
        assert!((&mut late).now_or_never().is_none());
        queue.resolve_all(2);
        assert_eq!(late.now_or_never(), Some(Some(2)));
    }

    #[test]
    fn close_drains_and_refuses_new_waiters() {
        let queue = WaiterQueue::new();
        let waiter = queue.register().unwrap().waiter;

        assert_eq!(queue.close(-1), Some(1));
        assert_eq!(queue.close(-1), None);
        assert!(queue.is_closed());
        assert_eq!(queue.register().unwrap_err(), QueueClosed);
        assert_eq!(waiter.now_or_never(), Some(Some(-1)));
    }

    #[test]
    fn dropping_a_waiter_removes_only_that_slot() {
        let queue = WaiterQueue::new();
        let keep = queue.register().unwrap().waiter;
        let cancel = queue.register().unwrap().waiter;
        assert_eq!(queue.len(), 2);

        drop(cancel);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.resolve_all(7), 1);
        assert_eq!(keep.now_or_never(), Some(Some(7)));
    }

    #[test]
    fn waiter_outliving_its_queue_resolves_to_none() {
        let queue = WaiterQueue::<u8>::new();
        let waiter = queue.register().unwrap().waiter;
        drop(queue);
        assert_eq!(waiter.now_or_never(), Some(None));
    }
}
