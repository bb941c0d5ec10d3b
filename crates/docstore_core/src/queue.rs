//! FIFO serialization of mutating operations.

use parking_lot::{Condvar, Mutex};

/// A strict-FIFO exclusive-access queue.
///
/// Every mutating operation on a collection acquires this queue; reads never
/// do. Waiters are granted access in the exact order they called
/// [`acquire`](WriteQueue::acquire): each caller takes a ticket and waits
/// until the queue is serving it, so there is at most one holder at a time
/// and no waiter can starve as long as every holder eventually releases.
#[derive(Debug, Default)]
pub struct WriteQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Ticket handed to the next caller.
    next_ticket: u64,
    /// Ticket currently granted exclusive access.
    now_serving: u64,
}

impl WriteQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access.
    ///
    /// Blocks until every earlier caller has released. The returned guard
    /// releases the queue when dropped.
    pub fn acquire(&self) -> WriteGuard<'_> {
        let mut state = self.state.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        while state.now_serving != ticket {
            self.available.wait(&mut state);
        }
        WriteGuard { queue: self }
    }
}

/// Exclusive access to a [`WriteQueue`]; released on drop.
#[must_use = "dropping the guard immediately releases the queue"]
#[derive(Debug)]
pub struct WriteGuard<'a> {
    queue: &'a WriteQueue,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.queue.state.lock();
        state.now_serving += 1;
        drop(state);
        // Every waiter rechecks its own ticket, so notify_all is correct
        // even though only one of them can proceed.
        self.queue.available.notify_all();
    }
}
