//! # Per-subscriber delivery queue.
//!
//! Single consumer (the subscriber's delivery worker), many producers
//! (publishers). Producers never wait: a push either lands, evicts the oldest
//! item, or is handed back to the caller.
//!
//! ```text
//! push ──► [ e1 e2 e3 … ] ──► recv (worker)
//!            │
//!            └─ full? ─► DropOldest: evict e1, keep new
//!                        DropNewest: hand new back (Full)
//!                        Disconnect: hand new back (Overflow)
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::config::OverflowPolicy;

/// Successful push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Enqueued {
    Queued,
    /// The new item was queued after evicting the oldest one.
    DroppedOldest,
}

/// Push refused; the item is handed back.
#[derive(Debug)]
pub(crate) enum Rejected<E> {
    /// Queue closed (subscriber terminating).
    Closed(E),
    /// Full under [`OverflowPolicy::DropNewest`].
    Full(E),
    /// Full under [`OverflowPolicy::Disconnect`].
    Overflow(E),
}

struct QueueState<E> {
    items: VecDeque<E>,
    closed: bool,
}

pub(crate) struct DeliveryQueue<E> {
    state: Mutex<QueueState<E>>,
    notify: Notify,
    limit: Option<usize>,
    overflow: OverflowPolicy,
}

impl<E> DeliveryQueue<E> {
    pub(crate) fn new(limit: Option<usize>, overflow: OverflowPolicy) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
            limit: limit.map(|n| n.max(1)),
            overflow,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item`, applying the overflow policy when bounded and full.
    pub(crate) fn push(&self, item: E) -> Result<Enqueued, Rejected<E>> {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return Err(Rejected::Closed(item));
            }
            match self.limit {
                Some(limit) if state.items.len() >= limit => match self.overflow {
                    OverflowPolicy::DropOldest => {
                        state.items.pop_front();
                        state.items.push_back(item);
                        Enqueued::DroppedOldest
                    }
                    OverflowPolicy::DropNewest => return Err(Rejected::Full(item)),
                    OverflowPolicy::Disconnect => return Err(Rejected::Overflow(item)),
                },
                _ => {
                    state.items.push_back(item);
                    Enqueued::Queued
                }
            }
        };
        self.notify.notify_one();
        Ok(outcome)
    }

    /// Waits for the head item. Returns `None` once the queue is closed.
    ///
    /// Cancel safe: dropping the future never loses an item.
    pub(crate) async fn recv(&self) -> Option<E> {
        loop {
            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            // A push between the check above and this await leaves a permit.
            self.notify.notified().await;
        }
    }

    /// Closes the queue and discards everything still pending.
    ///
    /// Returns the number of discarded items. Idempotent.
    pub(crate) fn close_and_drain(&self) -> usize {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            let n = state.items.len();
            state.items.clear();
            n
        };
        self.notify.notify_one();
        discarded
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }
}
