//! # Subscriber handle.
//!
//! One connected consumer of one event type. Owns its [`DeliveryQueue`] and
//! two cancellation tokens:
//! - `peer`: supplied by the hosting transport (remote disconnect);
//! - `token`: owned by the engine (child of the engine shutdown token), fired by
//!   explicit disconnect, overflow disconnect and teardown.
//!
//! Once either token fires, no further events are enqueued.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::OverflowPolicy;
use crate::hub::queue::{DeliveryQueue, Enqueued, Rejected};

pub(crate) struct Subscriber<E> {
    id: Arc<str>,
    queue: DeliveryQueue<E>,
    peer: CancellationToken,
    token: CancellationToken,
}

impl<E> Subscriber<E> {
    pub(crate) fn new(
        id: Arc<str>,
        peer: CancellationToken,
        token: CancellationToken,
        limit: Option<usize>,
        overflow: OverflowPolicy,
    ) -> Self {
        Self {
            id,
            queue: DeliveryQueue::new(limit, overflow),
            peer,
            token,
        }
    }

    pub(crate) fn id(&self) -> &Arc<str> {
        &self.id
    }

    pub(crate) fn queue(&self) -> &DeliveryQueue<E> {
        &self.queue
    }

    /// True once the peer disconnected or the engine cancelled this subscriber.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.peer.is_cancelled()
    }

    pub(crate) fn is_peer_cancelled(&self) -> bool {
        self.peer.is_cancelled()
    }

    /// Engine-side cancellation (explicit disconnect, overflow, teardown).
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Completes when either token fires.
    pub(crate) async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = self.peer.cancelled() => {}
        }
    }

    /// Enqueues `event` unless this subscriber is cancelled.
    pub(crate) fn enqueue(&self, event: E) -> Result<Enqueued, Rejected<E>> {
        if self.is_cancelled() {
            return Err(Rejected::Closed(event));
        }
        self.queue.push(event)
    }
}
