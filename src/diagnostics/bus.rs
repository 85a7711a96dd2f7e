//! # Diagnostics bus.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking publishing of [`HubEvent`]s from many sources.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Consumers:
//!   Hub::dispatch   ──┐
//!   DeliveryWorker  ──┼──────► Bus ───► observer listener ───► ObserverSet
//!   Engine (connect)──┤  (broadcast)  └► Engine::diagnostics() receivers
//!   ObserverSet     ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: a single ring buffer stores recent records for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: records are lost if nobody listens at send time.

use tokio::sync::broadcast;

use super::record::HubEvent;

/// Broadcast channel for engine diagnostics.
///
/// Cheap to clone; all clones publish into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<HubEvent>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<HubEvent>(capacity);
        Self { tx }
    }

    /// Publishes a record to all active receivers.
    ///
    /// If there are no receivers, the record is dropped.
    pub fn publish(&self, ev: HubEvent) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent records.
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::HubEventKind;

    #[tokio::test]
    async fn test_receiver_sees_records_after_subscribe() {
        let bus = Bus::new(8);
        bus.publish(HubEvent::new(HubEventKind::EventDropped));

        let mut rx = bus.subscribe();
        bus.publish(HubEvent::new(HubEventKind::SubscriberConnected).with_subscriber("a"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, HubEventKind::SubscriberConnected);
        assert_eq!(ev.subscriber.as_deref(), Some("a"));
    }

    #[test]
    fn test_publish_without_receivers_is_noop() {
        let bus = Bus::new(0);
        bus.publish(HubEvent::new(HubEventKind::EventDropped));
    }
}
