//! # Per-type hub: registry, selector and dispatch for one event type.
//!
//! A [`Hub<E>`] is created by [`Engine::register`](crate::Engine::register) and
//! owns everything scoped to `E`:
//!
//! ```text
//!                 Hub<E>
//! dispatch(ev) ──► mode?
//!                   ├─ RoundRobin ─► selector.select_next(registry) ─► sub.enqueue(ev)
//!                   │                   └─ None ─► EventDropped, NoSubscribers
//!                   └─ Broadcast  ─► for sub in registry.snapshot(): sub.enqueue(ev.clone())
//!
//! publish(ev)  ──► dispatch(ev) ─► store.persist(ev)   (only if somebody was live)
//! ```
//!
//! ## Rules
//! - Dispatch never awaits: an enqueue is a short critical section.
//! - A subscriber found closed at enqueue time is evicted and the same turn is
//!   retried against the re-numbered set; the cursor moves once per event.
//! - Overflow follows the hub's [`OverflowPolicy`]; `Disconnect` cancels the
//!   subscriber and re-dispatches the event to the next one.
//! - Storage failures become `StoreFailed` diagnostics; they never fail a publish.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{HubConfig, OverflowPolicy, RotationScope};
use crate::diagnostics::{Bus, HubEvent, HubEventKind};
use crate::error::HubError;
use crate::event::{Event, EventType};
use crate::hub::engine::Subscription;
use crate::hub::queue::{Enqueued, Rejected};
use crate::hub::registry::SubscriberRegistry;
use crate::hub::selector::{RotationCursor, RoundRobinSelector};
use crate::hub::subscriber::Subscriber;
use crate::hub::worker::DeliveryWorker;
use crate::sink::BoxSink;
use crate::store::EventStore;

/// How a hub hands events to its subscribers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistributionMode {
    /// Each event goes to exactly one subscriber, in rotation.
    #[default]
    RoundRobin,
    /// Each event goes to every live subscriber.
    Broadcast,
}

impl DistributionMode {
    /// Stable snake_case name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionMode::RoundRobin => "round_robin",
            DistributionMode::Broadcast => "broadcast",
        }
    }
}

/// Registration options for one event type.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use rrhub::{DistributionMode, Event, HubOptions, InMemoryEventStore};
///
/// #[derive(Clone)]
/// struct Audit(String);
/// impl Event for Audit {}
///
/// let store = Arc::new(InMemoryEventStore::<Audit>::new());
/// let opts = HubOptions::broadcast().with_store(store);
/// assert_eq!(opts.mode(), DistributionMode::Broadcast);
/// ```
pub struct HubOptions<E: Event> {
    mode: DistributionMode,
    store: Option<Arc<dyn EventStore<E>>>,
}

impl<E: Event> HubOptions<E> {
    /// Round-robin distribution, no store.
    pub fn round_robin() -> Self {
        Self {
            mode: DistributionMode::RoundRobin,
            store: None,
        }
    }

    /// Broadcast distribution, no store.
    pub fn broadcast() -> Self {
        Self {
            mode: DistributionMode::Broadcast,
            store: None,
        }
    }

    /// Attaches a storage collaborator.
    pub fn with_store(mut self, store: Arc<dyn EventStore<E>>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn mode(&self) -> DistributionMode {
        self.mode
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }
}

impl<E: Event> Default for HubOptions<E> {
    fn default() -> Self {
        Self::round_robin()
    }
}

impl<E: Event> fmt::Debug for HubOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubOptions")
            .field("mode", &self.mode)
            .field("store", &self.store.is_some())
            .finish()
    }
}

/// Result of handing one event to a hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Enqueued for exactly one subscriber.
    Dispatched {
        /// Id of the chosen subscriber.
        subscriber: Arc<str>,
    },
    /// Enqueued for every live subscriber (broadcast hubs).
    Broadcast {
        /// Number of subscribers that accepted a copy.
        delivered: usize,
    },
    /// The chosen subscriber's queue was full under `DropNewest`; the event was dropped.
    Overflowed {
        /// Id of the chosen subscriber.
        subscriber: Arc<str>,
    },
    /// Nobody was live; the event was dropped.
    NoSubscribers,
}

impl PublishOutcome {
    /// Id of the subscriber that was chosen, for round-robin outcomes.
    pub fn subscriber(&self) -> Option<&str> {
        match self {
            PublishOutcome::Dispatched { subscriber }
            | PublishOutcome::Overflowed { subscriber } => Some(&**subscriber),
            _ => None,
        }
    }

    /// True when at least one subscriber has the event queued.
    pub fn is_delivered(&self) -> bool {
        match self {
            PublishOutcome::Dispatched { .. } => true,
            PublishOutcome::Broadcast { delivered } => *delivered > 0,
            PublishOutcome::Overflowed { .. } | PublishOutcome::NoSubscribers => false,
        }
    }
}

/// Dispatch state for one event type.
pub struct Hub<E: Event> {
    event_type: EventType,
    mode: DistributionMode,
    registry: SubscriberRegistry<E>,
    selector: RoundRobinSelector,
    store: Option<Arc<dyn EventStore<E>>>,
    queue_limit: Option<usize>,
    overflow: OverflowPolicy,
    bus: Bus,
}

impl<E: Event> Hub<E> {
    pub(crate) fn new(options: HubOptions<E>, cfg: &HubConfig, bus: Bus) -> Self {
        let event_type = EventType::of::<E>();
        let cursor = match cfg.rotation_scope {
            RotationScope::Engine => Arc::new(RotationCursor::new()),
            RotationScope::Process => RotationCursor::process_wide(event_type),
        };
        Self {
            event_type,
            mode: options.mode,
            registry: SubscriberRegistry::new(event_type),
            selector: RoundRobinSelector::new(cursor),
            store: options.store,
            queue_limit: cfg.queue_limit(),
            overflow: cfg.overflow,
            bus,
        }
    }

    /// Checks that re-registering with `options` does not change this hub.
    pub(crate) fn check_compatible(&self, options: &HubOptions<E>) -> Result<(), HubError> {
        if options.mode != self.mode {
            return Err(HubError::ConflictingConfiguration {
                event_type: self.event_type.name(),
                reason: format!(
                    "registered as {}, requested {}",
                    self.mode.as_str(),
                    options.mode.as_str()
                ),
            });
        }
        if options.store.is_some() {
            let reason = if self.store.is_some() {
                "a store is already attached"
            } else {
                "a store cannot be attached after registration"
            };
            return Err(HubError::ConflictingConfiguration {
                event_type: self.event_type.name(),
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn mode(&self) -> DistributionMode {
        self.mode
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live subscriber ids in rotation order.
    pub fn subscriber_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// The rotation cursor (shared across engines under [`RotationScope::Process`]).
    pub fn cursor(&self) -> &Arc<RotationCursor> {
        self.selector.cursor()
    }

    pub(crate) fn registry(&self) -> &SubscriberRegistry<E> {
        &self.registry
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Hands `event` to the live subscriber set without touching the store.
    ///
    /// Never blocks and never fails; see [`PublishOutcome`] for what happened.
    pub fn dispatch(&self, event: E) -> PublishOutcome {
        let outcome = match self.mode {
            DistributionMode::RoundRobin => self.dispatch_one(event),
            DistributionMode::Broadcast => self.dispatch_all(event),
        };
        if outcome == PublishOutcome::NoSubscribers {
            self.bus.publish(
                HubEvent::new(HubEventKind::EventDropped).with_event_type(self.event_type.name()),
            );
        }
        outcome
    }

    /// Dispatches `event`, then persists it if a store is attached and somebody was live.
    pub async fn publish(&self, event: E) -> PublishOutcome {
        let Some(store) = &self.store else {
            return self.dispatch(event);
        };
        let copy = event.clone();
        let outcome = self.dispatch(event);
        if outcome != PublishOutcome::NoSubscribers {
            if let Err(e) = store.persist(self.event_type, &copy).await {
                self.bus.publish(
                    HubEvent::new(HubEventKind::StoreFailed)
                        .with_event_type(self.event_type.name())
                        .with_reason(e.to_string()),
                );
            }
        }
        outcome
    }

    /// Removes the subscriber with `id` from rotation and stops its worker.
    ///
    /// Returns `false` if it was not registered (already gone is not an error).
    pub fn unregister(&self, id: &str) -> bool {
        match self.registry.unregister(id) {
            Some(sub) => {
                sub.cancel();
                true
            }
            None => false,
        }
    }

    fn dispatch_one(&self, event: E) -> PublishOutcome {
        let mut event = event;
        let Some(mut turn) = self.selector.select_next(&self.registry) else {
            return PublishOutcome::NoSubscribers;
        };

        // each failed attempt evicts one subscriber, so this is bounded by len
        loop {
            let target = Arc::clone(&turn.subscriber);
            match target.enqueue(event) {
                Ok(queued) => {
                    if queued == Enqueued::DroppedOldest {
                        self.overflowed(&target);
                    }
                    return PublishOutcome::Dispatched {
                        subscriber: Arc::clone(target.id()),
                    };
                }
                Err(Rejected::Full(_)) => {
                    self.overflowed(&target);
                    return PublishOutcome::Overflowed {
                        subscriber: Arc::clone(target.id()),
                    };
                }
                Err(Rejected::Overflow(ev)) => {
                    self.overflowed(&target);
                    self.evict(&target);
                    event = ev;
                }
                Err(Rejected::Closed(ev)) => {
                    self.evict(&target);
                    event = ev;
                }
            }
            match self.selector.retry(&self.registry, &turn) {
                Some(next) => turn = next,
                None => return PublishOutcome::NoSubscribers,
            }
        }
    }

    fn dispatch_all(&self, event: E) -> PublishOutcome {
        let snapshot = self.registry.snapshot();
        let mut live = 0;
        let mut delivered = 0;

        for sub in snapshot.iter() {
            match sub.enqueue(event.clone()) {
                Ok(queued) => {
                    live += 1;
                    delivered += 1;
                    if queued == Enqueued::DroppedOldest {
                        self.overflowed(sub);
                    }
                }
                Err(Rejected::Full(_)) => {
                    live += 1;
                    self.overflowed(sub);
                }
                Err(Rejected::Overflow(_)) => {
                    self.overflowed(sub);
                    self.evict(sub);
                }
                Err(Rejected::Closed(_)) => self.evict(sub),
            }
        }
        if live == 0 {
            PublishOutcome::NoSubscribers
        } else {
            PublishOutcome::Broadcast { delivered }
        }
    }

    fn evict(&self, sub: &Arc<Subscriber<E>>) {
        sub.cancel();
        self.registry.remove(sub);
    }

    fn overflowed(&self, sub: &Arc<Subscriber<E>>) {
        self.bus.publish(
            HubEvent::new(HubEventKind::QueueOverflow)
                .with_event_type(self.event_type.name())
                .with_subscriber(Arc::clone(sub.id()))
                .with_reason(self.overflow.as_str()),
        );
    }

    /// Registers a new subscriber and starts its delivery worker on `tracker`.
    pub(crate) fn connect(
        self: &Arc<Self>,
        id: Arc<str>,
        sink: BoxSink<E>,
        peer: CancellationToken,
        shutdown: &CancellationToken,
        tracker: &TaskTracker,
    ) -> Result<Subscription, HubError> {
        let token = shutdown.child_token();
        let subscriber = Arc::new(Subscriber::new(
            Arc::clone(&id),
            peer,
            token.clone(),
            self.queue_limit,
            self.overflow,
        ));

        if let Err(e) = self.registry.register(Arc::clone(&subscriber)) {
            self.bus.publish(
                HubEvent::new(HubEventKind::SubscriberRejected)
                    .with_event_type(self.event_type.name())
                    .with_subscriber(id),
            );
            return Err(e);
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        let worker = DeliveryWorker::new(
            Arc::clone(self),
            subscriber,
            sink,
            shutdown.clone(),
        );
        tracker.spawn(async move {
            let exit = worker.run().await;
            let _ = exit_tx.send(Some(exit));
        });

        self.bus.publish(
            HubEvent::new(HubEventKind::SubscriberConnected)
                .with_event_type(self.event_type.name())
                .with_subscriber(Arc::clone(&id)),
        );
        Ok(Subscription::new(id, self.event_type, token, exit_rx))
    }
}

impl<E: Event> fmt::Debug for Hub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("event_type", &self.event_type)
            .field("mode", &self.mode)
            .field("subscribers", &self.registry.ids())
            .field("store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Job(u32);
    impl Event for Job {}

    fn hub(mode: DistributionMode, cfg: HubConfig) -> Hub<Job> {
        let options = match mode {
            DistributionMode::RoundRobin => HubOptions::round_robin(),
            DistributionMode::Broadcast => HubOptions::broadcast(),
        };
        Hub::new(options, &cfg, Bus::new(64))
    }

    fn add(hub: &Hub<Job>, id: &str) -> Arc<Subscriber<Job>> {
        let sub = Arc::new(Subscriber::new(
            Arc::from(id),
            CancellationToken::new(),
            CancellationToken::new(),
            hub.queue_limit,
            hub.overflow,
        ));
        hub.registry.register(Arc::clone(&sub)).unwrap();
        sub
    }

    fn queued(sub: &Subscriber<Job>) -> usize {
        sub.queue().len()
    }

    #[test]
    fn test_round_robin_assigns_in_rotation() {
        let hub = hub(DistributionMode::RoundRobin, HubConfig::default());
        let a = add(&hub, "a");
        let b = add(&hub, "b");

        let picks: Vec<_> = (0..3)
            .map(|i| hub.dispatch(Job(i)).subscriber().map(str::to_string))
            .collect();
        assert_eq!(
            picks,
            vec![
                Some("a".to_string()),
                Some("b".to_string()),
                Some("a".to_string())
            ]
        );
        assert_eq!(queued(&a), 2);
        assert_eq!(queued(&b), 1);
    }

    #[test]
    fn test_no_subscribers_drops_event() {
        let hub = hub(DistributionMode::RoundRobin, HubConfig::default());
        let mut rx = hub.bus.subscribe();
        assert_eq!(hub.dispatch(Job(1)), PublishOutcome::NoSubscribers);
        assert_eq!(rx.try_recv().unwrap().kind, HubEventKind::EventDropped);
    }

    #[test]
    fn test_closed_subscriber_is_skipped_and_evicted() {
        let hub = hub(DistributionMode::RoundRobin, HubConfig::default());
        let a = add(&hub, "a");
        let b = add(&hub, "b");
        a.cancel();

        let out = hub.dispatch(Job(1));
        assert_eq!(out.subscriber(), Some("b"));
        assert_eq!(queued(&b), 1);
        assert_eq!(hub.subscriber_ids(), vec!["b"]);
    }

    #[test]
    fn test_closed_head_hands_turn_to_next_in_line() {
        let hub = hub(DistributionMode::RoundRobin, HubConfig::default());
        let subs: Vec<_> = ["a", "b", "c"].iter().map(|id| add(&hub, id)).collect();
        subs[0].cancel();

        let picks: Vec<_> = (0..4)
            .map(|i| hub.dispatch(Job(i)).subscriber().map(str::to_string))
            .collect();
        assert_eq!(
            picks,
            vec![
                Some("b".to_string()),
                Some("c".to_string()),
                Some("b".to_string()),
                Some("c".to_string())
            ]
        );
        assert_eq!(hub.subscriber_ids(), vec!["b", "c"]);
    }

    #[test]
    fn test_closed_middle_does_not_skip_tail() {
        let hub = hub(DistributionMode::RoundRobin, HubConfig::default());
        let subs: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| add(&hub, id)).collect();
        assert_eq!(hub.dispatch(Job(0)).subscriber(), Some("a"));
        subs[1].cancel();

        let picks: Vec<_> = (1..=6)
            .map(|i| hub.dispatch(Job(i)).subscriber().map(str::to_string))
            .collect();
        let expected: Vec<_> = ["c", "d", "a", "c", "d", "a"]
            .iter()
            .map(|s| Some(s.to_string()))
            .collect();
        assert_eq!(picks, expected);
    }

    #[test]
    fn test_all_closed_means_no_subscribers() {
        let hub = hub(DistributionMode::RoundRobin, HubConfig::default());
        add(&hub, "a").cancel();
        add(&hub, "b").cancel();
        assert_eq!(hub.dispatch(Job(1)), PublishOutcome::NoSubscribers);
        assert!(hub.is_empty());
    }

    #[test]
    fn test_drop_newest_reports_overflowed() {
        let cfg = HubConfig {
            queue_capacity: 1,
            overflow: OverflowPolicy::DropNewest,
            ..HubConfig::default()
        };
        let hub = hub(DistributionMode::RoundRobin, cfg);
        let a = add(&hub, "a");
        assert!(hub.dispatch(Job(1)).is_delivered());
        assert_eq!(
            hub.dispatch(Job(2)),
            PublishOutcome::Overflowed {
                subscriber: Arc::from("a")
            }
        );
        assert_eq!(queued(&a), 1);
    }

    #[test]
    fn test_disconnect_overflow_redispatches() {
        let cfg = HubConfig {
            queue_capacity: 1,
            overflow: OverflowPolicy::Disconnect,
            ..HubConfig::default()
        };
        let hub = hub(DistributionMode::RoundRobin, cfg);
        let a = add(&hub, "a");
        let b = add(&hub, "b");

        hub.dispatch(Job(1)); // a
        hub.dispatch(Job(2)); // b
        // a is full: disconnected, event goes to b, which is full too
        assert_eq!(hub.dispatch(Job(3)), PublishOutcome::NoSubscribers);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(hub.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let hub = hub(DistributionMode::Broadcast, HubConfig::default());
        let a = add(&hub, "a");
        let b = add(&hub, "b");
        assert_eq!(
            hub.dispatch(Job(7)),
            PublishOutcome::Broadcast { delivered: 2 }
        );
        assert_eq!(queued(&a), 1);
        assert_eq!(queued(&b), 1);
        assert_eq!(hub.cursor().position(), 0);
    }

    #[test]
    fn test_unregister_cancels_and_is_idempotent() {
        let hub = hub(DistributionMode::RoundRobin, HubConfig::default());
        let a = add(&hub, "a");
        assert!(hub.unregister("a"));
        assert!(a.is_cancelled());
        assert!(!hub.unregister("a"));
    }

    #[test]
    fn test_conflicting_mode_rejected() {
        let hub = hub(DistributionMode::RoundRobin, HubConfig::default());
        assert!(hub.check_compatible(&HubOptions::round_robin()).is_ok());
        let err = hub.check_compatible(&HubOptions::broadcast()).unwrap_err();
        assert_eq!(err.as_label(), "hub_conflicting_configuration");
    }
}
