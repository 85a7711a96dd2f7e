//! # Subscriber registry for one event type.
//!
//! Ordered collection of live subscribers. Insertion order is preserved
//! because round-robin fairness depends on a stable enumeration order.
//!
//! ## Rules
//! - Copy-on-write: `register`/`remove` swap in a new immutable slice, so a
//!   [`snapshot`](SubscriberRegistry::snapshot) never tears and never blocks writers for long.
//! - Ids are unique per registry; a collision is [`HubError::DuplicateSubscriber`].
//! - Removal is idempotent: removing an absent subscriber is a no-op.
//! - Removal by handle (`remove`) only ever removes that exact subscriber, so a
//!   late teardown cannot evict a newer connection that reused the id.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::HubError;
use crate::event::EventType;
use crate::hub::subscriber::Subscriber;

pub(crate) type Snapshot<E> = Arc<[Arc<Subscriber<E>>]>;

pub(crate) struct SubscriberRegistry<E> {
    event_type: EventType,
    members: RwLock<Snapshot<E>>,
}

impl<E> SubscriberRegistry<E> {
    pub(crate) fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            members: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Appends `subscriber`; fails if its id is already registered.
    pub(crate) fn register(&self, subscriber: Arc<Subscriber<E>>) -> Result<(), HubError> {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        if members.iter().any(|s| s.id() == subscriber.id()) {
            return Err(HubError::DuplicateSubscriber {
                event_type: self.event_type.name(),
                subscriber: subscriber.id().to_string(),
            });
        }
        let mut next = Vec::with_capacity(members.len() + 1);
        next.extend(members.iter().cloned());
        next.push(subscriber);
        *members = Arc::from(next);
        Ok(())
    }

    /// Removes the subscriber with `id`, returning it if present.
    pub(crate) fn unregister(&self, id: &str) -> Option<Arc<Subscriber<E>>> {
        self.remove_where(|s| &**s.id() == id)
    }

    /// Removes exactly `subscriber` (pointer identity). Returns `false` if absent.
    pub(crate) fn remove(&self, subscriber: &Arc<Subscriber<E>>) -> bool {
        self.remove_where(|s| Arc::ptr_eq(s, subscriber)).is_some()
    }

    fn remove_where(
        &self,
        pred: impl Fn(&Arc<Subscriber<E>>) -> bool,
    ) -> Option<Arc<Subscriber<E>>> {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        let pos = members.iter().position(|s| pred(s))?;
        let removed = Arc::clone(&members[pos]);
        let next: Vec<_> = members
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != pos)
            .map(|(_, s)| Arc::clone(s))
            .collect();
        *members = Arc::from(next);
        Some(removed)
    }

    /// Immutable ordered view of the live subscribers.
    pub(crate) fn snapshot(&self) -> Snapshot<E> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*members)
    }

    pub(crate) fn len(&self) -> usize {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Ids in rotation order.
    pub(crate) fn ids(&self) -> Vec<String> {
        self.snapshot().iter().map(|s| s.id().to_string()).collect()
    }
}
