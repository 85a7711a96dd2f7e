use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::{Event, EventType};
use crate::store::EventStore;

/// Stored copy of a published event.
#[derive(Clone, Debug)]
pub struct StoredEvent<E> {
    /// When the event was persisted.
    pub stored_at: SystemTime,
    /// The event.
    pub event: E,
}

/// Process-local [`EventStore`] keeping events in insertion order.
///
/// With a limit, persisting past it fails with [`StoreError`].
pub struct InMemoryEventStore<E> {
    records: Mutex<Vec<StoredEvent<E>>>,
    limit: Option<usize>,
}

impl<E: Event> InMemoryEventStore<E> {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            limit: None,
        }
    }

    /// Creates a store that refuses events once it holds `limit` of them.
    pub fn bounded(limit: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            limit: Some(limit),
        }
    }

    /// Returns the persisted events in insertion order.
    pub fn events(&self) -> Vec<E> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.iter().map(|r| r.event.clone()).collect()
    }

    /// Removes and returns every persisted record.
    pub fn drain(&self) -> Vec<StoredEvent<E>> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *records)
    }

    /// Number of persisted events.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Event> Default for InMemoryEventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Event> EventStore<E> for InMemoryEventStore<E> {
    async fn persist(&self, event_type: EventType, event: &E) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(limit) = self.limit {
            if records.len() >= limit {
                return Err(StoreError::new(format!(
                    "in-memory store for {event_type} is full ({limit})"
                )));
            }
        }
        records.push(StoredEvent {
            stored_at: SystemTime::now(),
            event: event.clone(),
        });
        Ok(())
    }
}
