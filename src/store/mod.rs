//! # Optional storage collaborator.
//!
//! A hub registered with an [`EventStore`] persists every published event
//! after it has been handed to the in-memory dispatch. Storage is a side call:
//! its failure is reported as a `StoreFailed` diagnostic and never blocks or
//! fails the publish.

mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::{Event, EventType};

pub use memory::{InMemoryEventStore, StoredEvent};

/// Durable (or not) sink for published events, e.g. for later replay.
#[async_trait]
pub trait EventStore<E: Event>: Send + Sync + 'static {
    /// Persists one event of type `event_type`.
    async fn persist(&self, event_type: EventType, event: &E) -> Result<(), StoreError>;
}
