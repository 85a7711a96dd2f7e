//! # Application events and their type identity.
//!
//! An application event is any type implementing the [`Event`] marker trait.
//! The event's Rust type is the partition key for everything in the engine:
//! registries, rotation cursors and queues are all scoped to one [`EventType`].
//!
//! ```rust
//! use rrhub::{Event, EventType};
//!
//! #[derive(Clone, Debug)]
//! struct OrderPlaced { id: u64 }
//!
//! impl Event for OrderPlaced {}
//!
//! let t = EventType::of::<OrderPlaced>();
//! assert!(t.name().ends_with("OrderPlaced"));
//! ```

use std::any::TypeId;
use std::fmt;

/// Marker for application payloads distributed by the engine.
///
/// `Clone` is required so broadcast hubs can hand a copy to every subscriber;
/// round-robin hubs never clone.
pub trait Event: Clone + Send + Sync + 'static {
    /// Human-readable name of the event type, used in logs and errors.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// Identity of an event type (the partition key).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
}

impl EventType {
    /// Returns the identity of `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: E::type_name(),
        }
    }

    /// The underlying [`TypeId`].
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Readable type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.name).finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct A;
    impl Event for A {}

    #[derive(Clone)]
    struct B;
    impl Event for B {
        fn type_name() -> &'static str {
            "b-events"
        }
    }

    #[test]
    fn test_distinct_types_have_distinct_keys() {
        assert_ne!(EventType::of::<A>(), EventType::of::<B>());
        assert_eq!(EventType::of::<A>(), EventType::of::<A>());
    }

    #[test]
    fn test_name_override() {
        assert_eq!(EventType::of::<B>().name(), "b-events");
        assert_eq!(EventType::of::<B>().to_string(), "b-events");
    }
}
