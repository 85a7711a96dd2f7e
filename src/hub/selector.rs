//! # Round-robin selection.
//!
//! A [`RotationCursor`] tracks whose turn is next for one event type. The
//! selector reads the registry snapshot, picks `cursor % len` and stores
//! `(index + 1) % len` in one atomic step, so concurrent publishers never pick
//! the same position twice in a row.
//!
//! ## Rules
//! - Empty snapshot → `None` (the event has nobody to go to).
//! - The cursor is re-reduced modulo the current length on every selection; when
//!   the set shrinks, the next pick simply indexes into the re-numbered set.
//! - A turn whose subscriber is evicted during dispatch is retried at the same
//!   index in the re-numbered set ([`RoundRobinSelector::retry`]), so the
//!   cursor moves once per dispatched event and nobody is skipped.
//! - Cursors are per engine by default; with [`RotationScope::Process`](crate::RotationScope::Process)
//!   every engine in the process shares one cursor per event type.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::event::EventType;
use crate::hub::registry::SubscriberRegistry;
use crate::hub::subscriber::Subscriber;

static PROCESS_CURSORS: OnceLock<Mutex<HashMap<TypeId, Arc<RotationCursor>>>> = OnceLock::new();

/// Shared rotation pointer for one event type.
#[derive(Debug, Default)]
pub struct RotationCursor {
    position: AtomicUsize,
}

impl RotationCursor {
    /// Creates a cursor starting at position 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position (the index the next selection will start from).
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    /// Returns the index to serve in a set of `len` members and advances by one.
    ///
    /// `len` must be non-zero.
    pub(crate) fn advance(&self, len: usize) -> usize {
        debug_assert!(len > 0);
        let prev = self
            .position
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some((c % len + 1) % len)
            });
        match prev {
            Ok(p) | Err(p) => p % len,
        }
    }

    /// Moves the cursor from `expected` to `next` unless another publisher got there first.
    pub(crate) fn realign(&self, expected: usize, next: usize) {
        let _ = self.position.compare_exchange(
            expected,
            next,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Process-wide cursor for `event_type`, created on first use.
    pub(crate) fn process_wide(event_type: EventType) -> Arc<RotationCursor> {
        let table = PROCESS_CURSORS.get_or_init(|| Mutex::new(HashMap::new()));
        let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(event_type.id()).or_default())
    }
}

/// One claimed position in the rotation.
pub(crate) struct Turn<E> {
    index: usize,
    len: usize,
    pub(crate) subscriber: Arc<Subscriber<E>>,
}

impl<E> Turn<E> {
    /// Cursor value stored when this turn was taken.
    fn stored(&self) -> usize {
        (self.index + 1) % self.len
    }
}

/// Picks the next live subscriber for one event type.
pub(crate) struct RoundRobinSelector {
    cursor: Arc<RotationCursor>,
}

impl RoundRobinSelector {
    pub(crate) fn new(cursor: Arc<RotationCursor>) -> Self {
        Self { cursor }
    }

    pub(crate) fn cursor(&self) -> &Arc<RotationCursor> {
        &self.cursor
    }

    /// Claims the next turn, or `None` if nobody is registered.
    pub(crate) fn select_next<E>(&self, registry: &SubscriberRegistry<E>) -> Option<Turn<E>> {
        let snapshot = registry.snapshot();
        if snapshot.is_empty() {
            return None;
        }
        let len = snapshot.len();
        let index = self.cursor.advance(len);
        Some(Turn {
            index,
            len,
            subscriber: Arc::clone(&snapshot[index]),
        })
    }

    /// Re-serves `turn` after its subscriber was evicted.
    ///
    /// The same index is read from the current (smaller) snapshot and the
    /// cursor is moved past it, so the claim made by `turn` is reused rather
    /// than a second position being consumed.
    pub(crate) fn retry<E>(
        &self,
        registry: &SubscriberRegistry<E>,
        turn: &Turn<E>,
    ) -> Option<Turn<E>> {
        let snapshot = registry.snapshot();
        if snapshot.is_empty() {
            return None;
        }
        let len = snapshot.len();
        let index = turn.index % len;
        let next = Turn {
            index,
            len,
            subscriber: Arc::clone(&snapshot[index]),
        };
        self.cursor.realign(turn.stored(), next.stored());
        Some(next)
    }
}
