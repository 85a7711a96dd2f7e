//! # Diagnostic records emitted by the engine.
//!
//! [`HubEventKind`] classifies what happened; [`HubEvent`] carries the metadata
//! (event type, subscriber id, reason, counters).
//!
//! ## Ordering guarantees
//! Each record has a process-wide sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use rrhub::{HubEvent, HubEventKind};
//!
//! let ev = HubEvent::new(HubEventKind::SendFailed)
//!     .with_event_type("demo::Order")
//!     .with_subscriber("worker-1")
//!     .with_reason("connection reset");
//!
//! assert_eq!(ev.kind, HubEventKind::SendFailed);
//! assert_eq!(ev.subscriber.as_deref(), Some("worker-1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

static RECORD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostic records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubEventKind {
    // === Configuration ===
    /// A hub was registered for an event type.
    ///
    /// Sets: `event_type`, `reason` (distribution mode)
    HubRegistered,

    // === Subscriber lifecycle ===
    /// Subscriber registered and its delivery worker started.
    ///
    /// Sets: `event_type`, `subscriber`
    SubscriberConnected,

    /// Connection refused because the id is already live for the type.
    ///
    /// Sets: `event_type`, `subscriber`
    SubscriberRejected,

    /// Subscriber left the rotation and its worker exited.
    ///
    /// Sets: `event_type`, `subscriber`, `reason` (exit label), `count` (discarded events)
    SubscriberRemoved,

    // === Delivery ===
    /// An event was published while no subscriber was live; it was dropped.
    ///
    /// Sets: `event_type`
    EventDropped,

    /// A bounded queue overflowed.
    ///
    /// Sets: `event_type`, `subscriber`, `reason` (policy applied)
    QueueOverflow,

    /// The send capability failed; the subscriber is being torn down.
    ///
    /// Sets: `event_type`, `subscriber`, `reason`
    SendFailed,

    /// The storage collaborator failed to persist an event (dispatch unaffected).
    ///
    /// Sets: `event_type`, `reason`
    StoreFailed,

    // === Observers ===
    /// An observer dropped a record (queue full or worker closed).
    ///
    /// Sets: `subscriber` (observer name), `reason`
    ObserverOverflow,

    /// An observer panicked while processing a record.
    ///
    /// Sets: `subscriber` (observer name), `reason`
    ObserverPanicked,

    // === Shutdown ===
    /// Engine shutdown requested.
    ShutdownRequested,

    /// All delivery workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers were still running.
    GraceExceeded,
}

impl HubEventKind {
    /// Stable snake_case name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            HubEventKind::HubRegistered => "hub_registered",
            HubEventKind::SubscriberConnected => "subscriber_connected",
            HubEventKind::SubscriberRejected => "subscriber_rejected",
            HubEventKind::SubscriberRemoved => "subscriber_removed",
            HubEventKind::EventDropped => "event_dropped",
            HubEventKind::QueueOverflow => "queue_overflow",
            HubEventKind::SendFailed => "send_failed",
            HubEventKind::StoreFailed => "store_failed",
            HubEventKind::ObserverOverflow => "observer_overflow",
            HubEventKind::ObserverPanicked => "observer_panicked",
            HubEventKind::ShutdownRequested => "shutdown_requested",
            HubEventKind::AllStoppedWithin => "all_stopped_within_grace",
            HubEventKind::GraceExceeded => "grace_exceeded",
        }
    }
}

/// Diagnostic record with optional metadata.
#[derive(Clone, Debug)]
pub struct HubEvent {
    /// Process-wide, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Record classification.
    pub kind: HubEventKind,
    /// Event type name, if applicable.
    pub event_type: Option<Arc<str>>,
    /// Subscriber id (or observer name), if applicable.
    pub subscriber: Option<Arc<str>>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Counter attached to the record (e.g. discarded events).
    pub count: Option<u64>,
}

impl HubEvent {
    /// Creates a new record of the given kind with current timestamp and next sequence number.
    pub fn new(kind: HubEventKind) -> Self {
        Self {
            seq: RECORD_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            event_type: None,
            subscriber: None,
            reason: None,
            count: None,
        }
    }

    #[inline]
    pub fn with_event_type(mut self, event_type: impl Into<Arc<str>>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    #[inline]
    pub fn with_subscriber(mut self, subscriber: impl Into<Arc<str>>) -> Self {
        self.subscriber = Some(subscriber.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Creates an observer overflow record.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        HubEvent::new(HubEventKind::ObserverOverflow)
            .with_subscriber(observer)
            .with_reason(reason)
    }

    /// Creates an observer panic record.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        HubEvent::new(HubEventKind::ObserverPanicked)
            .with_subscriber(observer)
            .with_reason(info)
    }

    #[inline]
    pub fn is_observer_overflow(&self) -> bool {
        matches!(self.kind, HubEventKind::ObserverOverflow)
    }
}
