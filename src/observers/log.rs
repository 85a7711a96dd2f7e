//! # LogWriter: diagnostics to `tracing`.
//!
//! Maps every [`HubEvent`] to a structured `tracing` event under the `rrhub`
//! target. Install any `tracing` subscriber in the host to collect them.
//!
//! ## Levels
//! - `debug`: registration, connect, removal after a clean cancel, dropped events
//! - `warn`: overflow, send failure, store failure, rejected connections, grace exceeded
//! - `error`: observer panics

use async_trait::async_trait;

use crate::diagnostics::{HubEvent, HubEventKind};
use crate::observers::Observe;

/// Diagnostics writer backed by `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &HubEvent) {
        let event_type = e.event_type.as_deref().unwrap_or("-");
        let subscriber = e.subscriber.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            HubEventKind::HubRegistered => {
                tracing::debug!(target: "rrhub", event_type, mode = reason, "hub registered");
            }
            HubEventKind::SubscriberConnected => {
                tracing::debug!(target: "rrhub", event_type, subscriber, "subscriber connected");
            }
            HubEventKind::SubscriberRejected => {
                tracing::warn!(target: "rrhub", event_type, subscriber, "duplicate subscriber rejected");
            }
            HubEventKind::SubscriberRemoved => {
                tracing::debug!(
                    target: "rrhub",
                    event_type,
                    subscriber,
                    exit = reason,
                    discarded = e.count.unwrap_or(0),
                    "subscriber removed"
                );
            }
            HubEventKind::EventDropped => {
                tracing::debug!(target: "rrhub", event_type, "no subscribers, event dropped");
            }
            HubEventKind::QueueOverflow => {
                tracing::warn!(target: "rrhub", event_type, subscriber, policy = reason, "queue overflow");
            }
            HubEventKind::SendFailed => {
                tracing::warn!(target: "rrhub", event_type, subscriber, error = reason, "send failed");
            }
            HubEventKind::StoreFailed => {
                tracing::warn!(target: "rrhub", event_type, error = reason, "event store failed");
            }
            HubEventKind::ObserverOverflow => {
                tracing::warn!(target: "rrhub", observer = subscriber, reason, "observer overflow");
            }
            HubEventKind::ObserverPanicked => {
                tracing::error!(target: "rrhub", observer = subscriber, info = reason, "observer panicked");
            }
            HubEventKind::ShutdownRequested => {
                tracing::debug!(target: "rrhub", "shutdown requested");
            }
            HubEventKind::AllStoppedWithin => {
                tracing::debug!(target: "rrhub", "all delivery workers stopped within grace");
            }
            HubEventKind::GraceExceeded => {
                tracing::warn!(target: "rrhub", "shutdown grace exceeded");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
