//! # Delivery worker: one per subscriber.
//!
//! Drains the subscriber's queue strictly in order and forwards each event to
//! its [`EventSink`](crate::EventSink).
//!
//! ## State machine
//! ```text
//!            ┌──────────────────────────────┐
//!            ▼                              │ Ok
//!       ┌──────────┐  event   ┌─────────┐   │
//!  ───► │ Draining │ ───────► │ Sending │ ──┘
//!       └────┬─────┘          └────┬────┘
//!   cancel   │                     │ Err / panic / Cancelled
//!            ▼                     ▼
//!       ┌───────────────────────────────┐
//!       │ Terminating                   │
//!       │  - cancel own token           │
//!       │  - remove from registry       │
//!       │  - close queue, discard rest  │
//!       │  - publish SubscriberRemoved  │
//!       └───────────────────────────────┘
//! ```
//!
//! ## Rules
//! - Cancellation is checked before each dequeue and before each send, never mid-send.
//! - The in-flight event is never handed to another subscriber (at-most-once).
//! - Sink panics are caught and treated as send failures.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{HubEvent, HubEventKind};
use crate::error::SendError;
use crate::event::Event;
use crate::hub::event_hub::Hub;
use crate::hub::subscriber::Subscriber;
use crate::observers::panic_message;
use crate::sink::{BoxSink, EventSink};

/// Why a delivery worker terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The peer's cancellation token fired, or the transport reported cancellation.
    Cancelled,
    /// Disconnected by the engine (explicit disconnect, unregister, queue overflow).
    Disconnected,
    /// The engine is shutting down.
    Shutdown,
    /// The sink returned an error.
    SendFailed(SendError),
    /// The sink panicked.
    SinkPanicked(String),
    /// The worker task was aborted or panicked outside the sink.
    Aborted,
}

impl WorkerExit {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerExit::Cancelled => "cancelled",
            WorkerExit::Disconnected => "disconnected",
            WorkerExit::Shutdown => "shutdown",
            WorkerExit::SendFailed(_) => "send_failed",
            WorkerExit::SinkPanicked(_) => "sink_panicked",
            WorkerExit::Aborted => "aborted",
        }
    }

    /// True when the transport failed rather than being cancelled.
    pub fn is_failure(&self) -> bool {
        matches!(self, WorkerExit::SendFailed(_) | WorkerExit::SinkPanicked(_))
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::SendFailed(e) => write!(f, "send failed: {e}"),
            WorkerExit::SinkPanicked(info) => write!(f, "sink panicked: {info}"),
            other => f.write_str(other.as_label()),
        }
    }
}

pub(crate) struct DeliveryWorker<E: Event> {
    hub: Arc<Hub<E>>,
    subscriber: Arc<Subscriber<E>>,
    sink: BoxSink<E>,
    shutdown: CancellationToken,
}

impl<E: Event> DeliveryWorker<E> {
    pub(crate) fn new(
        hub: Arc<Hub<E>>,
        subscriber: Arc<Subscriber<E>>,
        sink: BoxSink<E>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            hub,
            subscriber,
            sink,
            shutdown,
        }
    }

    /// Runs until cancellation or send failure, then tears the subscriber down.
    pub(crate) async fn run(mut self) -> WorkerExit {
        let exit = self.deliver().await;
        self.terminate(&exit);
        exit
    }

    async fn deliver(&mut self) -> WorkerExit {
        loop {
            // Draining
            let next = tokio::select! {
                biased;
                _ = self.subscriber.cancelled() => return self.cancel_reason(),
                ev = self.subscriber.queue().recv() => ev,
            };
            let Some(event) = next else {
                return self.cancel_reason();
            };
            if self.subscriber.is_cancelled() {
                return self.cancel_reason();
            }

            // Sending
            let sent = std::panic::AssertUnwindSafe(self.sink.send(event))
                .catch_unwind()
                .await;
            match sent {
                Ok(Ok(())) => {}
                Ok(Err(SendError::Cancelled)) => return WorkerExit::Cancelled,
                Ok(Err(e)) => return WorkerExit::SendFailed(e),
                Err(panic_err) => return WorkerExit::SinkPanicked(panic_message(&*panic_err)),
            }
        }
    }

    fn cancel_reason(&self) -> WorkerExit {
        if self.shutdown.is_cancelled() {
            WorkerExit::Shutdown
        } else if self.subscriber.is_peer_cancelled() {
            WorkerExit::Cancelled
        } else {
            WorkerExit::Disconnected
        }
    }

    // Terminating
    fn terminate(&self, exit: &WorkerExit) {
        self.subscriber.cancel();
        self.hub.registry().remove(&self.subscriber);
        let discarded = self.subscriber.queue().close_and_drain();

        let event_type = self.hub.event_type().name();
        let id = Arc::clone(self.subscriber.id());
        let bus = self.hub.bus();

        if exit.is_failure() {
            bus.publish(
                HubEvent::new(HubEventKind::SendFailed)
                    .with_event_type(event_type)
                    .with_subscriber(Arc::clone(&id))
                    .with_reason(exit.to_string()),
            );
        }
        bus.publish(
            HubEvent::new(HubEventKind::SubscriberRemoved)
                .with_event_type(event_type)
                .with_subscriber(id)
                .with_reason(exit.as_label())
                .with_count(discarded as u64),
        );
    }
}
