//! Error types used by the distribution engine, its transports and stores.
//!
//! This module defines three enums:
//!
//! - [`HubError`]: errors raised by the engine itself (configuration, connect, shutdown).
//! - [`SendError`]: errors raised by an [`EventSink`](crate::EventSink) while delivering.
//! - [`StoreError`]: errors raised by an [`EventStore`](crate::EventStore).
//!
//! All of them provide `as_label` (stable snake_case for logs/metrics) and `as_message`.
//! Only [`HubError`] ever reaches publishers; send and store failures are contained
//! inside the engine and surface as diagnostics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the distribution engine.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// A subscriber with the same id is already registered for this event type.
    ///
    /// The hosting transport should reject the duplicate connection.
    #[error("subscriber `{subscriber}` is already connected for `{event_type}`")]
    DuplicateSubscriber {
        /// Event type name.
        event_type: &'static str,
        /// Colliding subscriber id.
        subscriber: String,
    },

    /// The hub for this event type was configured twice with conflicting options.
    ///
    /// Raised at startup; treat as fatal.
    #[error("conflicting hub configuration for `{event_type}`: {reason}")]
    ConflictingConfiguration {
        /// Event type name.
        event_type: &'static str,
        /// What conflicted.
        reason: String,
    },

    /// No hub has been registered for this event type.
    #[error("no hub registered for `{event_type}`")]
    HubNotConfigured {
        /// Event type name.
        event_type: &'static str,
    },

    /// The engine has been shut down and no longer accepts subscribers.
    #[error("engine is shut down")]
    EngineShutdown,

    /// Shutdown grace period was exceeded; some delivery workers were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Subscribers (as `event_type/id`) still registered when the grace ran out.
        stuck: Vec<String>,
    },
}

impl HubError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rrhub::HubError;
    ///
    /// let err = HubError::HubNotConfigured { event_type: "demo::Order" };
    /// assert_eq!(err.as_label(), "hub_not_configured");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HubError::DuplicateSubscriber { .. } => "hub_duplicate_subscriber",
            HubError::ConflictingConfiguration { .. } => "hub_conflicting_configuration",
            HubError::HubNotConfigured { .. } => "hub_not_configured",
            HubError::EngineShutdown => "hub_engine_shutdown",
            HubError::GraceExceeded { .. } => "hub_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HubError::DuplicateSubscriber {
                event_type,
                subscriber,
            } => format!("duplicate subscriber id={subscriber} type={event_type}"),
            HubError::ConflictingConfiguration { event_type, reason } => {
                format!("misconfigured type={event_type}: {reason}")
            }
            HubError::HubNotConfigured { event_type } => {
                format!("publish/connect before register for type={event_type}")
            }
            HubError::EngineShutdown => "engine shut down".to_string(),
            HubError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck subscribers={stuck:?}")
            }
        }
    }
}

/// # Errors produced by a send capability.
///
/// Any of these terminates the subscriber's delivery worker; the in-flight
/// event is not redelivered elsewhere.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The remote end (or local channel) is gone.
    #[error("sink closed")]
    Closed,

    /// The transport observed the peer's cancellation while sending.
    #[error("sink cancelled")]
    Cancelled,

    /// Transport-specific failure.
    #[error("send failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },
}

impl SendError {
    /// Convenience constructor for [`SendError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        SendError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SendError::Closed => "send_closed",
            SendError::Cancelled => "send_cancelled",
            SendError::Failed { .. } => "send_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SendError::Closed => "sink closed".to_string(),
            SendError::Cancelled => "peer cancelled".to_string(),
            SendError::Failed { error } => format!("error: {error}"),
        }
    }
}

/// # Error produced by a storage collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("event store failure: {message}")]
pub struct StoreError {
    /// The underlying error message.
    pub message: String,
}

impl StoreError {
    /// Creates a new store error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        "store_failed"
    }
}
