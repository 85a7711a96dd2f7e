//! # Observer trait.
//!
//! Provides [`Observe`], the extension point for plugging custom diagnostic
//! handlers into the engine.
//!
//! Each observer gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-observer bounded queue** (capacity via [`Observe::queue_capacity`])
//! - **Panic isolation** (panics are reported as `HubEventKind::ObserverPanicked`)
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use rrhub::{HubEvent, HubEventKind, Observe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Observe for FailureCounter {
//!     async fn on_event(&self, ev: &HubEvent) {
//!         if matches!(ev.kind, HubEventKind::SendFailed) {
//!             // increment a counter, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failures" }
//! }
//! ```

use async_trait::async_trait;

use crate::diagnostics::HubEvent;

/// Diagnostic observer.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this observer's queue.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes a single record.
    ///
    /// Called from a dedicated worker task, records arrive in FIFO order.
    async fn on_event(&self, event: &HubEvent);

    /// Returns the observer name used in overflow/panic records.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this observer (clamped to at least 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
