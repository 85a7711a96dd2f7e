//! # Diagnostic observers.
//!
//! This module provides the [`Observe`] trait and built-in implementations
//! for handling [`HubEvent`](crate::HubEvent)s published on the engine's
//! [`Bus`](crate::diagnostics::Bus).
//!
//! ## Architecture
//! ```text
//! Bus ──► observer listener (in Engine) ──► ObserverSet::emit(&HubEvent)
//!                                               ┌─────────┼─────────┐
//!                                               ▼         ▼         ▼
//!                                           LogWriter  Metrics   Custom
//! ```
//!
//! Observers are for monitoring only. They never see application events and
//! cannot influence dispatch.

mod log;
mod observer;
mod observer_set;

pub use log::LogWriter;
pub use observer::Observe;
pub use observer_set::ObserverSet;

pub(crate) use observer_set::panic_message;
