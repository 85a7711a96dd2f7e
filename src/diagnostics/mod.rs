//! Engine diagnostics: records and broadcast bus.
//!
//! Every lifecycle transition of the engine (connect, removal, overflow, send
//! failure, dropped events) is published as a [`HubEvent`] on the engine's
//! [`Bus`]. Observers attached through [`EngineBuilder::with_observers`](crate::EngineBuilder::with_observers)
//! receive them through the [`ObserverSet`](crate::ObserverSet).
//!
//! ## Contents
//! - [`HubEventKind`], [`HubEvent`] classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Hub::dispatch`, delivery workers, `Engine::on_subscriber_connected`,
//!   `ObserverSet` workers (overflow/panic).
//! - **Consumers**: the engine's observer listener, and anyone holding [`Engine::diagnostics`](crate::Engine::diagnostics).

mod bus;
mod record;

pub use bus::Bus;
pub use record::{HubEvent, HubEventKind};
