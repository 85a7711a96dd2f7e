//! # rrhub
//!
//! **rrhub** is an in-process event distribution engine for Rust.
//!
//! Publishers hand events of a given type to the engine; the engine
//! load-balances them round-robin across the subscribers currently connected
//! for that type. Every subscriber has its own ordered delivery queue drained
//! by a dedicated task, so a slow or failing transport never blocks the
//! publisher or the other subscribers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  publisher   │   │  publisher   │   │  publisher   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Engine                                                           │
//! │  - hubs: TypeId ─► Hub<E> (one per registered event type)         │
//! │  - Bus (broadcast diagnostics)                                    │
//! │  - shutdown token + TaskTracker for delivery workers              │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Hub<E>                                                           │
//! │  - SubscriberRegistry (ordered, copy-on-write)                    │
//! │  - RotationCursor (atomic, per engine or per process)             │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   [queue sub-1]      [queue sub-2]      [queue sub-N]
//!        │                  │                  │
//!   DeliveryWorker     DeliveryWorker     DeliveryWorker
//!        │                  │                  │
//!   EventSink::send    EventSink::send    EventSink::send
//! ```
//!
//! ### Lifecycle of a subscriber
//! ```text
//! on_subscriber_connected(id, sink, token)
//!   ├─► registry.register        (duplicate id ─► HubError::DuplicateSubscriber)
//!   ├─► spawn DeliveryWorker
//!   └─► Subscription
//!
//! worker loop {
//!   ├─► wait: queue non-empty | cancelled
//!   ├─► pop head, re-check cancellation
//!   └─► sink.send(event)
//!          ├─ Ok            ─► continue
//!          └─ Err / panic   ─► exit
//! }
//!
//! On exit: remove from registry, close queue, discard backlog, SubscriberRemoved
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                       |
//! |-------------------|----------------------------------------------------------------|------------------------------------------|
//! | **Distribution**  | Round-robin (or broadcast) fan-out per event type.             | [`Engine`], [`Hub`], [`DistributionMode`]|
//! | **Connections**   | Register subscribers, observe their exit.                      | [`Subscription`], [`WorkerExit`]         |
//! | **Transports**    | Abstract "send one event to one peer" capability.              | [`EventSink`], [`SinkFn`]                |
//! | **Storage**       | Optional persistence side call for published events.           | [`EventStore`], [`InMemoryEventStore`]   |
//! | **Diagnostics**   | Lifecycle records and pluggable observers.                     | [`HubEvent`], [`Observe`], [`LogWriter`] |
//! | **Errors**        | Typed errors for configuration, transports and stores.         | [`HubError`], [`SendError`]              |
//! | **Configuration** | Queue bounds, overflow policy, cursor scope, shutdown grace.   | [`HubConfig`]                            |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use rrhub::{Engine, Event, HubConfig, HubOptions, LogWriter};
//!
//! #[derive(Clone, Debug)]
//! struct Job(u32);
//! impl Event for Job {}
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::builder(HubConfig::default())
//!         .with_observer(Arc::new(LogWriter::new()))
//!         .with_hub::<Job>(HubOptions::round_robin())
//!         .build()?;
//!
//!     let (tx_a, mut rx_a) = mpsc::unbounded_channel();
//!     let (tx_b, mut rx_b) = mpsc::unbounded_channel();
//!     engine.on_subscriber_connected::<Job, _>("a", tx_a, CancellationToken::new())?;
//!     engine.on_subscriber_connected::<Job, _>("b", tx_b, CancellationToken::new())?;
//!
//!     for i in 1..=3 {
//!         engine.publish(Job(i)).await?;
//!     }
//!
//!     // a: 1, 3   b: 2
//!     assert_eq!(rx_a.recv().await.map(|j| j.0), Some(1));
//!     assert_eq!(rx_b.recv().await.map(|j| j.0), Some(2));
//!     assert_eq!(rx_a.recv().await.map(|j| j.0), Some(3));
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod config;
pub mod diagnostics;
mod error;
mod event;
mod hub;
mod observers;
mod sink;
mod store;

// ---- Public re-exports ----

pub use config::{HubConfig, OverflowPolicy, RotationScope};
pub use diagnostics::{HubEvent, HubEventKind};
pub use error::{HubError, SendError, StoreError};
pub use event::{Event, EventType};
pub use hub::{
    DistributionMode, Engine, EngineBuilder, Hub, HubOptions, PublishOutcome, RotationCursor,
    Subscription, WorkerExit,
};
pub use observers::{LogWriter, Observe, ObserverSet};
pub use sink::{BoxSink, EventSink, SinkFn};
pub use store::{EventStore, InMemoryEventStore, StoredEvent};
