//! Distribution core: per-type hubs, subscribers and delivery workers.
//!
//! The only public API from this module is [`Engine`] (with its builder),
//! the typed [`Hub`] handle and the connection/outcome types. Everything else
//! is internal:
//! - [`queue`]: per-subscriber FIFO with optional bound and overflow policy;
//! - [`subscriber`]: one connected consumer (queue + cancellation);
//! - [`registry`]: ordered, copy-on-write set of live subscribers per type;
//! - [`selector`]: rotation cursor and round-robin selection;
//! - [`worker`]: per-subscriber delivery task;
//! - [`event_hub`]: dispatch and connect for one event type;
//! - [`engine`]: registration table, publish entry point, shutdown.
//!
//! ## Wiring
//! ```text
//! Engine::publish(E) ──► Hub<E>::dispatch ──► RoundRobinSelector ──► Subscriber.queue
//!                                │                  (registry snapshot)        │
//!                                └─► EventStore::persist (side call)           ▼
//!                                                                      DeliveryWorker
//!                                                                              │
//!                                                                       EventSink::send
//!
//! Engine::on_subscriber_connected ──► SubscriberRegistry::register ──► spawn DeliveryWorker
//! DeliveryWorker (cancel / send failure) ──► SubscriberRegistry::remove ──► drain queue
//! ```

mod builder;
mod engine;
mod event_hub;
mod queue;
mod registry;
mod selector;
mod subscriber;
mod worker;

pub use builder::EngineBuilder;
pub use engine::{Engine, Subscription};
pub use event_hub::{DistributionMode, Hub, HubOptions, PublishOutcome};
pub use selector::RotationCursor;
pub use worker::WorkerExit;
