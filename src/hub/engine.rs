//! # Engine: per-type hub table, connection lifecycle and graceful shutdown.
//!
//! The [`Engine`] owns the diagnostics [`Bus`], the table of registered hubs
//! (one [`Hub<E>`] per event type), the engine-wide shutdown token and the
//! [`TaskTracker`] every delivery worker is spawned on.
//!
//! ## High-level architecture
//! ```text
//! Configuration:
//!   EngineBuilder::with_hub::<E>(opts) ─► Engine::register::<E>(opts)
//!                                           └─► hubs[TypeId::of::<E>()] = Arc<Hub<E>>
//!
//! Connect:
//!   on_subscriber_connected::<E>(id, sink, peer_token)
//!       └─► Hub<E>::connect
//!             ├─ registry.register(Subscriber)          (eligible for the next publish)
//!             ├─ child token = shutdown.child_token()
//!             └─ tracker.spawn(DeliveryWorker::run)     ─► Subscription
//!
//! Publish:
//!   publish::<E>(event) ─► hubs[TypeId] ─► Hub<E>::publish ─► PublishOutcome
//!
//! Diagnostics:
//!   Hub / DeliveryWorker ── publish(HubEvent) ──► Bus ──► observer listener ──► ObserverSet
//!                                                   └──► Engine::diagnostics() receivers
//!
//! Shutdown path:
//!   shutdown()
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► shutdown.cancel()   → propagates to every subscriber token
//!     └─► tracker.close(); wait up to cfg.grace:
//!            ├─ Ok (all exited)   → Bus.publish(AllStoppedWithin)
//!            └─ Timeout exceeded  → Bus.publish(GraceExceeded), Err(GraceExceeded { stuck })
//!     └─► stop observer listener, flush observers
//! ```
//!
//! ## Example
//! ```rust
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use rrhub::{Engine, Event, HubConfig, HubOptions, PublishOutcome};
//!
//! #[derive(Clone, Debug)]
//! struct OrderPlaced(u64);
//! impl Event for OrderPlaced {}
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::builder(HubConfig::default())
//!         .with_hub::<OrderPlaced>(HubOptions::round_robin())
//!         .build()?;
//!
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!     let _sub = engine.on_subscriber_connected::<OrderPlaced, _>("worker-1", tx, CancellationToken::new())?;
//!
//!     let out = engine.publish(OrderPlaced(1)).await?;
//!     assert_eq!(out.subscriber(), Some("worker-1"));
//!     assert_eq!(rx.recv().await.map(|o| o.0), Some(1));
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::HubConfig;
use crate::diagnostics::{Bus, HubEvent, HubEventKind};
use crate::error::HubError;
use crate::event::{Event, EventType};
use crate::hub::builder::EngineBuilder;
use crate::hub::event_hub::{Hub, HubOptions, PublishOutcome};
use crate::hub::worker::WorkerExit;
use crate::observers::ObserverSet;
use crate::sink::EventSink;

/// Type-erased view of a `Hub<E>` stored in the engine table.
trait ErasedHub: Send + Sync {
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn event_type(&self) -> EventType;
    fn subscriber_ids(&self) -> Vec<String>;
}

impl<E: Event> ErasedHub for Hub<E> {
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn event_type(&self) -> EventType {
        Hub::event_type(self)
    }

    fn subscriber_ids(&self) -> Vec<String> {
        Hub::subscriber_ids(self)
    }
}

/// Background task forwarding bus records to the observer set.
pub(crate) struct ObserverListener {
    stop: CancellationToken,
    handle: JoinHandle<ObserverSet>,
}

impl ObserverListener {
    /// Spawns the listener. Must be called from within a tokio runtime.
    pub(crate) fn spawn(set: ObserverSet, bus: &Bus) -> Self {
        let mut rx = bus.subscribe();
        let stop = CancellationToken::new();
        let stop_rx = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    rec = rx.recv() => match rec {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop_rx.cancelled() => break,
                }
            }
            set
        });
        Self { stop, handle }
    }
}

/// Round-robin event distribution engine.
pub struct Engine {
    cfg: HubConfig,
    bus: Bus,
    hubs: RwLock<HashMap<TypeId, Arc<dyn ErasedHub>>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    listener: Mutex<Option<ObserverListener>>,
}

impl Engine {
    /// Starts building an engine with the given configuration.
    pub fn builder(cfg: HubConfig) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: HubConfig, bus: Bus, listener: Option<ObserverListener>) -> Self {
        Self {
            cfg,
            bus,
            hubs: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            listener: Mutex::new(listener),
        }
    }

    /// Configures the hub for event type `E`.
    ///
    /// Registering the same type again with identical options returns the
    /// existing hub; different options fail with
    /// [`HubError::ConflictingConfiguration`].
    pub fn register<E: Event>(&self, options: HubOptions<E>) -> Result<Arc<Hub<E>>, HubError> {
        if self.is_shutdown() {
            return Err(HubError::EngineShutdown);
        }
        let key = TypeId::of::<E>();
        let mut hubs = self.hubs.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = hubs.get(&key) {
            let hub = downcast::<E>(Arc::clone(existing))?;
            hub.check_compatible(&options)?;
            return Ok(hub);
        }

        let mode = options.mode();
        let hub = Arc::new(Hub::new(options, &self.cfg, self.bus.clone()));
        hubs.insert(key, Arc::clone(&hub) as Arc<dyn ErasedHub>);
        drop(hubs);

        self.bus.publish(
            HubEvent::new(HubEventKind::HubRegistered)
                .with_event_type(hub.event_type().name())
                .with_reason(mode.as_str()),
        );
        Ok(hub)
    }

    /// Returns the hub registered for `E`.
    pub fn hub<E: Event>(&self) -> Result<Arc<Hub<E>>, HubError> {
        let found = self
            .hubs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .cloned();
        match found {
            Some(erased) => downcast::<E>(erased),
            None => Err(HubError::HubNotConfigured {
                event_type: E::type_name(),
            }),
        }
    }

    /// Hands one event to the hub of its type.
    ///
    /// Returns once the event is enqueued (or dropped); never waits on a sink.
    /// Fails only with [`HubError::HubNotConfigured`].
    pub async fn publish<E: Event>(&self, event: E) -> Result<PublishOutcome, HubError> {
        let hub = self.hub::<E>()?;
        Ok(hub.publish(event).await)
    }

    /// Registers a newly connected subscriber and starts its delivery worker.
    ///
    /// The subscriber is eligible for the very next publish. It leaves the
    /// rotation when `cancellation` fires, when its sink fails, on
    /// [`Subscription::cancel`] or on engine shutdown.
    pub fn on_subscriber_connected<E, S>(
        &self,
        id: impl Into<Arc<str>>,
        sink: S,
        cancellation: CancellationToken,
    ) -> Result<Subscription, HubError>
    where
        E: Event,
        S: EventSink<E>,
    {
        if self.is_shutdown() {
            return Err(HubError::EngineShutdown);
        }
        let hub = self.hub::<E>()?;
        hub.connect(
            id.into(),
            Box::new(sink),
            cancellation,
            &self.shutdown,
            &self.tracker,
        )
    }

    /// Removes subscriber `id` of type `E`; `Ok(false)` if it was not connected.
    pub fn unregister<E: Event>(&self, id: &str) -> Result<bool, HubError> {
        Ok(self.hub::<E>()?.unregister(id))
    }

    /// New receiver of the engine's diagnostic records.
    pub fn diagnostics(&self) -> broadcast::Receiver<HubEvent> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &HubConfig {
        &self.cfg
    }

    /// Event types with a registered hub.
    pub fn event_types(&self) -> Vec<EventType> {
        self.hubs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|h| h.event_type())
            .collect()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops every subscriber and waits for delivery workers within [`HubConfig::grace`].
    ///
    /// Publishes [`HubEventKind::AllStoppedWithin`] on success, or
    /// [`HubEventKind::GraceExceeded`] on timeout and returns
    /// [`HubError::GraceExceeded`] listing subscribers still registered.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.bus
            .publish(HubEvent::new(HubEventKind::ShutdownRequested));
        self.shutdown.cancel();
        self.tracker.close();

        let grace = self.cfg.grace;
        let result = match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                self.bus
                    .publish(HubEvent::new(HubEventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = self.stuck();
                self.bus.publish(
                    HubEvent::new(HubEventKind::GraceExceeded).with_count(stuck.len() as u64),
                );
                Err(HubError::GraceExceeded { grace, stuck })
            }
        };
        self.stop_observers().await;
        result
    }

    /// Subscribers still registered, as `event_type/id`.
    fn stuck(&self) -> Vec<String> {
        let hubs = self.hubs.read().unwrap_or_else(PoisonError::into_inner);
        let mut stuck: Vec<String> = hubs
            .values()
            .flat_map(|h| {
                let name = h.event_type().name();
                h.subscriber_ids()
                    .into_iter()
                    .map(move |id| format!("{name}/{id}"))
            })
            .collect();
        stuck.sort_unstable();
        stuck
    }

    /// Stops the observer listener and lets every observer finish its queue.
    async fn stop_observers(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(listener) = listener else {
            return;
        };
        listener.stop.cancel();
        if let Ok(set) = listener.handle.await {
            let _ = tokio::time::timeout(self.cfg.grace, set.shutdown()).await;
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(listener) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.stop.cancel();
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cfg", &self.cfg)
            .field("event_types", &self.event_types())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

fn downcast<E: Event>(erased: Arc<dyn ErasedHub>) -> Result<Arc<Hub<E>>, HubError> {
    erased
        .as_any()
        .downcast::<Hub<E>>()
        .map_err(|_| HubError::HubNotConfigured {
            event_type: E::type_name(),
        })
}

/// Handle to one connected subscriber.
///
/// Dropping the handle does not disconnect; the subscriber stays in rotation
/// until its cancellation token fires or [`Subscription::cancel`] is called.
pub struct Subscription {
    id: Arc<str>,
    event_type: EventType,
    token: CancellationToken,
    exit: watch::Receiver<Option<WorkerExit>>,
}

impl Subscription {
    pub(crate) fn new(
        id: Arc<str>,
        event_type: EventType,
        token: CancellationToken,
        exit: watch::Receiver<Option<WorkerExit>>,
    ) -> Self {
        Self {
            id,
            event_type,
            token,
            exit,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Disconnects the subscriber. Events still queued are discarded.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the delivery worker has exited.
    pub fn is_closed(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// Waits until the delivery worker has exited and returns why.
    pub async fn closed(&self) -> WorkerExit {
        let mut rx = self.exit.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(exit) => exit.clone().unwrap_or(WorkerExit::Aborted),
            Err(_) => WorkerExit::Aborted,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("closed", &self.is_closed())
            .finish()
    }
}
