use std::sync::Arc;

use crate::config::HubConfig;
use crate::diagnostics::Bus;
use crate::error::HubError;
use crate::event::Event;
use crate::hub::engine::{Engine, ObserverListener};
use crate::hub::event_hub::HubOptions;
use crate::observers::{Observe, ObserverSet};

type Registration = Box<dyn FnOnce(&Engine) -> Result<(), HubError> + Send>;

/// Builder for constructing an [`Engine`] with observers and hubs.
pub struct EngineBuilder {
    cfg: HubConfig,
    observers: Vec<Arc<dyn Observe>>,
    hubs: Vec<Registration>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: HubConfig) -> Self {
        Self {
            cfg,
            observers: Vec::new(),
            hubs: Vec::new(),
        }
    }

    /// Sets diagnostic observers.
    ///
    /// Observers receive engine records (connect, removal, overflow, failures)
    /// through dedicated workers with bounded queues.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Adds one diagnostic observer.
    pub fn with_observer(mut self, observer: Arc<dyn Observe>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Registers the hub for `E` when the engine is built.
    ///
    /// Conflicting registrations for the same type make [`build`](Self::build) fail.
    pub fn with_hub<E: Event>(mut self, options: HubOptions<E>) -> Self {
        self.hubs
            .push(Box::new(move |engine: &Engine| engine.register(options).map(|_| ())));
        self
    }

    /// Builds the engine.
    ///
    /// This consumes the builder and initializes:
    /// - the diagnostics bus
    /// - the observer set and its listener (only when observers were given)
    /// - every hub registered with [`with_hub`](Self::with_hub), in order
    ///
    /// Must be called from within a tokio runtime when observers are attached.
    pub fn build(self) -> Result<Arc<Engine>, HubError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener = if self.observers.is_empty() {
            None
        } else {
            let set = ObserverSet::new(self.observers, bus.clone());
            Some(ObserverListener::spawn(set, &bus))
        };

        let engine = Arc::new(Engine::new_internal(self.cfg, bus, listener));
        for register in self.hubs {
            register(&engine)?;
        }
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::DistributionMode;

    #[derive(Clone)]
    struct Quote;
    impl Event for Quote {}

    #[test]
    fn test_build_registers_hubs() {
        let engine = EngineBuilder::new(HubConfig::default())
            .with_hub::<Quote>(HubOptions::broadcast())
            .build()
            .unwrap();
        assert_eq!(
            engine.hub::<Quote>().unwrap().mode(),
            DistributionMode::Broadcast
        );
    }

    #[test]
    fn test_build_fails_fast_on_conflict() {
        let err = EngineBuilder::new(HubConfig::default())
            .with_hub::<Quote>(HubOptions::round_robin())
            .with_hub::<Quote>(HubOptions::broadcast())
            .build()
            .unwrap_err();
        assert!(matches!(err, HubError::ConflictingConfiguration { .. }));
    }
}
