//! # Engine configuration.
//!
//! Provides [`HubConfig`] centralized settings for the distribution engine.
//!
//! ## Sentinel values
//! - `queue_capacity = 0` → unbounded per-subscriber queues
//! - `bus_capacity` is clamped to a minimum of 1
//!
//! ## Loading
//! `HubConfig` implements `serde::Deserialize` with per-field defaults, so it can be
//! embedded in any host configuration file:
//! ```rust
//! use rrhub::{HubConfig, OverflowPolicy};
//!
//! let cfg: HubConfig = serde_json::from_str(r#"{ "queue_capacity": 64, "overflow": "disconnect" }"#).unwrap();
//! assert_eq!(cfg.queue_limit(), Some(64));
//! assert_eq!(cfg.overflow, OverflowPolicy::Disconnect);
//! ```

use std::time::Duration;

use serde::Deserialize;

/// What a bounded subscriber queue does when an event arrives and it is full.
///
/// Publishers are never blocked, whatever the policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued event and keep the new one.
    #[default]
    DropOldest,
    /// Reject the incoming event for this subscriber only.
    DropNewest,
    /// Cancel the subscriber; the event is re-dispatched to the next one.
    Disconnect,
}

impl OverflowPolicy {
    /// Stable snake_case name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OverflowPolicy::DropOldest => "drop_oldest",
            OverflowPolicy::DropNewest => "drop_newest",
            OverflowPolicy::Disconnect => "disconnect",
        }
    }
}

/// Sharing scope of the per-type rotation cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationScope {
    /// One cursor per event type per engine.
    #[default]
    Engine,
    /// One cursor per event type shared by every engine in the process.
    Process,
}

/// Global configuration for the distribution engine.
///
/// ## Field semantics
/// - `queue_capacity`: per-subscriber queue bound (`0` = unbounded)
/// - `overflow`: policy applied when a bounded queue is full
/// - `rotation_scope`: whether cursors are per engine or per process
/// - `bus_capacity`: diagnostics bus ring buffer size (min 1)
/// - `grace`: maximum wait for delivery workers during [`Engine::shutdown`](crate::Engine::shutdown)
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Per-subscriber queue capacity.
    ///
    /// - `0` = unbounded (a slow subscriber accumulates backlog)
    /// - `n > 0` = at most `n` pending events, then [`HubConfig::overflow`] applies
    pub queue_capacity: usize,

    /// Overflow policy for bounded queues. Ignored when unbounded.
    pub overflow: OverflowPolicy,

    /// Scope of rotation cursors.
    pub rotation_scope: RotationScope,

    /// Capacity of the diagnostics broadcast channel.
    ///
    /// Observers that lag behind more than `bus_capacity` records skip older items.
    pub bus_capacity: usize,

    /// Maximum time to wait for delivery workers to exit on shutdown.
    #[serde(rename = "grace_ms", with = "millis")]
    pub grace: Duration,
}

impl HubConfig {
    /// Returns the per-subscriber queue bound as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` queued events
    #[inline]
    pub fn queue_limit(&self) -> Option<usize> {
        if self.queue_capacity == 0 {
            None
        } else {
            Some(self.queue_capacity)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for HubConfig {
    /// Default configuration:
    ///
    /// - `queue_capacity = 0` (unbounded)
    /// - `overflow = DropOldest`
    /// - `rotation_scope = Engine`
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            queue_capacity: 0,
            overflow: OverflowPolicy::default(),
            rotation_scope: RotationScope::default(),
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(de).map(Duration::from_millis)
    }
}
