//! # Function-backed sink (`SinkFn`)
//!
//! [`SinkFn`] wraps a closure `F: FnMut(E) -> Fut`, producing a fresh future per
//! send. State the closure needs across sends (a stream writer, a client) is
//! captured by the closure; share it with `Arc` when it must outlive the subscriber.
//!
//! ## Example
//! ```rust
//! use rrhub::{SendError, SinkFn};
//!
//! let sink = SinkFn::new(|event: String| async move {
//!     if event.is_empty() {
//!         return Err(SendError::failed("empty frame"));
//!     }
//!     Ok(())
//! });
//! # let _ = sink;
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::error::SendError;
use crate::sink::EventSink;

/// Function-backed sink implementation.
pub struct SinkFn<F> {
    f: F,
}

impl<F> SinkFn<F> {
    /// Creates a new function-backed sink.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<E, F, Fut> EventSink<E> for SinkFn<F>
where
    E: Send + 'static,
    F: FnMut(E) -> Fut + Send + 'static, // FnMut: one send at a time
    Fut: Future<Output = Result<(), SendError>> + Send + 'static,
{
    async fn send(&mut self, event: E) -> Result<(), SendError> {
        (self.f)(event).await
    }
}
