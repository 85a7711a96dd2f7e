//! # Send capabilities.
//!
//! A delivery worker forwards each dequeued event to its subscriber's
//! [`EventSink`]. The engine never issues concurrent sends to the same sink.
//!
//! Provided implementations:
//! - `tokio::sync::mpsc::Sender<E>` / `UnboundedSender<E>` (receiver dropped → [`SendError::Closed`](crate::SendError::Closed))
//! - [`SinkFn`] wraps an async closure (e.g. a gRPC/WebSocket stream writer)

mod event_sink;
mod sink_fn;

pub use event_sink::{BoxSink, EventSink};
pub use sink_fn::SinkFn;
