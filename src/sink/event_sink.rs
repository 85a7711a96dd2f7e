use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SendError;

/// Capability to transmit one event to one remote peer.
///
/// Calls are sequential and ordered per subscriber. Any `Err` ends the
/// subscriber: it is removed from rotation and its queue is discarded.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use rrhub::{EventSink, SendError};
///
/// struct Stdout;
///
/// #[async_trait]
/// impl EventSink<String> for Stdout {
///     async fn send(&mut self, event: String) -> Result<(), SendError> {
///         println!("{event}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventSink<E: Send + 'static>: Send + 'static {
    /// Writes one event to the peer.
    async fn send(&mut self, event: E) -> Result<(), SendError>;
}

/// Owned, type-erased sink.
pub type BoxSink<E> = Box<dyn EventSink<E>>;

#[async_trait]
impl<E: Send + 'static> EventSink<E> for mpsc::Sender<E> {
    async fn send(&mut self, event: E) -> Result<(), SendError> {
        mpsc::Sender::send(self, event)
            .await
            .map_err(|_| SendError::Closed)
    }
}

#[async_trait]
impl<E: Send + 'static> EventSink<E> for mpsc::UnboundedSender<E> {
    async fn send(&mut self, event: E) -> Result<(), SendError> {
        mpsc::UnboundedSender::send(self, event).map_err(|_| SendError::Closed)
    }
}

#[async_trait]
impl<E: Send + 'static> EventSink<E> for BoxSink<E> {
    async fn send(&mut self, event: E) -> Result<(), SendError> {
        (**self).send(event).await
    }
}
