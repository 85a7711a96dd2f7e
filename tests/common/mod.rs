#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};

use rrhub::{BoxSink, Event, SendError, SinkFn};

pub const WAIT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job(pub u32);
impl Event for Job {}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Receives the next item or panics after [`WAIT`].
pub async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("sink channel closed")
}

/// Asserts nothing arrives within a short window.
pub async fn assert_silent<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "unexpected delivery");
}

/// A sink that reports each event as it starts sending, then blocks until
/// the test releases a permit on `gate`.
pub struct GatedSink {
    pub started: mpsc::UnboundedReceiver<u32>,
    pub delivered: mpsc::UnboundedReceiver<u32>,
    pub gate: Arc<Semaphore>,
}

pub fn gated_sink() -> (GatedSink, BoxSink<Job>) {
    let (started_tx, started) = mpsc::unbounded_channel();
    let (delivered_tx, delivered) = mpsc::unbounded_channel();
    let gate = Arc::new(Semaphore::new(0));
    let sink_gate = Arc::clone(&gate);

    let sink = SinkFn::new(move |job: Job| {
        let started_tx = started_tx.clone();
        let delivered_tx = delivered_tx.clone();
        let gate = Arc::clone(&sink_gate);
        async move {
            let _ = started_tx.send(job.0);
            let permit = gate.acquire().await.map_err(|_| SendError::Closed)?;
            permit.forget();
            let _ = delivered_tx.send(job.0);
            Ok::<(), SendError>(())
        }
    });
    (
        GatedSink {
            started,
            delivered,
            gate,
        },
        Box::new(sink),
    )
}
