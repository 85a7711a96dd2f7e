//! # Example: round-robin work distribution
//!
//! Three workers compete for `Job`s. `worker-2` breaks after its second job and
//! `worker-3` disconnects halfway through; the remaining jobs keep flowing to
//! whoever is still connected.
//!
//! Run with `RUST_LOG=rrhub=debug cargo run --example round_robin` to see the
//! engine diagnostics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rrhub::{Engine, Event, HubConfig, HubOptions, LogWriter, SendError, SinkFn};

#[derive(Clone, Debug)]
struct Job {
    id: u32,
}

impl Event for Job {}

fn printing_sink(name: &'static str) -> SinkFn<impl FnMut(Job) -> std::future::Ready<Result<(), SendError>> + Send + 'static> {
    SinkFn::new(move |job: Job| {
        println!("[{name}] job #{}", job.id);
        std::future::ready(Ok(()))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = HubConfig {
        grace: Duration::from_secs(2),
        ..HubConfig::default()
    };
    let engine = Engine::builder(cfg)
        .with_observer(Arc::new(LogWriter::new()))
        .with_hub::<Job>(HubOptions::round_robin())
        .build()?;

    engine.on_subscriber_connected::<Job, _>(
        "worker-1",
        printing_sink("worker-1"),
        CancellationToken::new(),
    )?;

    let handled = Arc::new(AtomicU32::new(0));
    let flaky = engine.on_subscriber_connected::<Job, _>(
        "worker-2",
        SinkFn::new(move |job: Job| {
            let handled = Arc::clone(&handled);
            async move {
                if handled.fetch_add(1, Ordering::Relaxed) >= 2 {
                    return Err(SendError::failed("connection reset"));
                }
                println!("[worker-2] job #{}", job.id);
                Ok::<(), SendError>(())
            }
        }),
        CancellationToken::new(),
    )?;

    let peer = CancellationToken::new();
    let leaving = engine.on_subscriber_connected::<Job, _>(
        "worker-3",
        printing_sink("worker-3"),
        peer.clone(),
    )?;

    for id in 1..=12 {
        let out = engine.publish(Job { id }).await?;
        println!("job #{id} -> {out:?}");
        if id == 6 {
            peer.cancel();
            println!("worker-3 left: {}", leaving.closed().await);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    if flaky.is_closed() {
        println!("worker-2 exited: {}", flaky.closed().await);
    }
    engine.shutdown().await?;
    Ok(())
}
