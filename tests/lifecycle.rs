mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{Job, WAIT, assert_silent, gated_sink, recv};
use rrhub::{
    Engine, HubConfig, HubError, HubOptions, InMemoryEventStore, OverflowPolicy, PublishOutcome,
    SendError, SinkFn, Subscription, WorkerExit,
};

fn engine_with(cfg: HubConfig) -> Arc<Engine> {
    Engine::builder(cfg)
        .with_hub::<Job>(HubOptions::round_robin())
        .build()
        .unwrap()
}

fn engine() -> Arc<Engine> {
    engine_with(HubConfig::default())
}

fn connect(
    engine: &Engine,
    id: &str,
    peer: CancellationToken,
) -> (Subscription, mpsc::UnboundedReceiver<Job>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sub = engine
        .on_subscriber_connected::<Job, _>(id, tx, peer)
        .unwrap();
    (sub, rx)
}

async fn closed(sub: &Subscription) -> WorkerExit {
    tokio::time::timeout(WAIT, sub.closed())
        .await
        .expect("worker did not exit")
}

#[tokio::test]
async fn peer_disconnect_removes_from_rotation() {
    let engine = engine();
    let (_a, mut rx_a) = connect(&engine, "a", CancellationToken::new());
    let peer_b = CancellationToken::new();
    let (b, _rx_b) = connect(&engine, "b", peer_b.clone());

    let first = engine.publish(Job(1)).await.unwrap();
    assert_eq!(first.subscriber(), Some("a"));

    peer_b.cancel();
    assert_eq!(closed(&b).await, WorkerExit::Cancelled);
    assert_eq!(engine.hub::<Job>().unwrap().subscriber_ids(), vec!["a"]);

    let second = engine.publish(Job(2)).await.unwrap();
    assert_eq!(second.subscriber(), Some("a"));
    assert_eq!(recv(&mut rx_a).await, Job(1));
    assert_eq!(recv(&mut rx_a).await, Job(2));
}

#[tokio::test]
async fn cancelled_subscriber_never_receives_new_events() {
    let engine = engine();
    let peer = CancellationToken::new();
    let (_sub, mut rx) = connect(&engine, "gone", peer.clone());

    // cancelled but its worker has not run yet: dispatch must skip it
    peer.cancel();
    assert_eq!(
        engine.publish(Job(1)).await.unwrap(),
        PublishOutcome::NoSubscribers
    );
    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn cancelled_middle_subscriber_hands_its_turn_on() {
    let engine = engine();
    let (_a, mut rx_a) = connect(&engine, "a", CancellationToken::new());
    let peer_b = CancellationToken::new();
    let (_b, mut rx_b) = connect(&engine, "b", peer_b.clone());
    let (_c, mut rx_c) = connect(&engine, "c", CancellationToken::new());
    let (_d, mut rx_d) = connect(&engine, "d", CancellationToken::new());

    assert_eq!(engine.publish(Job(0)).await.unwrap().subscriber(), Some("a"));
    peer_b.cancel();

    let mut picks = Vec::new();
    for i in 1..=6 {
        let out = engine.publish(Job(i)).await.unwrap();
        picks.push(out.subscriber().unwrap().to_string());
    }
    assert_eq!(picks, vec!["c", "d", "a", "c", "d", "a"]);

    for (rx, wants) in [
        (&mut rx_a, vec![0, 3, 6]),
        (&mut rx_c, vec![1, 4]),
        (&mut rx_d, vec![2, 5]),
    ] {
        for want in wants {
            assert_eq!(recv(rx).await, Job(want));
        }
    }
    assert_silent(&mut rx_b).await;
}

#[tokio::test]
async fn unregister_is_idempotent() {
    let engine = engine();
    let (sub, _rx) = connect(&engine, "a", CancellationToken::new());

    assert!(engine.unregister::<Job>("a").unwrap());
    assert!(!engine.unregister::<Job>("a").unwrap());
    assert_eq!(closed(&sub).await, WorkerExit::Disconnected);

    // a second explicit cancel after exit is harmless
    sub.cancel();
    assert_eq!(closed(&sub).await, WorkerExit::Disconnected);
}

#[tokio::test]
async fn send_failure_removes_subscriber() {
    let engine = engine();
    let bad = engine
        .on_subscriber_connected::<Job, _>(
            "bad",
            SinkFn::new(|_job: Job| async { Err::<(), _>(SendError::failed("stream reset")) }),
            CancellationToken::new(),
        )
        .unwrap();
    let (_good, mut rx_good) = connect(&engine, "good", CancellationToken::new());

    assert_eq!(
        engine.publish(Job(1)).await.unwrap().subscriber(),
        Some("bad")
    );
    assert_eq!(
        closed(&bad).await,
        WorkerExit::SendFailed(SendError::failed("stream reset"))
    );

    for i in 2..=3 {
        let out = engine.publish(Job(i)).await.unwrap();
        assert_eq!(out.subscriber(), Some("good"));
    }
    assert_eq!(recv(&mut rx_good).await, Job(2));
    assert_eq!(recv(&mut rx_good).await, Job(3));
}

#[tokio::test]
async fn closed_channel_sink_is_a_send_failure() {
    let engine = engine();
    let (sub, rx) = connect(&engine, "a", CancellationToken::new());
    drop(rx);

    engine.publish(Job(1)).await.unwrap();
    assert_eq!(closed(&sub).await, WorkerExit::SendFailed(SendError::Closed));
    assert!(engine.hub::<Job>().unwrap().is_empty());
}

#[tokio::test]
async fn panicking_sink_is_contained() {
    let engine = engine();
    let sub = engine
        .on_subscriber_connected::<Job, _>(
            "boom",
            SinkFn::new(|job: Job| async move {
                if job.0 > 0 {
                    panic!("sink exploded");
                }
                Ok::<(), SendError>(())
            }),
            CancellationToken::new(),
        )
        .unwrap();

    engine.publish(Job(1)).await.unwrap();
    assert_eq!(
        closed(&sub).await,
        WorkerExit::SinkPanicked("sink exploded".into())
    );
    assert_eq!(
        engine.publish(Job(2)).await.unwrap(),
        PublishOutcome::NoSubscribers
    );
}

#[tokio::test]
async fn duplicate_id_rejected_until_previous_exits() {
    let engine = engine();
    let (first, _rx) = connect(&engine, "dup", CancellationToken::new());

    let (tx, _rx2) = mpsc::unbounded_channel::<Job>();
    let err = engine
        .on_subscriber_connected::<Job, _>("dup", tx, CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, HubError::DuplicateSubscriber { ref subscriber, .. } if subscriber == "dup"));

    first.cancel();
    closed(&first).await;

    let (_again, mut rx) = connect(&engine, "dup", CancellationToken::new());
    engine.publish(Job(9)).await.unwrap();
    assert_eq!(recv(&mut rx).await, Job(9));
}

#[tokio::test]
async fn unregistered_type_is_rejected() {
    #[derive(Clone, Debug)]
    struct Orphan;
    impl rrhub::Event for Orphan {}

    let engine = engine();
    let (tx, _rx) = mpsc::unbounded_channel::<Orphan>();
    let err = engine
        .on_subscriber_connected::<Orphan, _>("a", tx, CancellationToken::new())
        .unwrap_err();
    assert_eq!(err.as_label(), "hub_not_configured");
    assert!(matches!(
        engine.publish(Orphan).await,
        Err(HubError::HubNotConfigured { .. })
    ));
}

#[tokio::test]
async fn conflicting_registration_fails() {
    let engine = engine();
    assert!(engine.register::<Job>(HubOptions::round_robin()).is_ok());
    assert!(matches!(
        engine.register::<Job>(HubOptions::broadcast()),
        Err(HubError::ConflictingConfiguration { .. })
    ));
    let store = Arc::new(InMemoryEventStore::<Job>::new());
    assert!(matches!(
        engine.register::<Job>(HubOptions::round_robin().with_store(store)),
        Err(HubError::ConflictingConfiguration { .. })
    ));
}

fn bounded(capacity: usize, overflow: OverflowPolicy) -> HubConfig {
    HubConfig {
        queue_capacity: capacity,
        overflow,
        ..HubConfig::default()
    }
}

#[tokio::test]
async fn drop_oldest_keeps_newest_backlog() {
    let engine = engine_with(bounded(2, OverflowPolicy::DropOldest));
    let (mut probe, sink) = gated_sink();
    let _sub = engine
        .on_subscriber_connected::<Job, _>("slow", sink, CancellationToken::new())
        .unwrap();

    engine.publish(Job(1)).await.unwrap();
    assert_eq!(recv(&mut probe.started).await, 1);

    for i in 2..=4 {
        assert_eq!(
            engine.publish(Job(i)).await.unwrap().subscriber(),
            Some("slow")
        );
    }
    probe.gate.add_permits(3);
    let got = vec![
        recv(&mut probe.delivered).await,
        recv(&mut probe.delivered).await,
        recv(&mut probe.delivered).await,
    ];
    assert_eq!(got, vec![1, 3, 4]);
}

#[tokio::test]
async fn drop_newest_rejects_incoming() {
    let engine = engine_with(bounded(2, OverflowPolicy::DropNewest));
    let (mut probe, sink) = gated_sink();
    let _sub = engine
        .on_subscriber_connected::<Job, _>("slow", sink, CancellationToken::new())
        .unwrap();

    engine.publish(Job(1)).await.unwrap();
    assert_eq!(recv(&mut probe.started).await, 1);
    engine.publish(Job(2)).await.unwrap();
    engine.publish(Job(3)).await.unwrap();
    assert_eq!(
        engine.publish(Job(4)).await.unwrap(),
        PublishOutcome::Overflowed {
            subscriber: Arc::from("slow")
        }
    );

    probe.gate.add_permits(3);
    let got = vec![
        recv(&mut probe.delivered).await,
        recv(&mut probe.delivered).await,
        recv(&mut probe.delivered).await,
    ];
    assert_eq!(got, vec![1, 2, 3]);
}

#[tokio::test]
async fn disconnect_policy_moves_event_to_next_subscriber() {
    let engine = engine_with(bounded(1, OverflowPolicy::Disconnect));
    let (mut probe, sink) = gated_sink();
    let slow = engine
        .on_subscriber_connected::<Job, _>("slow", sink, CancellationToken::new())
        .unwrap();
    let (_fast, mut rx_fast) = connect(&engine, "fast", CancellationToken::new());

    engine.publish(Job(1)).await.unwrap(); // slow, in flight
    assert_eq!(recv(&mut probe.started).await, 1);
    engine.publish(Job(2)).await.unwrap(); // fast
    assert_eq!(recv(&mut rx_fast).await, Job(2));
    engine.publish(Job(3)).await.unwrap(); // slow, queued
    engine.publish(Job(4)).await.unwrap(); // fast
    assert_eq!(recv(&mut rx_fast).await, Job(4));

    // slow is full: it is disconnected and the event goes to fast
    let out = engine.publish(Job(5)).await.unwrap();
    assert_eq!(out.subscriber(), Some("fast"));
    assert_eq!(recv(&mut rx_fast).await, Job(5));

    probe.gate.add_permits(1);
    assert_eq!(closed(&slow).await, WorkerExit::Disconnected);
    assert_eq!(recv(&mut probe.delivered).await, 1);
    assert_silent(&mut probe.delivered).await;
    assert_eq!(engine.hub::<Job>().unwrap().subscriber_ids(), vec!["fast"]);
}

#[tokio::test]
async fn disconnect_policy_keeps_rotation_order() {
    let engine = engine_with(bounded(1, OverflowPolicy::Disconnect));
    let (_first, mut rx_first) = connect(&engine, "first", CancellationToken::new());
    let (mut probe, sink) = gated_sink();
    let slow = engine
        .on_subscriber_connected::<Job, _>("slow", sink, CancellationToken::new())
        .unwrap();
    let (_last, mut rx_last) = connect(&engine, "last", CancellationToken::new());

    assert_eq!(engine.publish(Job(1)).await.unwrap().subscriber(), Some("first"));
    assert_eq!(recv(&mut rx_first).await, Job(1));
    assert_eq!(engine.publish(Job(2)).await.unwrap().subscriber(), Some("slow"));
    assert_eq!(recv(&mut probe.started).await, 2);
    assert_eq!(engine.publish(Job(3)).await.unwrap().subscriber(), Some("last"));
    assert_eq!(recv(&mut rx_last).await, Job(3));

    assert_eq!(engine.publish(Job(4)).await.unwrap().subscriber(), Some("first"));
    assert_eq!(recv(&mut rx_first).await, Job(4));
    assert_eq!(engine.publish(Job(5)).await.unwrap().subscriber(), Some("slow"));
    assert_eq!(engine.publish(Job(6)).await.unwrap().subscriber(), Some("last"));
    assert_eq!(recv(&mut rx_last).await, Job(6));
    assert_eq!(engine.publish(Job(7)).await.unwrap().subscriber(), Some("first"));
    assert_eq!(recv(&mut rx_first).await, Job(7));

    // slow is full: its turn goes to the subscriber after it, not past it
    assert_eq!(engine.publish(Job(8)).await.unwrap().subscriber(), Some("last"));
    assert_eq!(recv(&mut rx_last).await, Job(8));
    let mut picks = Vec::new();
    for i in 9..=12 {
        let out = engine.publish(Job(i)).await.unwrap();
        picks.push(out.subscriber().unwrap().to_string());
        match out.subscriber() {
            Some("first") => assert_eq!(recv(&mut rx_first).await, Job(i)),
            _ => assert_eq!(recv(&mut rx_last).await, Job(i)),
        }
    }
    assert_eq!(picks, vec!["first", "last", "first", "last"]);

    probe.gate.add_permits(1);
    assert_eq!(closed(&slow).await, WorkerExit::Disconnected);
    assert_eq!(
        engine.hub::<Job>().unwrap().subscriber_ids(),
        vec!["first", "last"]
    );
}

#[tokio::test]
async fn shutdown_stops_every_worker() {
    let engine = engine();
    let (a, _rx_a) = connect(&engine, "a", CancellationToken::new());
    let (b, _rx_b) = connect(&engine, "b", CancellationToken::new());

    engine.shutdown().await.unwrap();
    assert!(engine.is_shutdown());
    assert_eq!(closed(&a).await, WorkerExit::Shutdown);
    assert_eq!(closed(&b).await, WorkerExit::Shutdown);
    assert!(engine.hub::<Job>().unwrap().is_empty());
    assert_eq!(
        engine.publish(Job(1)).await.unwrap(),
        PublishOutcome::NoSubscribers
    );
}

#[tokio::test]
async fn shutdown_reports_stuck_workers() {
    let cfg = HubConfig {
        grace: Duration::from_millis(50),
        ..HubConfig::default()
    };
    let engine = engine_with(cfg);
    let (mut probe, sink) = gated_sink();
    let _sub = engine
        .on_subscriber_connected::<Job, _>("stuck", sink, CancellationToken::new())
        .unwrap();

    engine.publish(Job(1)).await.unwrap();
    assert_eq!(recv(&mut probe.started).await, 1);

    match engine.shutdown().await {
        Err(HubError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_millis(50));
            assert_eq!(stuck.len(), 1);
            assert!(stuck[0].ends_with("/stuck"), "{stuck:?}");
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
    probe.gate.add_permits(1);
}
