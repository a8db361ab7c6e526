//! Realtime hub: subscription bookkeeping and delivery ordering.

use std::sync::Arc;
use std::thread;

use futures_lite::future::block_on;
use hydrocore::HubError;
use hydrocore::hub::{ClientId, Delivery, OUTBOX_DEPTH, RealtimeHub, UnitEvent, UnitId, UpdateKind};

fn event(unit: &str, ts: i64, kind: UpdateKind) -> UnitEvent {
    UnitEvent::new(UnitId::from(unit), ts, kind)
}

fn updates(deliveries: Vec<Delivery>) -> Vec<UnitEvent> {
    deliveries
        .into_iter()
        .filter_map(|d| match d {
            Delivery::Update(e) => Some(e),
            _ => None,
        })
        .collect()
}

// ── Join / leave ──────────────────────────────────────────────

#[test]
fn join_and_leave_are_idempotent_but_always_acked() {
    let hub = RealtimeHub::new();
    let sub = hub.connect(ClientId::from("c1")).unwrap();
    let unit = UnitId::from("HU-01");

    hub.join(sub.client_id(), &unit).unwrap();
    hub.join(sub.client_id(), &unit).unwrap();
    assert_eq!(hub.subscriber_count(&unit), 1);

    hub.leave(sub.client_id(), &unit).unwrap();
    hub.leave(sub.client_id(), &unit).unwrap();
    assert_eq!(hub.subscriber_count(&unit), 0);

    assert_eq!(
        sub.drain(),
        vec![
            Delivery::Connected,
            Delivery::Joined(unit.clone()),
            Delivery::Joined(unit.clone()),
            Delivery::Left(unit.clone()),
            Delivery::Left(unit),
        ]
    );
}

#[test]
fn updates_reach_only_joined_clients() {
    let hub = RealtimeHub::new();
    let a = hub.connect(ClientId::from("a")).unwrap();
    let b = hub.connect(ClientId::from("b")).unwrap();
    hub.join(a.client_id(), &UnitId::from("HU-01")).unwrap();
    hub.join(b.client_id(), &UnitId::from("HU-02")).unwrap();
    a.drain();
    b.drain();

    assert_eq!(hub.publish(event("HU-01", 1, UpdateKind::Sensors)), 1);
    assert_eq!(hub.publish(event("HU-03", 2, UpdateKind::Sensors)), 0);

    assert_eq!(updates(a.drain()), vec![event("HU-01", 1, UpdateKind::Sensors)]);
    assert!(b.drain().is_empty());
}

#[test]
fn deliveries_keep_publish_order_across_units() {
    let hub = RealtimeHub::new();
    let sub = hub.connect(ClientId::from("c")).unwrap();
    hub.join(sub.client_id(), &UnitId::from("HU-01")).unwrap();
    hub.join(sub.client_id(), &UnitId::from("HU-02")).unwrap();
    sub.drain();

    let sent = vec![
        event("HU-01", 1, UpdateKind::Relays),
        event("HU-02", 2, UpdateKind::Sensors),
        event("HU-01", 3, UpdateKind::ControlMode),
        event("HU-02", 4, UpdateKind::Schedule),
    ];
    for e in &sent {
        hub.publish(e.clone());
    }
    assert_eq!(updates(sub.drain()), sent);
}

#[test]
fn overflowing_outbox_drops_newest_and_spares_others() {
    let hub = RealtimeHub::new();
    let slow = hub.connect(ClientId::from("slow")).unwrap();
    let fast = hub.connect(ClientId::from("fast")).unwrap();
    let unit = UnitId::from("HU-01");
    hub.join(slow.client_id(), &unit).unwrap();
    hub.join(fast.client_id(), &unit).unwrap();
    slow.drain();
    fast.drain();

    for ts in 0..OUTBOX_DEPTH as i64 {
        assert_eq!(hub.publish(event("HU-01", ts, UpdateKind::Sensors)), 2);
        fast.drain();
    }
    // `slow` never reads: the next publish only reaches `fast`.
    assert_eq!(hub.publish(event("HU-01", 99, UpdateKind::Sensors)), 1);
    assert_eq!(slow.drain().len(), OUTBOX_DEPTH);
    assert_eq!(updates(fast.drain()), vec![event("HU-01", 99, UpdateKind::Sensors)]);
}

#[test]
fn left_client_receives_nothing_further() {
    let hub = RealtimeHub::new();
    let stays = hub.connect(ClientId::from("stays")).unwrap();
    let leaves = hub.connect(ClientId::from("leaves")).unwrap();
    let unit = UnitId::from("HU-01");
    hub.join(stays.client_id(), &unit).unwrap();
    hub.join(leaves.client_id(), &unit).unwrap();
    assert_eq!(hub.publish(event("HU-01", 1, UpdateKind::Relays)), 2);

    hub.leave(leaves.client_id(), &unit).unwrap();
    assert_eq!(hub.publish(event("HU-01", 2, UpdateKind::Relays)), 1);

    assert_eq!(updates(leaves.drain()), vec![event("HU-01", 1, UpdateKind::Relays)]);
    assert_eq!(
        updates(stays.drain()),
        vec![event("HU-01", 1, UpdateKind::Relays), event("HU-01", 2, UpdateKind::Relays)]
    );
}

// ── Disconnect / reconnect ────────────────────────────────────

#[test]
fn disconnect_cleans_up_once() {
    let hub = RealtimeHub::new();
    let sub = hub.connect(ClientId::from("c")).unwrap();
    let unit = UnitId::from("HU-01");
    hub.join(sub.client_id(), &unit).unwrap();

    assert!(hub.on_disconnect(sub.client_id()));
    assert!(!hub.on_disconnect(sub.client_id()));
    assert_eq!(hub.subscriber_count(&unit), 0);
    assert_eq!(hub.connection_count(), 0);
    assert!(sub.is_closed());
    assert_eq!(sub.try_recv(), None);
    assert_eq!(
        hub.join(sub.client_id(), &unit),
        Err(HubError::NotConnected(ClientId::from("c")))
    );

    assert_eq!(hub.publish(event("HU-01", 1, UpdateKind::Sensors)), 0);
    assert!(sub.drain().is_empty());
}

#[test]
fn reconnect_keeps_subscriptions_and_retires_old_handle() {
    let hub = RealtimeHub::new();
    let old = hub.connect(ClientId::from("c")).unwrap();
    hub.join(old.client_id(), &UnitId::from("HU-01")).unwrap();
    hub.join(old.client_id(), &UnitId::from("HU-02")).unwrap();

    let new = hub.connect(ClientId::from("c")).unwrap();
    assert!(old.is_closed());
    assert_eq!(hub.connection_count(), 1);
    assert_eq!(
        new.drain(),
        vec![
            Delivery::Connected,
            Delivery::Joined(UnitId::from("HU-01")),
            Delivery::Joined(UnitId::from("HU-02")),
        ]
    );

    hub.publish(event("HU-02", 5, UpdateKind::Relays));
    assert_eq!(updates(new.drain()), vec![event("HU-02", 5, UpdateKind::Relays)]);
    assert_eq!(old.try_recv(), None);
}

#[test]
fn shutdown_refuses_further_work() {
    let hub = RealtimeHub::new();
    let sub = hub.connect(ClientId::from("c")).unwrap();
    hub.join(sub.client_id(), &UnitId::from("HU-01")).unwrap();

    hub.shutdown();
    assert!(hub.is_shut_down());
    assert!(sub.is_closed());
    assert_eq!(hub.publish(event("HU-01", 1, UpdateKind::Sensors)), 0);
    assert!(matches!(hub.connect(ClientId::from("d")), Err(HubError::ShutDown)));
    assert_eq!(
        hub.join(sub.client_id(), &UnitId::from("HU-01")),
        Err(HubError::ShutDown)
    );
}

// ── Async receive ─────────────────────────────────────────────

#[test]
fn recv_resolves_pending_delivery() {
    let hub = RealtimeHub::new();
    let sub = hub.connect(ClientId::from("c")).unwrap();
    assert_eq!(block_on(sub.recv()), Some(Delivery::Connected));
}

#[test]
fn parked_receiver_sees_updates_in_order() {
    let hub = Arc::new(RealtimeHub::new());
    let sub = hub.connect(ClientId::from("c")).unwrap();
    let client = sub.client_id().clone();
    hub.join(&client, &UnitId::from("HU-01")).unwrap();
    sub.drain();

    let reader = thread::spawn(move || {
        block_on(async {
            let mut got = Vec::new();
            for _ in 0..5 {
                got.push(sub.recv().await);
            }
            got
        })
    });
    for ts in 0..5 {
        hub.publish(event("HU-01", ts, UpdateKind::Sensors));
    }

    let got = reader.join().unwrap();
    let expected: Vec<_> = (0..5)
        .map(|ts| Some(Delivery::Update(event("HU-01", ts, UpdateKind::Sensors))))
        .collect();
    assert_eq!(got, expected);
}

#[test]
fn disconnect_wakes_a_parked_receiver() {
    let hub = Arc::new(RealtimeHub::new());
    let sub = hub.connect(ClientId::from("c")).unwrap();
    let client = sub.client_id().clone();
    sub.drain();

    let reader = thread::spawn(move || sub.recv_blocking());
    assert!(hub.on_disconnect(&client));
    assert_eq!(reader.join().unwrap(), None);
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_churn_keeps_per_unit_order() {
    const PUBLISHERS: i64 = 4;
    const PER_UNIT: i64 = OUTBOX_DEPTH as i64 / PUBLISHERS;

    let hub = Arc::new(RealtimeHub::new());
    let watcher = hub.connect(ClientId::from("watcher")).unwrap();
    for p in 0..PUBLISHERS {
        hub.join(watcher.client_id(), &UnitId::from(format!("HU-{p}"))).unwrap();
    }
    watcher.drain();

    let workers: Vec<_> = (0..PUBLISHERS)
        .map(|p| {
            let hub = Arc::clone(&hub);
            thread::spawn(move || {
                let unit_name = format!("HU-{p}");
                let unit = UnitId::from(unit_name.as_str());
                let client = ClientId::from(format!("churn-{p}"));
                let churn = hub.connect(client.clone()).unwrap();
                let mut delivered = 0;
                for ts in 0..PER_UNIT {
                    hub.join(&client, &unit).unwrap();
                    delivered += hub.publish(event(&unit_name, ts, UpdateKind::Sensors));
                    hub.leave(&client, &unit).unwrap();
                }
                let seen = updates(churn.drain());
                assert!(hub.on_disconnect(&client));
                (delivered, seen)
            })
        })
        .collect();

    for (p, worker) in workers.into_iter().enumerate() {
        let (delivered, seen) = worker.join().unwrap();
        // Each publish reached the watcher and this worker's own client.
        assert_eq!(delivered, 2 * PER_UNIT as usize);
        let expected: Vec<_> = (0..PER_UNIT)
            .map(|ts| event(&format!("HU-{p}"), ts, UpdateKind::Sensors))
            .collect();
        assert_eq!(seen, expected);
    }

    let got = updates(watcher.drain());
    assert_eq!(got.len(), OUTBOX_DEPTH);
    for p in 0..PUBLISHERS {
        let unit = UnitId::from(format!("HU-{p}"));
        let stamps: Vec<_> = got.iter().filter(|e| e.unit_id == unit).map(|e| e.timestamp).collect();
        assert_eq!(stamps, (0..PER_UNIT).collect::<Vec<_>>());
        assert_eq!(hub.subscriber_count(&unit), 1);
    }
    assert_eq!(hub.connection_count(), 1);
}
