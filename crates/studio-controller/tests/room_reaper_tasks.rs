//! Room reaper integration tests.
//!
//! Runs the reaper loop against presence state driven through the
//! signaling broker, with tokio's clock paused.

use std::sync::Arc;
use std::time::Duration;
use studio_controller::presence::{ConnectionRegistry, MembershipTable};
use studio_controller::signaling::SignalingBroker;
use studio_controller::tasks::{reap_once, RoomReaperConfig, RoomReaperHandle};
use studio_controller::types::{ConnectionId, RoomId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_secs(10);
const TTL: Duration = Duration::from_secs(60);

fn broker() -> SignalingBroker {
    SignalingBroker::new(
        Arc::new(ConnectionRegistry::new()),
        Arc::new(MembershipTable::new()),
    )
}

fn reaper_config() -> RoomReaperConfig {
    RoomReaperConfig {
        interval: INTERVAL,
        ttl: TTL,
    }
}

/// Let spawned tasks observe the advanced clock.
async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_room_reaped_after_ttl() -> Result<(), anyhow::Error> {
    let broker = broker();
    let (tx, _rx) = mpsc::channel(8);
    let conn = broker.connect(tx)?;
    let room = RoomId::from("r1");

    broker.join_room(&conn, &room, None)?;
    broker.leave_room(&conn, &room);

    let shutdown = CancellationToken::new();
    let reaper = RoomReaperHandle::spawn(Arc::clone(broker.membership()), reaper_config(), &shutdown);
    settle().await;

    tokio::time::advance(Duration::from_secs(30)).await;
    settle().await;
    assert!(broker.membership().contains_room(&room), "reaped before TTL");

    tokio::time::advance(Duration::from_secs(40)).await;
    settle().await;
    assert!(!broker.membership().contains_room(&room), "not reaped after TTL");

    reaper.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_occupied_room_never_reaped() -> Result<(), anyhow::Error> {
    let broker = broker();
    let (tx, _rx) = mpsc::channel(8);
    let conn = broker.connect(tx)?;
    let room = RoomId::from("r1");
    broker.join_room(&conn, &room, None)?;

    let shutdown = CancellationToken::new();
    let reaper = RoomReaperHandle::spawn(Arc::clone(broker.membership()), reaper_config(), &shutdown);

    for _ in 0..60 {
        tokio::time::advance(INTERVAL).await;
        settle().await;
    }

    assert!(broker.membership().room_members(&room).contains(&conn));

    reaper.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_restarts_idle_clock() -> Result<(), anyhow::Error> {
    let broker = broker();
    let (tx, _rx) = mpsc::channel(8);
    let conn = broker.connect(tx)?;
    let room = RoomId::from("r1");

    broker.join_room(&conn, &room, None)?;
    broker.leave_room(&conn, &room);

    let shutdown = CancellationToken::new();
    let reaper = RoomReaperHandle::spawn(Arc::clone(broker.membership()), reaper_config(), &shutdown);

    tokio::time::advance(Duration::from_secs(50)).await;
    settle().await;
    broker.join_room(&conn, &room, None)?;
    broker.leave_room(&conn, &room);

    // 70s since the first leave, 20s since the second
    tokio::time::advance(Duration::from_secs(20)).await;
    settle().await;
    assert!(broker.membership().contains_room(&room));

    tokio::time::advance(Duration::from_secs(50)).await;
    settle().await;
    assert!(!broker.membership().contains_room(&room));

    reaper.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_leaves_room_for_reaper() -> Result<(), anyhow::Error> {
    let broker = broker();
    let (tx, _rx) = mpsc::channel(8);
    let conn = broker.connect(tx)?;
    let room = RoomId::from("r1");
    broker.join_room(&conn, &room, None)?;

    assert_eq!(broker.disconnect(&conn), vec![room.clone()]);
    assert!(broker.membership().contains_room(&room));
    assert!(reap_once(broker.membership(), TTL).is_empty());

    tokio::time::advance(TTL).await;
    assert_eq!(reap_once(broker.membership(), TTL), vec![room]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancel_stops_reaper() {
    let membership = Arc::new(MembershipTable::new());
    let shutdown = CancellationToken::new();
    let reaper = RoomReaperHandle::spawn(membership, reaper_config(), &shutdown);
    settle().await;
    assert!(!reaper.is_finished());

    shutdown.cancel();
    settle().await;
    assert!(reaper.is_finished());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_join_and_reap_never_loses_member() -> Result<(), anyhow::Error> {
    let membership = Arc::new(MembershipTable::new());
    let room = RoomId::from("hot");
    let done = CancellationToken::new();

    // Zero TTL: any empty room is reapable on the spot
    let reaper = {
        let membership = Arc::clone(&membership);
        let done = done.clone();
        tokio::spawn(async move {
            let mut passes = 0usize;
            while !done.is_cancelled() {
                reap_once(&membership, Duration::ZERO);
                passes += 1;
                tokio::task::yield_now().await;
            }
            passes
        })
    };

    let joiners: Vec<_> = (0..4)
        .map(|worker| {
            let membership = Arc::clone(&membership);
            let room = room.clone();
            tokio::spawn(async move {
                let mut joined = Vec::new();
                for i in 0..250 {
                    let conn = ConnectionId::new(format!("w{worker}-{i}"));
                    membership.join(&room, &conn);
                    // Leave every other one so the room keeps emptying
                    if i % 2 == 0 {
                        membership.leave(&room, &conn);
                    } else {
                        joined.push(conn);
                    }
                    tokio::task::yield_now().await;
                }
                joined
            })
        })
        .collect();

    let mut expected = Vec::new();
    for joiner in joiners {
        expected.extend(joiner.await?);
    }
    done.cancel();
    let passes = reaper.await?;
    assert!(passes > 0);

    let members = membership.room_members(&room);
    for conn in &expected {
        assert!(members.contains(conn), "member {conn} lost to reaper");
    }
    assert_eq!(members.len(), expected.len());

    Ok(())
}
