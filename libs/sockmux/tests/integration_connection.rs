//! Integration tests for the connection lifecycle
//!
//! Driven through the in-memory transport so every socket transition is
//! scripted by the test.

mod common;

use common::{assert_quiet, next_event, MockTransport};
use sockmux::core::connection_state::ReadyState;
use sockmux::{
    BinaryDelivery, CloseCode, Command, ConnectionManager, ConnectionState, Event, ManagerConfig,
    SockmuxError, WsMessage,
};
use std::time::Duration;

const FEED: &str = "ws://feed.test/stream";

#[tokio::test(start_paused = true)]
async fn test_open_send_receive_close() {
    verbose_println!("Testing open → send → receive → close...");

    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport.clone());
    let mut events = manager.subscribe(FEED).unwrap();

    manager.open(FEED, vec!["v1".into()], None).unwrap();
    let socket = sockets.next().await;
    assert_eq!(socket.identity(), FEED);
    assert_eq!(socket.request.protocols, vec!["v1".to_string()]);

    socket.open();
    assert_eq!(next_event(&mut events).await, Event::Opened);

    manager.send(FEED, "hello").unwrap();
    // Any round trip orders us after the send
    let snapshot = manager.snapshot(FEED).await.unwrap().unwrap();
    assert_eq!(snapshot.state, ConnectionState::Open);
    assert_eq!(socket.sent(), vec![WsMessage::Text("hello".into())]);

    socket.text("world");
    assert_eq!(
        next_event(&mut events).await,
        Event::MessageReceived("world".into())
    );

    manager.close(FEED, None, None).unwrap();
    assert_eq!(
        next_event(&mut events).await,
        Event::Closed {
            code: CloseCode::Normal,
            reason: String::new(),
            was_clean: true,
        }
    );
    assert_eq!(socket.close_requests(), vec![(CloseCode::Normal, String::new())]);

    let snapshot = manager.snapshot(FEED).await.unwrap().unwrap();
    assert_eq!(snapshot.state, ConnectionState::Closed);
    assert!(snapshot.intentional_close);

    verbose_println!("✓ Lifecycle test passed");
}

#[tokio::test(start_paused = true)]
async fn test_close_is_idempotent() {
    verbose_println!("Testing close idempotence...");

    let (transport, mut sockets) = MockTransport::manual_close();
    let (manager, _unclaimed) = ConnectionManager::new(transport);
    let mut events = manager.subscribe(FEED).unwrap();

    manager.open(FEED, vec![], None).unwrap();
    let socket = sockets.next().await;
    socket.open();
    assert_eq!(next_event(&mut events).await, Event::Opened);

    manager
        .close(FEED, Some(CloseCode::GoingAway), Some("bye".into()))
        .unwrap();
    manager.close(FEED, None, None).unwrap();
    let snapshot = manager.snapshot(FEED).await.unwrap().unwrap();
    assert_eq!(snapshot.state, ConnectionState::Closing);
    assert_eq!(socket.ready_state(), ReadyState::Closing);

    socket.drop_with(CloseCode::GoingAway, "bye", true);
    assert_eq!(
        next_event(&mut events).await,
        Event::Closed {
            code: CloseCode::GoingAway,
            reason: "bye".into(),
            was_clean: true,
        }
    );

    // Closing an already closed connection does nothing
    manager.close(FEED, None, None).unwrap();
    assert_quiet(&mut events, Duration::from_secs(30)).await;
    assert!(sockets.try_next().is_none());

    verbose_println!("✓ Close idempotence test passed");
}

#[tokio::test(start_paused = true)]
async fn test_send_before_open_is_dropped() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);

    manager.open(FEED, vec![], None).unwrap();
    let socket = sockets.next().await;

    manager.send(FEED, "too early").unwrap();
    let snapshot = manager.snapshot(FEED).await.unwrap().unwrap();
    assert_eq!(snapshot.state, ConnectionState::Connecting);
    assert!(socket.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_replacement_reports_close_before_new_socket() {
    verbose_println!("Testing replacement ordering...");

    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport.clone());
    let mut events = manager.subscribe(FEED).unwrap();

    manager.open(FEED, vec!["v1".into()], None).unwrap();
    let first = sockets.next().await;
    first.open();
    assert_eq!(next_event(&mut events).await, Event::Opened);

    manager.open(FEED, vec!["v2".into()], None).unwrap();
    assert_eq!(
        next_event(&mut events).await,
        Event::Closed {
            code: CloseCode::Normal,
            reason: "replaced".into(),
            was_clean: true,
        }
    );

    let second = sockets.next().await;
    assert_eq!(second.request.protocols, vec!["v2".to_string()]);
    assert_eq!(
        first.close_requests(),
        vec![(CloseCode::Normal, "replaced".to_string())]
    );

    // The superseded socket can no longer reach the application
    first.text("stale");
    first.drop_with(CloseCode::AbnormalClosure, "", false);

    second.open();
    assert_eq!(next_event(&mut events).await, Event::Opened);
    assert_quiet(&mut events, Duration::from_secs(30)).await;
    assert_eq!(transport.requests().len(), 2);

    verbose_println!("✓ Replacement ordering test passed");
}

#[tokio::test(start_paused = true)]
async fn test_replacing_unopened_entry_emits_nothing() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);
    let mut events = manager.subscribe(FEED).unwrap();

    manager.open(FEED, vec![], None).unwrap();
    let first = sockets.next().await;
    first.drop_with(CloseCode::AbnormalClosure, "", false);
    assert!(matches!(
        next_event(&mut events).await,
        Event::Closed { code: CloseCode::AbnormalClosure, was_clean: false, .. }
    ));

    // No socket attached any more, so there is nothing to report as replaced
    manager.open(FEED, vec![], None).unwrap();
    let second = sockets.next().await;
    second.open();
    assert_eq!(next_event(&mut events).await, Event::Opened);
}

#[tokio::test(start_paused = true)]
async fn test_error_event() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);
    let mut events = manager.subscribe(FEED).unwrap();

    manager.open(FEED, vec![], None).unwrap();
    let socket = sockets.next().await;
    socket.error("connection reset");

    assert_eq!(
        next_event(&mut events).await,
        Event::Error("connection reset".into())
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_identity_operations() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);

    manager.send("ws://nobody", "x").unwrap();
    manager.close("ws://nobody", None, None).unwrap();
    manager.configure_reconnect("ws://nobody", None).unwrap();

    assert!(manager.snapshot("ws://nobody").await.unwrap().is_none());
    assert!(manager.connections().await.unwrap().is_empty());
    assert!(sockets.try_next().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unclaimed_events_are_surfaced() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, mut unclaimed) = ConnectionManager::new(transport);
    let _other = manager.subscribe("ws://other").unwrap();

    manager.open(FEED, vec![], None).unwrap();
    sockets.next().await.open();

    let tagged = unclaimed.recv().await.unwrap();
    assert_eq!(tagged.id, FEED);
    assert_eq!(tagged.event, Event::Opened);
}

#[tokio::test(start_paused = true)]
async fn test_first_live_subscriber_wins() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);
    let first = manager.subscribe(FEED).unwrap();
    let mut second = manager.subscribe(FEED).unwrap();
    drop(first);

    manager.open(FEED, vec![], None).unwrap();
    sockets.next().await.open();
    assert_eq!(next_event(&mut second).await, Event::Opened);
}

#[tokio::test(start_paused = true)]
async fn test_execute_wire_commands() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);
    let mut events = manager.subscribe(FEED).unwrap();

    let open = Command::decode(&format!(r#"{{"tag":"open","id":"{}","protocols":["v9"]}}"#, FEED))
        .unwrap();
    manager.execute(open).unwrap();

    let socket = sockets.next().await;
    assert_eq!(socket.request.protocols, vec!["v9".to_string()]);
    socket.open();
    assert_eq!(next_event(&mut events).await, Event::Opened);

    let close = Command::decode(&format!(
        r#"{{"tag":"close","id":"{}","code":4001,"reason":"done"}}"#,
        FEED
    ))
    .unwrap();
    manager.execute(close).unwrap();
    assert_eq!(
        next_event(&mut events).await,
        Event::Closed {
            code: CloseCode::Custom(4001),
            reason: "done".into(),
            was_clean: true,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_binary_event_delivery_mode() {
    let (transport, mut sockets) = MockTransport::new();
    let config = ManagerConfig::new().binary_delivery(BinaryDelivery::Event);
    let (manager, _unclaimed) = ConnectionManager::with_config(config, transport);
    let mut events = manager.subscribe(FEED).unwrap();

    manager.open(FEED, vec![], None).unwrap();
    let socket = sockets.next().await;
    socket.open();
    assert_eq!(next_event(&mut events).await, Event::Opened);

    socket.binary(&[1, 2, 3]);
    assert_eq!(
        next_event(&mut events).await,
        Event::BinaryReceived(vec![1, 2, 3])
    );

    let snapshot = manager.snapshot(FEED).await.unwrap().unwrap();
    assert_eq!(snapshot.buffered_frames, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_everything() {
    verbose_println!("Testing manager shutdown...");

    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);
    let other_handle = manager.clone();

    manager.open("ws://a", vec![], None).unwrap();
    manager.open("ws://b", vec![], None).unwrap();
    let a = sockets.next().await;
    let b = sockets.next().await;
    a.open();
    b.open();

    manager.shutdown().await.unwrap();

    for socket in [&a, &b] {
        assert_eq!(
            socket.close_requests(),
            vec![(CloseCode::GoingAway, "manager shutdown".to_string())]
        );
    }
    assert!(matches!(
        other_handle.open("ws://c", vec![], None),
        Err(SockmuxError::ManagerClosed)
    ));

    verbose_println!("✓ Shutdown test passed");
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handles_tears_down() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);
    let mut events = manager.subscribe(FEED).unwrap();

    manager.open(FEED, vec![], None).unwrap();
    let socket = sockets.next().await;
    socket.open();
    assert_eq!(next_event(&mut events).await, Event::Opened);

    drop(manager);

    // The event stream ends once the manager task is gone
    assert!(events.recv().await.is_none());
    assert_eq!(
        socket.close_requests(),
        vec![(CloseCode::GoingAway, "manager shutdown".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_policy_is_rejected() {
    let (transport, mut sockets) = MockTransport::new();
    let (manager, _unclaimed) = ConnectionManager::new(transport);

    let policy = sockmux::ReconnectPolicy::new().backoff_multiplier(0.5);
    assert!(matches!(
        manager.open(FEED, vec![], Some(policy)),
        Err(SockmuxError::Configuration(_))
    ));

    assert!(manager.snapshot(FEED).await.unwrap().is_none());
    assert!(sockets.try_next().is_none());
}
