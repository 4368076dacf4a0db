//! End-to-end: broadcaster deck -> HTTP server -> viewer session with
//! headless players.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use fadecast_api::{create_router, AppState};
use fadecast_client::{
    now_ms, BroadcastDeck, ConnectionState, HeadlessPlayer, ReconcilerConfig, SessionTiming,
    SyncClient, ViewerReconciler, ViewerSession,
};
use fadecast_core::config::BroadcasterConfig;
use fadecast_core::models::{BroadcastCode, OwnerId, Slot, VideoRef, ViewerId};
use fadecast_core::service::{ChannelStateStore, PresenceTracker};

async fn spawn_server() -> String {
    let state = AppState::new(
        ChannelStateStore::new(),
        PresenceTracker::new(Duration::from_secs(40)),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_viewer_follows_broadcast_lifecycle() {
    let base_url = spawn_server().await;
    let client = SyncClient::new(&base_url).unwrap();

    let channel = client.create_channel(&OwnerId::from("dj-1")).await.unwrap();
    client.start_broadcast(&channel.id).await.unwrap();

    let mut deck = BroadcastDeck::new(&BroadcasterConfig::default());
    deck.load(Slot::A, VideoRef::new("a1").with_title("Opener"), Some(240.0));
    deck.load(Slot::B, VideoRef::new("b1"), None);
    deck.play(Slot::A, now_ms());
    deck.set_time(Slot::A, 12.0);
    let receipt = deck.sync(&client, &channel.id, now_ms()).await.unwrap();
    assert_eq!(receipt.revision, 1);

    let (tx, rx) = mpsc::unbounded_channel();
    let reconciler = ViewerReconciler::new(
        ReconcilerConfig::default(),
        HeadlessPlayer::new(Slot::A, tx.clone()),
        HeadlessPlayer::new(Slot::B, tx),
    );
    let timing = SessionTiming {
        poll_interval: Duration::from_millis(25),
        heartbeat_interval: Duration::from_millis(25),
        frame_interval: Duration::from_millis(10),
    };
    let mut session = ViewerSession::start(
        client.clone(),
        channel.id.clone(),
        ViewerId::from("viewer-1"),
        reconciler,
        rx,
        timing,
    );

    wait_until("slot A ready", || {
        session.connection() == ConnectionState::Live
            && session.inspect(|r| r.slot(Slot::A).is_ready())
    })
    .await;
    let loaded = session.inspect(|r| r.slot(Slot::A).player().video_id().map(str::to_string));
    assert_eq!(loaded.as_deref(), Some("a1"));
    // Ready seeks once to the broadcaster's position
    let position = session.inspect(|r| r.slot(Slot::A).local_time()).unwrap();
    assert!(position >= 12.0, "position {position}");
    assert!(!session.view().show_idle);

    let mut viewers = 0;
    for _ in 0..100 {
        viewers = client.viewer_count(&channel.id).await.unwrap();
        if viewers == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(viewers, 1);

    client.stop_broadcast(&channel.id).await.unwrap();
    wait_until("ended", || session.connection() == ConnectionState::Ended).await;
    assert!(session.view().show_idle);

    session.shutdown().await;
    assert_eq!(client.viewer_count(&channel.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_channel_ends_session() {
    let base_url = spawn_server().await;
    let client = SyncClient::new(&base_url).unwrap();

    assert!(client.fetch_state(&"missing".into()).await.unwrap().is_none());

    let (tx, rx) = mpsc::unbounded_channel();
    let reconciler = ViewerReconciler::new(
        ReconcilerConfig::default(),
        HeadlessPlayer::new(Slot::A, tx.clone()),
        HeadlessPlayer::new(Slot::B, tx),
    );
    let mut session = ViewerSession::start(
        client,
        "missing".into(),
        ViewerId::from("viewer-1"),
        reconciler,
        rx,
        SessionTiming {
            poll_interval: Duration::from_millis(20),
            heartbeat_interval: Duration::from_millis(20),
            frame_interval: Duration::from_millis(10),
        },
    );

    wait_until("ended", || session.connection() == ConnectionState::Ended).await;
    session.shutdown().await;
}

#[tokio::test]
async fn test_foreign_404_is_not_channel_missing() {
    // Something other than fadecast answering on the configured base URL
    let router = axum::Router::new().fallback(|| async {
        (axum::http::StatusCode::NOT_FOUND, "404 page not found")
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = SyncClient::new(format!("http://{addr}")).unwrap();
    let err = client.fetch_state(&"abc".into()).await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(client.lookup_code(BroadcastCode::parse("1234").unwrap()).await.is_err());
}
