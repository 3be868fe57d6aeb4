//! Integration tests for the progress push channel.
//!
//! These tests connect the real WebSocket transport to an in-process backend
//! and check what reaches the event queue.

mod mock_backend;

use std::sync::Arc;
use std::time::Duration;

use coursecraft_client::{
    AppEvent, CourseApi, EventQueue, HttpCourseApi, ProgressSynchronizer, ProgressTransport,
    SyncEvent, SyncSignal, WebSocketTransport,
};
use coursecraft_core::StageStatus;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use mock_backend::{progress_frame, progress_state, Backend, ChannelScript, MockServer, Reply};

fn transport(server: &MockServer) -> WebSocketTransport {
    WebSocketTransport::new(server.ws_url(), Duration::from_secs(2))
}

/// Receives the next sync event from the queue.
async fn next_sync_event(rx: &mut UnboundedReceiver<AppEvent>) -> SyncEvent {
    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Event queue closed");
    match event {
        AppEvent::Sync(event) => event,
        other => panic!("Expected a sync event, got: {other:?}"),
    }
}

// ============================================================================
// Transport Tests
// ============================================================================

/// Snapshots arrive in order between `Connected` and `Disconnected`.
#[tokio::test]
async fn test_transport_forwards_snapshots_in_order() {
    let server = mock_backend::spawn(Backend {
        channel: ChannelScript {
            frames: vec![
                progress_frame(&[StageStatus::Running, StageStatus::Pending]),
                progress_frame(&[StageStatus::Completed, StageStatus::Running]),
            ],
            close_after: true,
            ..ChannelScript::default()
        },
        ..Backend::default()
    })
    .await;
    let (queue, mut rx) = EventQueue::new();

    let _reader = transport(&server).open(3, queue);

    assert_eq!(next_sync_event(&mut rx).await, SyncEvent::Connected { session: 3 });
    assert_eq!(
        next_sync_event(&mut rx).await,
        SyncEvent::Snapshot {
            session: 3,
            state: progress_state(&[StageStatus::Running, StageStatus::Pending]),
        }
    );
    assert_eq!(
        next_sync_event(&mut rx).await,
        SyncEvent::Snapshot {
            session: 3,
            state: progress_state(&[StageStatus::Completed, StageStatus::Running]),
        }
    );
    assert_eq!(
        next_sync_event(&mut rx).await,
        SyncEvent::Disconnected { session: 3 }
    );
}

/// Unknown events are skipped and malformed frames are reported.
#[tokio::test]
async fn test_transport_skips_unknown_and_reports_malformed_frames() {
    let server = mock_backend::spawn(Backend {
        channel: ChannelScript {
            frames: vec![
                r#"42["heartbeat",{}]"#.to_string(),
                "not json at all".to_string(),
                progress_frame(&[StageStatus::Completed]),
            ],
            close_after: true,
            ..ChannelScript::default()
        },
        ..Backend::default()
    })
    .await;
    let (queue, mut rx) = EventQueue::new();

    let _reader = transport(&server).open(1, queue);

    assert_eq!(next_sync_event(&mut rx).await, SyncEvent::Connected { session: 1 });
    let event = next_sync_event(&mut rx).await;
    assert!(
        matches!(event, SyncEvent::ChannelError { session: 1, .. }),
        "Expected a channel error, got: {event:?}"
    );
    let event = next_sync_event(&mut rx).await;
    assert!(
        matches!(&event, SyncEvent::Snapshot { state, .. } if state.is_complete()),
        "Expected a complete snapshot, got: {event:?}"
    );
    assert_eq!(
        next_sync_event(&mut rx).await,
        SyncEvent::Disconnected { session: 1 }
    );
}

/// Engine.IO pings are answered with pongs.
#[tokio::test]
async fn test_transport_answers_ping() {
    let server = mock_backend::spawn(Backend {
        channel: ChannelScript {
            ping_first: true,
            frames: vec![progress_frame(&[StageStatus::Running])],
            close_after: true,
            ..ChannelScript::default()
        },
        ..Backend::default()
    })
    .await;
    let (queue, mut rx) = EventQueue::new();

    let _reader = transport(&server).open(1, queue);

    assert_eq!(next_sync_event(&mut rx).await, SyncEvent::Connected { session: 1 });
    assert!(matches!(
        next_sync_event(&mut rx).await,
        SyncEvent::Snapshot { session: 1, .. }
    ));
    assert!(server.seen.pong_received());
}

/// Aborting the reader closes the connection without further events.
#[tokio::test]
async fn test_aborted_reader_posts_nothing_more() {
    let server = mock_backend::spawn(Backend {
        channel: ChannelScript {
            frames: vec![progress_frame(&[StageStatus::Running]); 5],
            interval: Duration::from_millis(100),
            ..ChannelScript::default()
        },
        ..Backend::default()
    })
    .await;
    let (queue, mut rx) = EventQueue::new();

    let reader = transport(&server).open(1, queue);
    assert_eq!(next_sync_event(&mut rx).await, SyncEvent::Connected { session: 1 });
    reader.abort();

    let late = timeout(Duration::from_millis(400), rx.recv()).await;
    assert!(
        matches!(late, Err(_) | Ok(None)),
        "Expected no events after abort, got: {late:?}"
    );
}

// ============================================================================
// Synchronizer Tests
// ============================================================================

/// Consecutive complete snapshots over a real channel fire completion once.
#[tokio::test]
async fn test_synchronizer_completes_once_over_channel() {
    let server = mock_backend::spawn(Backend {
        channel: ChannelScript {
            frames: vec![
                progress_frame(&[StageStatus::Running, StageStatus::Pending]),
                progress_frame(&[StageStatus::Completed, StageStatus::Completed]),
                progress_frame(&[StageStatus::Completed, StageStatus::Completed]),
                progress_frame(&[StageStatus::Completed, StageStatus::Completed]),
            ],
            ..ChannelScript::default()
        },
        ..Backend::default()
    })
    .await;
    let (queue, mut rx) = EventQueue::new();
    let mut sync = ProgressSynchronizer::new(
        Arc::new(transport(&server)),
        queue,
        Duration::from_millis(50),
    );

    sync.open();
    sync.open();

    let mut completions = 0;
    let mut updates = 0;
    let _ = timeout(Duration::from_millis(800), async {
        while let Some(AppEvent::Sync(event)) = rx.recv().await {
            match sync.handle(event) {
                Some(SyncSignal::Completed) => completions += 1,
                Some(SyncSignal::Updated) => updates += 1,
                None => {}
            }
        }
    })
    .await;

    assert_eq!(server.seen.channel_connections(), 1);
    assert_eq!(updates, 4);
    assert_eq!(completions, 1);
    assert!(sync.has_completed());
    assert!(sync.latest().is_some_and(|state| state.is_complete()));
}

/// Closing before the delay elapses suppresses completion.
#[tokio::test]
async fn test_synchronizer_close_suppresses_completion() {
    let server = mock_backend::spawn(Backend {
        channel: ChannelScript {
            frames: vec![progress_frame(&[StageStatus::Completed])],
            ..ChannelScript::default()
        },
        ..Backend::default()
    })
    .await;
    let (queue, mut rx) = EventQueue::new();
    let mut sync = ProgressSynchronizer::new(
        Arc::new(transport(&server)),
        queue,
        Duration::from_millis(200),
    );

    sync.open();
    loop {
        let event = next_sync_event(&mut rx).await;
        if sync.handle(event) == Some(SyncSignal::Updated) {
            break;
        }
    }
    sync.close();

    let mut signals = Vec::new();
    let _ = timeout(Duration::from_millis(400), async {
        while let Some(AppEvent::Sync(event)) = rx.recv().await {
            signals.extend(sync.handle(event));
        }
    })
    .await;

    assert!(signals.is_empty(), "Unexpected signals: {signals:?}");
    assert!(!sync.has_completed());
    assert!(sync.latest().is_none());
}

// ============================================================================
// HTTP Progress Snapshot
// ============================================================================

/// `GET /api/progress` returns the current snapshot.
#[tokio::test]
async fn test_fetch_progress_snapshot() {
    let state = progress_state(&[StageStatus::Completed, StageStatus::Running]);
    let server = mock_backend::spawn(Backend {
        progress: Reply::ok(serde_json::to_value(&state).expect("Failed to encode state")),
        ..Backend::default()
    })
    .await;
    let api = HttpCourseApi::new(server.config()).expect("Failed to build client");

    let fetched = api.fetch_progress().await.expect("Failed to fetch progress");

    assert_eq!(fetched, state);
    assert_eq!(fetched.overall_percent(), 50);
    assert!(!fetched.is_complete());
}
