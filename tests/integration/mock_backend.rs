//! In-process course backend for integration tests.
//!
//! Serves the HTTP endpoints and a Socket.IO progress channel on an
//! ephemeral port. Responses and pushed frames are fixed up front per test.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{RawQuery, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coursecraft_client::{ChannelEvent, Config, CONNECT_PACKET, ENGINE_IO_QUERY, PONG_PACKET};
use coursecraft_core::{ProgressState, Stage, StageStatus};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};

/// A canned HTTP reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Engine.IO handshake sent on every new connection.
const OPEN_PACKET: &str =
    r#"0{"sid":"mock-engine","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

/// Accepts a join of the default namespace.
const JOINED_PACKET: &str = r#"40{"sid":"mock-socket"}"#;

/// Socket.IO disconnect of the default namespace.
const DISCONNECT_PACKET: &str = "41";

/// What a progress channel connection does.
#[derive(Debug, Clone, Default)]
pub struct ChannelScript {
    /// Send an Engine.IO ping first and wait for the pong.
    pub ping_first: bool,
    /// Text frames to push, in order.
    pub frames: Vec<String>,
    /// Pause before each frame.
    pub interval: Duration,
    /// Disconnect after the last frame instead of idling.
    pub close_after: bool,
}

/// Everything the backend will answer.
#[derive(Debug, Clone)]
pub struct Backend {
    pub create: Reply,
    pub courses: Reply,
    pub assessment: Reply,
    pub progress: Reply,
    pub channel: ChannelScript,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            create: Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "not configured"),
            courses: Reply::ok(json!({ "courses": [] })),
            assessment: Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "not configured"),
            progress: Reply::ok(json!({})),
            channel: ChannelScript::default(),
        }
    }
}

/// What the backend saw.
#[derive(Debug, Default)]
pub struct Seen {
    pub create_requests: AtomicUsize,
    pub assessment_requests: AtomicUsize,
    pub channel_connections: AtomicUsize,
    pub pong_received: AtomicBool,
    pub last_create_body: Mutex<Option<Value>>,
    pub last_assessment_body: Mutex<Option<Value>>,
}

impl Seen {
    pub fn create_requests(&self) -> usize {
        self.create_requests.load(Ordering::SeqCst)
    }

    pub fn channel_connections(&self) -> usize {
        self.channel_connections.load(Ordering::SeqCst)
    }

    pub fn pong_received(&self) -> bool {
        self.pong_received.load(Ordering::SeqCst)
    }

    pub fn last_create_body(&self) -> Option<Value> {
        self.last_create_body.lock().expect("lock poisoned").clone()
    }

    pub fn last_assessment_body(&self) -> Option<Value> {
        self.last_assessment_body.lock().expect("lock poisoned").clone()
    }
}

#[derive(Debug)]
struct MockState {
    backend: Backend,
    seen: Arc<Seen>,
}

/// A running backend.
pub struct MockServer {
    pub base_url: String,
    pub seen: Arc<Seen>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// Client configuration pointing at this server.
    pub fn config(&self) -> Config {
        Config {
            server_url: self.base_url.clone(),
            completion_delay_ms: 50,
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            ..Config::default()
        }
    }

    /// The progress channel URL.
    pub fn ws_url(&self) -> String {
        self.config().channel_url()
    }
}

/// Helper to find an available port for testing.
fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Spawns the backend and returns once it accepts connections.
pub async fn spawn(backend: Backend) -> MockServer {
    let port = find_available_port();
    let addr = format!("127.0.0.1:{port}");
    let seen = Arc::new(Seen::default());

    let state = Arc::new(MockState {
        backend,
        seen: Arc::clone(&seen),
    });
    let router = Router::new()
        .route("/api/create-course", post(handle_create))
        .route("/api/courses", get(handle_courses))
        .route("/api/build-assessment", post(handle_assessment))
        .route("/api/progress", get(handle_progress))
        .route("/socket.io/", get(handle_ws))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    MockServer {
        base_url: format!("http://{addr}"),
        seen,
        _handle: handle,
    }
}

async fn reply(reply: &Reply) -> (StatusCode, Json<Value>) {
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (reply.status, Json(reply.body.clone()))
}

async fn handle_create(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen.create_requests.fetch_add(1, Ordering::SeqCst);
    *state.seen.last_create_body.lock().expect("lock poisoned") = Some(body);
    reply(&state.backend.create).await
}

async fn handle_courses(State(state): State<Arc<MockState>>) -> (StatusCode, Json<Value>) {
    reply(&state.backend.courses).await
}

async fn handle_assessment(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen.assessment_requests.fetch_add(1, Ordering::SeqCst);
    *state.seen.last_assessment_body.lock().expect("lock poisoned") = Some(body);
    reply(&state.backend.assessment).await
}

async fn handle_progress(State(state): State<Arc<MockState>>) -> (StatusCode, Json<Value>) {
    reply(&state.backend.progress).await
}

async fn handle_ws(
    ws: WebSocketUpgrade,
    RawQuery(query): RawQuery,
    State(state): State<Arc<MockState>>,
) -> Response {
    if query.as_deref() != Some(ENGINE_IO_QUERY) {
        return (StatusCode::BAD_REQUEST, "unsupported Engine.IO query").into_response();
    }
    state.seen.channel_connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| run_channel(socket, state))
}

/// Waits up to two seconds for a text frame equal to `expected`.
async fn wait_for_text(receiver: &mut SplitStream<WebSocket>, expected: &str) -> bool {
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(&msg, Message::Text(text) if text == expected) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

async fn run_channel(socket: WebSocket, state: Arc<MockState>) {
    let script = &state.backend.channel;
    let (mut sender, mut receiver) = socket.split();

    // Engine.IO open, then the client joins the default namespace.
    if sender.send(Message::Text(OPEN_PACKET.to_string())).await.is_err() {
        return;
    }
    if !wait_for_text(&mut receiver, CONNECT_PACKET).await {
        return;
    }
    if sender.send(Message::Text(JOINED_PACKET.to_string())).await.is_err() {
        return;
    }

    if script.ping_first {
        if sender.send(Message::Text("2".to_string())).await.is_err() {
            return;
        }
        if wait_for_text(&mut receiver, PONG_PACKET).await {
            state.seen.pong_received.store(true, Ordering::SeqCst);
        }
    }

    for frame in &script.frames {
        if !script.interval.is_zero() {
            tokio::time::sleep(script.interval).await;
        }
        if sender.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }

    if script.close_after {
        let _ = sender.send(Message::Text(DISCONNECT_PACKET.to_string())).await;
        let _ = sender.send(Message::Close(None)).await;
        return;
    }

    // Idle until the client goes away.
    while let Some(Ok(msg)) = receiver.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A `progress_update` event packet with one stage per status.
pub fn progress_frame(statuses: &[StageStatus]) -> String {
    ChannelEvent::ProgressUpdate(progress_state(statuses))
        .to_frame()
        .expect("Failed to encode frame")
}

/// A snapshot with one stage per status.
pub fn progress_state(statuses: &[StageStatus]) -> ProgressState {
    let stages = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| Stage::new(format!("stage_{i}"), format!("Stage {i}"), *status))
        .collect::<Vec<_>>();
    let done = statuses
        .iter()
        .filter(|s| **s == StageStatus::Completed)
        .count();
    let mut state = ProgressState::from_stages(stages);
    state.overall_progress = u32::try_from(done * 100 / statuses.len().max(1)).unwrap_or(100);
    state
}

/// Two-lesson course data as the backend sends it.
pub fn course_json() -> Value {
    json!({
        "course": {
            "lesson_b_first": {
                "title": "Origins",
                "key_concepts": ["Timeline", "Sources"],
                "key_terms": {"Primary source": "A first-hand account"},
                "main_lesson_text": "History starts here.\n\nIt continues."
            },
            "lesson_a_second": {
                "title": "Empires",
                "key_concepts": ["Expansion"],
                "key_terms": {},
                "main_lesson_text": "Empires rose and fell."
            }
        }
    })
}

/// A two-question assessment wrapped the way the backend wraps it.
pub fn assessment_json() -> Value {
    json!({
        "assessment": {
            "title": "History Check",
            "questions": [
                {
                    "id": 1,
                    "type": "multiple_choice",
                    "question": "Which lesson came first?",
                    "options": ["Empires", "Origins"],
                    "correct_answer": 1,
                    "explanation": "Origins opens the course."
                },
                {
                    "id": 2,
                    "type": "true_false",
                    "question": "Empires rose and fell.",
                    "correct_answer": true
                }
            ]
        }
    })
}
