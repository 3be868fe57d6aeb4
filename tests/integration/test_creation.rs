//! Integration tests for course creation, history and assessments.
//!
//! These tests run the real HTTP client and WebSocket transport against an
//! in-process backend and drive the app through its event queue.

mod mock_backend;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use coursecraft_client::{
    Action, App, AppEvent, ClientError, Config, CreationPhase, History, HttpCourseApi,
    WebSocketTransport,
};
use coursecraft_core::{Answer, AssessmentScreen, Screen, ScoreTier, StageStatus};
use coursecraft_report::{ClientView, MarkdownGenerator};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use mock_backend::{
    assessment_json, course_json, progress_frame, Backend, ChannelScript, MockServer, Reply,
};

type TestApp = App<HttpCourseApi>;

/// Builds an app wired to the mock backend.
fn build_app(server: &MockServer) -> (TestApp, UnboundedReceiver<AppEvent>) {
    build_app_with_config(&server.config())
}

fn build_app_with_config(config: &Config) -> (TestApp, UnboundedReceiver<AppEvent>) {
    let api = Arc::new(HttpCourseApi::new(config.clone()).expect("Failed to build client"));
    let transport = Arc::new(WebSocketTransport::from_config(config));
    App::new(api, transport, config.completion_delay())
}

/// Handles queued events until `done` holds.
async fn drive_until(
    app: &mut TestApp,
    rx: &mut UnboundedReceiver<AppEvent>,
    what: &str,
    done: impl Fn(&TestApp) -> bool,
) {
    let result = timeout(Duration::from_secs(5), async {
        while !done(app) {
            let event = rx.recv().await.expect("Event queue closed");
            app.handle(event);
        }
    })
    .await;
    assert!(result.is_ok(), "Timed out waiting for {what}");
}

/// Handles whatever arrives within `duration`.
async fn drive_for(app: &mut TestApp, rx: &mut UnboundedReceiver<AppEvent>, duration: Duration) {
    let _ = timeout(duration, async {
        while let Some(event) = rx.recv().await {
            app.handle(event);
        }
    })
    .await;
}

fn submit(app: &mut TestApp, subject: &str, num_lessons: u8) {
    app.handle(
        Action::Submit {
            subject: subject.to_string(),
            num_lessons,
        }
        .into(),
    );
}

fn success_reply() -> Reply {
    Reply::ok(json!({ "success": true, "course_data": course_json() }))
}

fn completing_channel(interval: Duration) -> ChannelScript {
    ChannelScript {
        frames: vec![
            progress_frame(&[StageStatus::Running, StageStatus::Pending]),
            progress_frame(&[StageStatus::Completed, StageStatus::Running]),
            progress_frame(&[StageStatus::Completed, StageStatus::Completed]),
            progress_frame(&[StageStatus::Completed, StageStatus::Completed]),
        ],
        interval,
        ..ChannelScript::default()
    }
}

// ============================================================================
// Creation Tests
// ============================================================================

/// Progress finishes before the server answers; the overview waits for the
/// course.
#[tokio::test]
async fn test_progress_first_then_course_enters_overview() {
    let server = mock_backend::spawn(Backend {
        create: success_reply().after(Duration::from_millis(400)),
        channel: completing_channel(Duration::from_millis(10)),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    submit(&mut app, "History", 2);
    assert!(app.workflow().is_loading());

    drive_until(&mut app, &mut rx, "progress to complete", |app| {
        app.workflow().handoff().progress_complete()
    })
    .await;
    assert_eq!(app.navigator().screen(), Screen::Home);

    drive_until(&mut app, &mut rx, "course overview", |app| {
        app.navigator().screen() == Screen::CourseOverview
    })
    .await;

    let state = app.navigator().state();
    assert_eq!(state.subject, "History");
    assert_eq!(state.num_lessons, 2);
    let course = app.navigator().course().expect("Course should be loaded");
    let keys: Vec<&str> = course.ordered_lessons().iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec!["lesson_b_first", "lesson_a_second"]);

    assert_eq!(server.seen.create_requests(), 1);
    assert_eq!(
        server.seen.last_create_body(),
        Some(json!({ "subject": "History", "numLessons": 2 }))
    );
    assert_eq!(server.seen.channel_connections(), 1);
    assert_eq!(app.workflow().phase(), CreationPhase::Idle);
    assert!(!app.workflow().is_tracking_progress());
}

/// The server answers first; the overview waits for progress to finish.
#[tokio::test]
async fn test_course_first_then_progress_enters_overview() {
    let server = mock_backend::spawn(Backend {
        create: success_reply(),
        channel: completing_channel(Duration::from_millis(150)),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    submit(&mut app, "History", 2);

    drive_until(&mut app, &mut rx, "creation response", |app| {
        app.workflow().phase() == CreationPhase::AwaitingProgress
    })
    .await;
    assert_eq!(app.navigator().screen(), Screen::Home);
    assert!(app.workflow().handoff().has_result());
    assert!(!app.workflow().is_loading());

    drive_until(&mut app, &mut rx, "course overview", |app| {
        app.navigator().screen() == Screen::CourseOverview
    })
    .await;

    let view = ClientView::default();
    let markdown = MarkdownGenerator::new(app.navigator(), view).generate();
    let first = markdown.find("## Lesson 1: Origins").expect("First card missing");
    let second = markdown.find("## Lesson 2: Empires").expect("Second card missing");
    assert!(first < second);
}

/// The overview is entered once even when completion is reported repeatedly.
#[tokio::test]
async fn test_repeated_completion_enters_overview_once() {
    let server = mock_backend::spawn(Backend {
        create: success_reply(),
        channel: completing_channel(Duration::from_millis(10)),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    submit(&mut app, "History", 2);
    drive_until(&mut app, &mut rx, "course overview", |app| {
        app.navigator().screen() == Screen::CourseOverview
    })
    .await;

    assert!(app.handle(Action::SelectLesson(1).into()));
    drive_for(&mut app, &mut rx, Duration::from_millis(300)).await;

    assert_eq!(app.navigator().screen(), Screen::Lesson);
    assert_eq!(app.navigator().state().current_lesson_index, 1);
    assert_eq!(app.notice(), None);
}

/// A server error is shown inline and stops progress tracking.
#[tokio::test]
async fn test_server_error_is_shown_inline() {
    let server = mock_backend::spawn(Backend {
        create: Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "LLM unavailable"),
        channel: ChannelScript::default(),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    submit(&mut app, "History", 2);
    drive_until(&mut app, &mut rx, "creation error", |app| {
        app.workflow().error().is_some()
    })
    .await;

    assert_eq!(
        app.workflow().error(),
        Some("Failed to create course: LLM unavailable")
    );
    assert_eq!(app.navigator().screen(), Screen::Home);
    assert_eq!(app.workflow().phase(), CreationPhase::Idle);
    assert!(!app.workflow().is_tracking_progress());
}

/// A 2xx body without a course is an invalid response, even with an error
/// message in it.
#[tokio::test]
async fn test_unsuccessful_body_is_invalid_response() {
    let server = mock_backend::spawn(Backend {
        create: Reply::ok(json!({ "success": false, "error": "Generation failed" })),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    submit(&mut app, "History", 1);
    drive_until(&mut app, &mut rx, "creation error", |app| {
        app.workflow().error().is_some()
    })
    .await;

    assert_eq!(
        app.workflow().error(),
        Some("Failed to create course: Invalid response from server")
    );
}

/// A creation request that outlives the request timeout fails inline.
#[tokio::test]
async fn test_request_timeout_is_shown_inline() {
    let server = mock_backend::spawn(Backend {
        create: success_reply().after(Duration::from_secs(3)),
        ..Backend::default()
    })
    .await;
    let config = Config {
        request_timeout_secs: 1,
        ..server.config()
    };
    let (mut app, mut rx) = build_app_with_config(&config);

    submit(&mut app, "History", 2);
    drive_until(&mut app, &mut rx, "creation timeout", |app| {
        app.workflow().error().is_some()
    })
    .await;

    assert_eq!(
        app.workflow().error(),
        Some("Failed to create course: request timed out")
    );
    assert_eq!(app.navigator().screen(), Screen::Home);
    assert_eq!(app.workflow().phase(), CreationPhase::Idle);
    assert!(!app.workflow().is_tracking_progress());
}

/// An empty subject never reaches the network.
#[tokio::test]
async fn test_empty_subject_sends_no_request() {
    let server = mock_backend::spawn(Backend::default()).await;
    let (mut app, mut rx) = build_app(&server);

    submit(&mut app, "   ", 2);
    assert_eq!(app.notice(), Some("Please enter a subject to learn about"));

    drive_for(&mut app, &mut rx, Duration::from_millis(200)).await;
    assert_eq!(server.seen.create_requests(), 0);
    assert_eq!(server.seen.channel_connections(), 0);
}

/// A second submit while the first is in flight is rejected.
#[tokio::test]
async fn test_submit_while_loading_is_rejected() {
    let server = mock_backend::spawn(Backend {
        create: success_reply().after(Duration::from_millis(300)),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    submit(&mut app, "History", 2);
    submit(&mut app, "Geology", 3);
    assert_eq!(app.notice(), Some(ClientError::Busy.to_string().as_str()));

    drive_until(&mut app, &mut rx, "creation response", |app| {
        app.workflow().phase() == CreationPhase::AwaitingProgress
    })
    .await;
    assert_eq!(server.seen.create_requests(), 1);
}

/// Cancelling during the progress phase absorbs the late response.
#[tokio::test]
async fn test_cancel_absorbs_late_response() {
    let server = mock_backend::spawn(Backend {
        create: success_reply().after(Duration::from_millis(200)),
        channel: completing_channel(Duration::from_millis(10)),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    submit(&mut app, "History", 2);
    app.handle(Action::Cancel.into());
    assert!(!app.workflow().is_tracking_progress());

    drive_for(&mut app, &mut rx, Duration::from_millis(500)).await;

    assert_eq!(app.navigator().screen(), Screen::Home);
    assert_eq!(app.workflow().phase(), CreationPhase::Idle);
    assert_eq!(app.workflow().error(), None);
    assert!(app.navigator().course().is_none());
}

// ============================================================================
// History and Assessment Tests
// ============================================================================

fn history_reply() -> Reply {
    Reply::ok(json!({
        "courses": [{
            "id": "c-1",
            "filename": "history_course.json",
            "subject": "History",
            "lesson_count": 2,
            "created": 1_704_067_200.0,
            "course_data": course_json()
        }]
    }))
}

/// A course from history can be opened and assessed end to end.
#[tokio::test]
async fn test_history_course_assessment_flow() {
    let server = mock_backend::spawn(Backend {
        courses: history_reply(),
        assessment: Reply::ok(json!({ "success": true, "assessment_data": assessment_json() })),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    app.handle(Action::LoadHistory.into());
    assert_eq!(app.history(), &History::Loading);
    drive_until(&mut app, &mut rx, "history", |app| {
        matches!(app.history(), History::Loaded(_))
    })
    .await;
    assert_eq!(app.history().courses().len(), 1);

    app.handle(Action::OpenCourse(0).into());
    assert_eq!(app.navigator().screen(), Screen::CourseOverview);
    assert_eq!(app.navigator().course_filename(), Some("history_course.json"));
    assert_eq!(app.navigator().state().num_lessons, 2);

    app.handle(Action::StartAssessment.into());
    assert!(app.is_assessment_loading());
    drive_until(&mut app, &mut rx, "assessment", |app| {
        app.navigator().screen() == Screen::Assessment
    })
    .await;
    assert_eq!(
        server.seen.last_assessment_body(),
        Some(json!({ "courseFilename": "history_course.json" }))
    );

    app.handle(Action::Answer(Answer::Choice(1)).into());
    app.handle(Action::NextQuestion.into());
    app.handle(Action::Answer(Answer::Bool(true)).into());
    app.handle(Action::NextQuestion.into());
    assert_eq!(app.notice(), None);

    let outcome = app
        .navigator()
        .assessment()
        .and_then(AssessmentScreen::session)
        .and_then(|session| session.outcome())
        .expect("Assessment should be scored");
    assert_eq!(outcome.score, 2);
    assert_eq!(outcome.percentage, 100);
    assert_eq!(outcome.tier, ScoreTier::Mastered);
}

/// A failed history fetch is reported without leaving home.
#[tokio::test]
async fn test_history_failure() {
    let server = mock_backend::spawn(Backend {
        courses: Reply::error(StatusCode::SERVICE_UNAVAILABLE, "database unavailable"),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    app.handle(Action::LoadHistory.into());
    drive_until(&mut app, &mut rx, "history failure", |app| {
        matches!(app.history(), History::Failed(_))
    })
    .await;

    assert_eq!(app.history(), &History::Failed("database unavailable".to_string()));
    assert_eq!(app.navigator().screen(), Screen::Home);
}

/// A failed assessment build shows the "not available" screen.
#[tokio::test]
async fn test_assessment_failure_shows_unavailable() {
    let server = mock_backend::spawn(Backend {
        courses: history_reply(),
        assessment: Reply::error(StatusCode::NOT_FOUND, "Course file not found"),
        ..Backend::default()
    })
    .await;
    let (mut app, mut rx) = build_app(&server);

    app.handle(Action::LoadHistory.into());
    drive_until(&mut app, &mut rx, "history", |app| {
        matches!(app.history(), History::Loaded(_))
    })
    .await;
    app.handle(Action::OpenCourse(0).into());
    app.handle(Action::StartAssessment.into());
    drive_until(&mut app, &mut rx, "assessment screen", |app| {
        app.navigator().screen() == Screen::Assessment
    })
    .await;

    let Some(AssessmentScreen::Unavailable { reason }) = app.navigator().assessment() else {
        panic!("Expected the unavailable screen");
    };
    assert!(reason.contains("Course file not found"), "reason: {reason}");
}
