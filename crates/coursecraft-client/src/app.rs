//! The app driver.
//!
//! [`App`] owns the navigator, the creation workflow, the course history and
//! assessment loading. Every user action and every async completion reaches
//! it as an [`AppEvent`] on one queue and is applied in order, so no state is
//! ever shared between tasks.

use std::sync::Arc;
use std::time::Duration;

use coursecraft_core::{
    Answer, Assessment, AssessmentScreen, AssessmentSession, CourseSummary, CreatedCourse,
    Navigator, Screen,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::api::CourseApi;
use crate::channel::ProgressTransport;
use crate::error::Result;
use crate::queue::{AppEvent, EventQueue};
use crate::sync::ProgressSynchronizer;
use crate::workflow::CreationWorkflow;

/// Reason shown when a course has no backend file to build an assessment
/// from.
pub const NO_SAVED_COURSE: &str =
    "this course has not been saved on the server yet; open it from your course history to build an assessment";

// ============================================================================
// Actions
// ============================================================================

/// Something the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Request a new course.
    Submit {
        /// Subject as typed.
        subject: String,
        /// Requested lesson count.
        num_lessons: u8,
    },
    /// Leave the progress phase.
    Cancel,
    /// Fetch the course history.
    LoadHistory,
    /// Open the course at this position in the loaded history.
    OpenCourse(usize),
    /// Open a lesson by zero-based index.
    SelectLesson(usize),
    /// Next lesson. On the last lesson this finishes the course and
    /// returns home.
    NextLesson,
    /// Previous lesson.
    PreviousLesson,
    /// Back to the course overview.
    BackToCourse,
    /// Back to the home screen.
    BackToHome,
    /// Open the assessment for the loaded course.
    StartAssessment,
    /// Answer the current question.
    Answer(Answer),
    /// Next question, or results after the last one.
    NextQuestion,
    /// Previous question.
    PreviousQuestion,
    /// Clear all answers and start over.
    RestartAssessment,
    /// Stop the app.
    Quit,
}

// ============================================================================
// History
// ============================================================================

/// State of the course history list.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum History {
    /// Never requested.
    #[default]
    NotLoaded,
    /// Request in flight.
    Loading,
    /// Courses from the server, newest first.
    Loaded(Vec<CourseSummary>),
    /// The request failed.
    Failed(String),
}

impl History {
    /// Loaded courses; empty unless loaded.
    #[must_use]
    pub fn courses(&self) -> &[CourseSummary] {
        match self {
            Self::Loaded(courses) => courses,
            _ => &[],
        }
    }
}

// ============================================================================
// App
// ============================================================================

/// Single-queue driver for the whole client.
#[derive(Debug)]
pub struct App<A> {
    api: Arc<A>,
    queue: EventQueue,
    navigator: Navigator,
    workflow: CreationWorkflow<A>,
    history: History,
    assessment_file: Option<Assessment>,
    assessment_request: u64,
    assessment_loading: bool,
    notice: Option<String>,
    running: bool,
}

impl<A: CourseApi> App<A> {
    /// Creates the app and the receiver its events arrive on.
    #[must_use]
    pub fn new(
        api: Arc<A>,
        transport: Arc<dyn ProgressTransport>,
        completion_delay: Duration,
    ) -> (Self, UnboundedReceiver<AppEvent>) {
        let (queue, rx) = EventQueue::new();
        let sync = ProgressSynchronizer::new(transport, queue.clone(), completion_delay);
        let workflow = CreationWorkflow::new(Arc::clone(&api), queue.clone(), sync);
        let app = Self {
            api,
            queue,
            navigator: Navigator::new(),
            workflow,
            history: History::NotLoaded,
            assessment_file: None,
            assessment_request: 0,
            assessment_loading: false,
            notice: None,
            running: true,
        };
        (app, rx)
    }

    /// Uses a fixed assessment for every course instead of asking the
    /// server.
    #[must_use]
    pub fn with_assessment(mut self, assessment: Assessment) -> Self {
        self.assessment_file = Some(assessment);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// A handle for posting events.
    #[must_use]
    pub fn queue(&self) -> EventQueue {
        self.queue.clone()
    }

    /// The screen state machine.
    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// The creation workflow.
    #[must_use]
    pub const fn workflow(&self) -> &CreationWorkflow<A> {
        &self.workflow
    }

    /// The course history list.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Returns `true` while an assessment is being built.
    #[must_use]
    pub const fn is_assessment_loading(&self) -> bool {
        self.assessment_loading
    }

    /// One-line message from the last action, if any.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Returns `false` after `Action::Quit`.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    // ========================================================================
    // Event Handling
    // ========================================================================

    /// Drains the queue until the app quits or every sender is gone.
    pub async fn run(mut self, mut rx: UnboundedReceiver<AppEvent>) -> Self {
        while self.running {
            let Some(event) = rx.recv().await else {
                break;
            };
            self.handle(event);
        }
        self
    }

    /// Applies one event. Returns `true` if anything visible may have
    /// changed.
    pub fn handle(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Action(action) => {
                self.notice = None;
                self.apply(action);
                true
            }
            AppEvent::Sync(event) => {
                if let Some(course) = self.workflow.on_progress(event) {
                    self.enter_course(course);
                }
                true
            }
            AppEvent::CreationFinished { run, result } => {
                if let Some(course) = self.workflow.on_creation_finished(run, result) {
                    self.enter_course(course);
                }
                true
            }
            AppEvent::HistoryLoaded(result) => {
                self.history = match result {
                    Ok(courses) => {
                        info!(count = courses.len(), "Course history loaded");
                        History::Loaded(courses)
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to load course history");
                        History::Failed(e.to_string())
                    }
                };
                true
            }
            AppEvent::AssessmentLoaded { request, result } => {
                self.on_assessment_loaded(request, result)
            }
        }
    }

    fn apply(&mut self, action: Action) {
        debug!(?action, screen = %self.navigator.screen(), "Applying action");
        match action {
            Action::Submit {
                subject,
                num_lessons,
            } => self.submit(&subject, num_lessons),
            Action::Cancel => self.workflow.cancel(),
            Action::LoadHistory => self.load_history(),
            Action::OpenCourse(index) => self.open_course(index),
            Action::SelectLesson(index) => {
                if self.navigator.select_lesson(index) {
                    self.abandon_assessment_build();
                } else {
                    self.notice = Some(format!("There is no lesson {}", index + 1));
                }
            }
            Action::NextLesson => self.next_lesson(),
            Action::PreviousLesson => {
                if self.navigator.previous_lesson() {
                    self.abandon_assessment_build();
                }
            }
            Action::BackToCourse => {
                self.abandon_assessment_build();
                if let Err(e) = self.navigator.back_to_course() {
                    self.notice = Some(e.to_string());
                }
            }
            Action::BackToHome => self.go_home(),
            Action::StartAssessment => self.start_assessment(),
            Action::Answer(answer) => self.with_session(|session| session.answer_current(answer)),
            Action::NextQuestion => self.with_session(|session| session.next().map(|_| ())),
            Action::PreviousQuestion => self.with_session(|session| {
                session.previous();
                Ok(())
            }),
            Action::RestartAssessment => self.with_session(|session| {
                session.restart();
                Ok(())
            }),
            Action::Quit => {
                self.workflow.cancel();
                self.running = false;
            }
        }
    }

    // ========================================================================
    // Course Creation and History
    // ========================================================================

    fn submit(&mut self, subject: &str, num_lessons: u8) {
        if self.navigator.screen() != Screen::Home {
            self.notice = Some("Return home to create a new course".to_string());
            return;
        }
        if let Err(e) = self.workflow.submit(subject, num_lessons) {
            self.notice = Some(e.user_message());
        }
    }

    fn load_history(&mut self) {
        if self.history == History::Loading {
            return;
        }
        self.history = History::Loading;
        let api = Arc::clone(&self.api);
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let result = api.list_courses().await;
            queue.post(AppEvent::HistoryLoaded(result));
        });
    }

    fn open_course(&mut self, index: usize) {
        let Some(summary) = self.history.courses().get(index).cloned() else {
            self.notice = Some(format!("There is no course {} in your history", index + 1));
            return;
        };
        if self.navigator.screen() != Screen::Home {
            self.go_home();
        }
        self.workflow.cancel();
        if let Err(e) = self.navigator.open_course(summary) {
            self.notice = Some(e.to_string());
        }
    }

    fn enter_course(&mut self, course: CreatedCourse) {
        if let Err(e) = self.navigator.create_course(course) {
            warn!(error = %e, "Finished course arrived off the home screen");
            self.notice = Some(e.to_string());
        }
    }

    fn go_home(&mut self) {
        self.abandon_assessment_build();
        self.navigator.back_to_home();
    }

    fn next_lesson(&mut self) {
        if self.navigator.screen() == Screen::Lesson && self.navigator.is_last_lesson() {
            info!(subject = %self.navigator.state().subject, "Course completed");
            self.go_home();
        } else if self.navigator.next_lesson() {
            self.abandon_assessment_build();
        }
    }

    // ========================================================================
    // Assessment
    // ========================================================================

    fn start_assessment(&mut self) {
        if !matches!(
            self.navigator.screen(),
            Screen::CourseOverview | Screen::Lesson
        ) {
            self.notice = Some("Open a course to take its assessment".to_string());
            return;
        }

        if let Some(assessment) = self.assessment_file.clone() {
            self.show_assessment(AssessmentSession::new(assessment).into());
            return;
        }

        let Some(filename) = self.navigator.course_filename().map(str::to_string) else {
            self.show_assessment(AssessmentScreen::unavailable(NO_SAVED_COURSE));
            return;
        };
        if self.assessment_loading {
            return;
        }

        self.assessment_request += 1;
        self.assessment_loading = true;
        let request = self.assessment_request;
        let api = Arc::clone(&self.api);
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let result = api.build_assessment(&filename).await;
            queue.post(AppEvent::AssessmentLoaded { request, result });
        });
    }

    /// Leaving the screen an assessment was requested from drops the
    /// pending build; its response is absorbed when it arrives.
    fn abandon_assessment_build(&mut self) {
        if self.assessment_loading {
            debug!(request = self.assessment_request, "Abandoning assessment build");
            self.assessment_loading = false;
        }
    }

    fn on_assessment_loaded(&mut self, request: u64, result: Result<Assessment>) -> bool {
        if request != self.assessment_request || !self.assessment_loading {
            debug!(request, "Absorbing stale assessment response");
            return false;
        }
        self.assessment_loading = false;

        let screen = match result {
            Ok(assessment) => AssessmentSession::new(assessment).into(),
            Err(e) => {
                warn!(error = %e, "Failed to build assessment");
                AssessmentScreen::unavailable(e.to_string())
            }
        };
        self.show_assessment(screen);
        true
    }

    fn show_assessment(&mut self, screen: AssessmentScreen) {
        if let Err(e) = self.navigator.start_assessment(screen) {
            self.notice = Some(e.to_string());
        }
    }

    fn with_session(
        &mut self,
        f: impl FnOnce(&mut AssessmentSession) -> std::result::Result<(), coursecraft_core::AssessmentError>,
    ) {
        let Some(session) = self.navigator.assessment_session_mut() else {
            self.notice = Some("No assessment in progress".to_string());
            return;
        };
        if let Err(e) = f(session) {
            self.notice = Some(e.to_string());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
