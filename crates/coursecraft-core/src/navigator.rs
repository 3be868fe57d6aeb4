//! Screen navigation state machine.
//!
//! The navigator owns which screen is showing, the loaded course, and the
//! lesson cursor. It is driven by user actions and by the creation workflow
//! handing over a finished course.
//!
//! ```text
//!            create / open              select(i)
//!   Home ------------------> Overview ----------> Lesson <--> next / prev
//!    ^                        |   ^                 |
//!    |                        |   +-- back_to_course+
//!    |                        |   |                 |
//!    |                 assess |   +-- back_to_course+-- assess
//!    |                        v                     v
//!    +------ back_to_home --------- Assessment <----+
//! ```
//!
//! `back_to_home` is accepted from every screen.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assessment::AssessmentSession;
use crate::course::{CourseData, CourseSummary, CreatedCourse, Lesson, MIN_LESSONS};
use crate::error::{CourseError, Result};

/// The screens of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Course request form and history.
    #[default]
    Home,
    /// Lesson cards of the loaded course.
    CourseOverview,
    /// A single lesson.
    Lesson,
    /// Quiz over the loaded course.
    Assessment,
}

impl Screen {
    /// Returns `true` for screens that need a loaded course.
    #[must_use]
    pub const fn requires_course(self) -> bool {
        !matches!(self, Self::Home)
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::CourseOverview => write!(f, "course_overview"),
            Self::Lesson => write!(f, "lesson"),
            Self::Assessment => write!(f, "assessment"),
        }
    }
}

/// The navigation fields shared by every screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    /// Screen currently shown.
    pub current_screen: Screen,
    /// Zero-based index of the lesson being read.
    pub current_lesson_index: usize,
    /// Loaded course, if any.
    pub course_data: Option<CourseData>,
    /// Subject of the loaded course.
    pub subject: String,
    /// Lesson count the course was requested with.
    pub num_lessons: u8,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            current_screen: Screen::Home,
            current_lesson_index: 0,
            course_data: None,
            subject: String::new(),
            num_lessons: MIN_LESSONS,
        }
    }
}

/// Content of the assessment screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssessmentScreen {
    /// An attempt in progress or finished.
    Active(AssessmentSession),
    /// No assessment could be loaded; shows the "not available" screen.
    Unavailable {
        /// Why the assessment is missing.
        reason: String,
    },
}

impl AssessmentScreen {
    /// Builds the unavailable screen from a load error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// The active session, if there is one.
    #[must_use]
    pub const fn session(&self) -> Option<&AssessmentSession> {
        match self {
            Self::Active(session) => Some(session),
            Self::Unavailable { .. } => None,
        }
    }
}

impl From<Result<AssessmentSession>> for AssessmentScreen {
    fn from(result: Result<AssessmentSession>) -> Self {
        match result {
            Ok(session) => Self::Active(session),
            Err(e) => Self::unavailable(e.to_string()),
        }
    }
}

/// The top-level screen state machine.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    state: NavigationState,
    course_filename: Option<String>,
    assessment: Option<AssessmentScreen>,
}

impl Navigator {
    /// Creates a navigator on the home screen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current navigation fields.
    #[must_use]
    pub const fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Screen currently shown.
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.state.current_screen
    }

    /// Loaded course, if any.
    #[must_use]
    pub const fn course(&self) -> Option<&CourseData> {
        self.state.course_data.as_ref()
    }

    /// Backend file name of the loaded course, if it came from history.
    #[must_use]
    pub fn course_filename(&self) -> Option<&str> {
        self.course_filename.as_deref()
    }

    /// Lesson under the cursor; `None` without a course.
    #[must_use]
    pub fn current_lesson(&self) -> Option<&Lesson> {
        crate::course::current_lesson(self.course(), self.state.current_lesson_index)
    }

    /// Number of lessons in the loaded course; 0 without a course.
    #[must_use]
    pub fn total_lessons(&self) -> usize {
        crate::course::total_lessons(self.course())
    }

    /// Returns `true` when the cursor is on the final lesson.
    #[must_use]
    pub fn is_last_lesson(&self) -> bool {
        self.total_lessons() > 0 && self.state.current_lesson_index + 1 == self.total_lessons()
    }

    /// Assessment screen content while on the assessment screen.
    #[must_use]
    pub const fn assessment(&self) -> Option<&AssessmentScreen> {
        self.assessment.as_ref()
    }

    /// Mutable access to the running assessment attempt.
    pub fn assessment_session_mut(&mut self) -> Option<&mut AssessmentSession> {
        match self.assessment.as_mut() {
            Some(AssessmentScreen::Active(session)) => Some(session),
            _ => None,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Enters the course overview with a freshly created course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidTransition` unless on the home screen.
    pub fn create_course(&mut self, created: CreatedCourse) -> Result<()> {
        self.ensure_screen(&[Screen::Home], Screen::CourseOverview)?;

        self.state.subject = created.spec.subject().to_string();
        self.state.num_lessons = created.spec.num_lessons();
        self.load_course(created.course_data, None);
        Ok(())
    }

    /// Enters the course overview with a course picked from history.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidTransition` unless on the home screen.
    pub fn open_course(&mut self, summary: CourseSummary) -> Result<()> {
        self.ensure_screen(&[Screen::Home], Screen::CourseOverview)?;

        self.state.num_lessons = summary.num_lessons();
        self.state.subject = summary.subject;
        self.load_course(summary.course_data, summary.filename);
        Ok(())
    }

    /// Opens lesson `index`. Returns `false` and changes nothing when no
    /// course is loaded or `index` is out of range.
    pub fn select_lesson(&mut self, index: usize) -> bool {
        if index >= self.total_lessons() {
            debug!(index, total = self.total_lessons(), "Ignoring out-of-range lesson");
            return false;
        }
        self.assessment = None;
        self.state.current_lesson_index = index;
        self.go(Screen::Lesson);
        true
    }

    /// Moves to the next lesson. A no-op on the last lesson or off the
    /// lesson screen.
    pub fn next_lesson(&mut self) -> bool {
        if self.screen() != Screen::Lesson || self.is_last_lesson() {
            return false;
        }
        self.state.current_lesson_index += 1;
        true
    }

    /// Moves to the previous lesson. A no-op on the first lesson or off the
    /// lesson screen.
    pub fn previous_lesson(&mut self) -> bool {
        if self.screen() != Screen::Lesson || self.state.current_lesson_index == 0 {
            return false;
        }
        self.state.current_lesson_index -= 1;
        true
    }

    /// Returns to the course overview, discarding any assessment attempt.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidTransition` unless on the lesson or
    /// assessment screen.
    pub fn back_to_course(&mut self) -> Result<()> {
        self.ensure_screen(&[Screen::Lesson, Screen::Assessment], Screen::CourseOverview)?;
        self.assessment = None;
        self.go(Screen::CourseOverview);
        Ok(())
    }

    /// Resets every navigation field and shows the home screen.
    pub fn back_to_home(&mut self) {
        self.state = NavigationState::default();
        self.course_filename = None;
        self.assessment = None;
        debug!("Returned to home");
    }

    /// Enters the assessment screen.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidTransition` unless a course is loaded and
    /// the overview or a lesson is showing.
    pub fn start_assessment(&mut self, screen: AssessmentScreen) -> Result<()> {
        self.ensure_screen(&[Screen::CourseOverview, Screen::Lesson], Screen::Assessment)?;
        if self.course().is_none() {
            return Err(CourseError::invalid_transition(self.screen(), Screen::Assessment));
        }
        self.assessment = Some(screen);
        self.go(Screen::Assessment);
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn ensure_screen(&self, allowed: &[Screen], to: Screen) -> Result<()> {
        if allowed.contains(&self.screen()) {
            Ok(())
        } else {
            Err(CourseError::invalid_transition(self.screen(), to))
        }
    }

    fn load_course(&mut self, course: CourseData, filename: Option<String>) {
        self.state.course_data = Some(course);
        self.state.current_lesson_index = 0;
        self.course_filename = filename;
        self.assessment = None;
        self.go(Screen::CourseOverview);
    }

    fn go(&mut self, to: Screen) {
        debug!(from = %self.state.current_screen, to = %to, "Screen transition");
        self.state.current_screen = to;
    }
}

// ============================================================================
// Tests
// ============================================================================
