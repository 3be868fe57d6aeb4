//! Markdown rendering of the client screens.
//!
//! [`MarkdownGenerator`] turns the navigator plus a [`ClientView`] of the
//! client-side state into one Markdown document for the current screen:
//!
//! - Home: course form options, loading and error lines, the progress panel
//!   and the course history
//! - Course overview: one card per lesson in course order
//! - Lesson: concepts, terms and the lesson body split into paragraphs
//! - Assessment: the current question, the results with a per-question
//!   review, or the "not available" screen
//!
//! Missing lesson fields never fail rendering; they show an explicit
//! fallback instead.
//!
//! # Example
//!
//! ```rust
//! use coursecraft_core::Navigator;
//! use coursecraft_report::{ClientView, MarkdownGenerator};
//!
//! let navigator = Navigator::new();
//! let markdown = MarkdownGenerator::new(&navigator, ClientView::default()).generate();
//! assert!(markdown.contains("# 🚀 AI Learning App"));
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};
use coursecraft_core::{
    Answer, AssessmentPhase, AssessmentScreen, AssessmentSession, CourseData, CourseSummary, Lesson,
    Navigator, ProgressState, QuestionType, Screen, StageStatus, MAX_LESSONS, MIN_LESSONS,
};

use crate::text::{escape_table_cell, paragraphs, pluralize, stage_icon, truncate};

/// Number of key concepts shown on an overview card before "+N more".
const MAX_CARD_CONCEPTS: usize = 3;

/// Maximum length of a stage detail line in the progress table.
const MAX_DETAILS_DISPLAY_LENGTH: usize = 80;

/// Shown in place of a missing lesson title.
pub const TITLE_NOT_AVAILABLE: &str = "Title not available";

/// Shown in place of a missing lesson body.
pub const CONTENT_NOT_AVAILABLE: &str = "Lesson content not available.";

// ============================================================================
// Client View
// ============================================================================

/// State of the course history list as the renderer sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum HistoryView<'a> {
    /// Never requested; nothing is shown.
    #[default]
    Hidden,
    /// Request in flight.
    Loading,
    /// Courses from the server.
    Loaded(&'a [CourseSummary]),
    /// The request failed with this message.
    Failed(&'a str),
}

/// Client-side state that is not part of the navigator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClientView<'a> {
    /// A creation request is in flight.
    pub loading: bool,
    /// Inline error from the last creation attempt.
    pub error: Option<&'a str>,
    /// Latest progress snapshot while progress is tracked.
    pub progress: Option<&'a ProgressState>,
    /// Course history.
    pub history: HistoryView<'a>,
    /// An assessment is being built on the server.
    pub assessment_loading: bool,
    /// One-off message about the last action.
    pub notice: Option<&'a str>,
}

// ============================================================================
// Generator
// ============================================================================

/// Renders the current screen as Markdown.
pub struct MarkdownGenerator<'a> {
    navigator: &'a Navigator,
    view: ClientView<'a>,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a generator for the navigator's current screen.
    #[must_use]
    pub const fn new(navigator: &'a Navigator, view: ClientView<'a>) -> Self {
        Self { navigator, view }
    }

    /// Generates the document for the current screen.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        match self.navigator.screen() {
            Screen::Home => self.write_home(&mut output),
            Screen::CourseOverview => self.write_overview(&mut output),
            Screen::Lesson => self.write_lesson(&mut output),
            Screen::Assessment => self.write_assessment(&mut output),
        }
        self.write_notice(&mut output);

        output
    }

    // ========================================================================
    // Home
    // ========================================================================

    fn write_home(&self, output: &mut String) {
        let _ = writeln!(output, "# 🚀 AI Learning App\n");
        let _ = writeln!(
            output,
            "Create personalized courses on any subject with AI-powered content\n"
        );

        let _ = writeln!(output, "## How deep would you like to go?\n");
        let _ = writeln!(output, "| Lessons | Depth |");
        let _ = writeln!(output, "|---------|-------|");
        for num in MIN_LESSONS..=MAX_LESSONS {
            let _ = writeln!(
                output,
                "| {} | {} |",
                pluralize(usize::from(num), "Lesson"),
                depth_label(num)
            );
        }
        let _ = writeln!(output);

        if let Some(error) = self.view.error {
            let _ = writeln!(output, "**Error:** {error}\n");
        }

        if self.view.loading {
            let _ = writeln!(output, "**Creating Your Course...**\n");
            if self.view.progress.is_none() {
                let _ = writeln!(
                    output,
                    "Our AI agents are researching and creating your personalized course...\n"
                );
            }
        }

        if let Some(progress) = self.view.progress {
            write_progress(output, progress);
        }

        self.write_history(output);
    }

    fn write_history(&self, output: &mut String) {
        match self.view.history {
            HistoryView::Hidden => {}
            HistoryView::Loading => {
                let _ = writeln!(output, "## 📚 Your Previous Courses\n");
                let _ = writeln!(output, "Loading your courses...\n");
            }
            HistoryView::Failed(message) => {
                let _ = writeln!(output, "## Your Previous Courses\n");
                let _ = writeln!(output, "Failed to load existing courses: {message}\n");
            }
            HistoryView::Loaded([]) => {
                let _ = writeln!(output, "## Your Previous Courses\n");
                let _ = writeln!(
                    output,
                    "No previous courses found. Create your first course below!\n"
                );
            }
            HistoryView::Loaded(courses) => {
                let _ = writeln!(output, "## Your Previous Courses\n");
                let _ = writeln!(
                    output,
                    "Continue learning or get inspired for your next course\n"
                );
                let _ = writeln!(output, "| # | Subject | Lessons | Created |");
                let _ = writeln!(output, "|---|---------|---------|---------|");
                for (i, course) in courses.iter().enumerate() {
                    Self::write_history_entry(output, i + 1, course);
                }
                let _ = writeln!(output);
            }
        }
    }

    fn write_history_entry(output: &mut String, number: usize, course: &CourseSummary) {
        let created = course
            .created_at()
            .map_or_else(|| "-".to_string(), |dt| format_date(&dt));
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            number,
            escape_table_cell(&course.subject),
            pluralize(course.lesson_count, "lesson"),
            created
        );
    }

    // ========================================================================
    // Course Overview
    // ========================================================================

    fn write_overview(&self, output: &mut String) {
        let state = self.navigator.state();
        let Some(course) = self.navigator.course() else {
            let _ = writeln!(output, "# Course not available\n");
            return;
        };

        write_course_cards(output, &state.subject, course);
        self.write_assessment_loading(output);
    }

    // ========================================================================
    // Lesson
    // ========================================================================

    fn write_lesson(&self, output: &mut String) {
        let state = self.navigator.state();
        let total = self.navigator.total_lessons();
        let number = state.current_lesson_index + 1;

        let Some(lesson) = self.navigator.current_lesson() else {
            let _ = writeln!(output, "# Lesson not available\n");
            return;
        };

        let _ = writeln!(output, "*Lesson {number} of {total}*\n");
        let _ = writeln!(output, "# {}\n", lesson.title().unwrap_or(TITLE_NOT_AVAILABLE));

        let _ = writeln!(output, "### 🎯 Key Concepts\n");
        if lesson.key_concepts.is_empty() {
            let _ = writeln!(output, "_No key concepts listed._\n");
        } else {
            for concept in &lesson.key_concepts {
                let _ = writeln!(output, "- {concept}");
            }
            let _ = writeln!(output);
        }

        let _ = writeln!(output, "### 📚 Key Terms\n");
        if lesson.key_terms.is_empty() {
            let _ = writeln!(output, "_No key terms listed._\n");
        } else {
            for (term, definition) in &lesson.key_terms {
                let _ = writeln!(output, "- **{term}:** {definition}");
            }
            let _ = writeln!(output);
        }

        let _ = writeln!(output, "### 📖 Lesson Content\n");
        write_lesson_text(output, lesson);

        let _ = writeln!(output, "---\n");
        let _ = writeln!(output, "{number} of {total} lessons completed\n");
        if self.navigator.is_last_lesson() {
            let _ = writeln!(output, "Next: Complete Course & Back to Home\n");
        } else {
            let _ = writeln!(output, "Next: Next Lesson →\n");
        }

        self.write_assessment_loading(output);
    }

    // ========================================================================
    // Assessment
    // ========================================================================

    fn write_assessment(&self, output: &mut String) {
        match self.navigator.assessment() {
            Some(AssessmentScreen::Active(session)) => match session.phase() {
                AssessmentPhase::Answering { index } => {
                    write_question(output, session, index);
                }
                AssessmentPhase::Results { .. } => write_results(output, session),
            },
            Some(AssessmentScreen::Unavailable { reason }) => {
                write_unavailable(output, Some(reason));
            }
            None => write_unavailable(output, None),
        }
    }

    fn write_assessment_loading(&self, output: &mut String) {
        if self.view.assessment_loading {
            let _ = writeln!(output, "_Building your assessment..._\n");
        }
    }

    fn write_notice(&self, output: &mut String) {
        let Some(notice) = self.view.notice else {
            return;
        };
        // The home screen already shows the creation error inline.
        if self.navigator.screen() == Screen::Home && self.view.error == Some(notice) {
            return;
        }
        let _ = writeln!(output, "> {notice}\n");
    }
}

// ============================================================================
// Section Writers
// ============================================================================

/// Renders the progress panel on its own.
#[must_use]
pub fn render_progress(progress: &ProgressState) -> String {
    let mut output = String::new();
    write_progress(&mut output, progress);
    output
}

/// Renders the course overview cards for `course` under `subject`.
#[must_use]
pub fn render_overview(subject: &str, course: &CourseData) -> String {
    let mut output = String::new();
    write_course_cards(&mut output, subject, course);
    output
}

fn write_course_cards(output: &mut String, subject: &str, course: &CourseData) {
    let _ = writeln!(output, "# 📚 {subject}\n");
    let _ = writeln!(
        output,
        "{} Created\n",
        pluralize(course.total_lessons(), "Lesson")
    );
    for (i, (_, lesson)) in course.ordered_lessons().into_iter().enumerate() {
        write_lesson_card(output, i + 1, lesson);
    }
}

fn write_progress(output: &mut String, progress: &ProgressState) {
    let _ = writeln!(output, "## 🤖 AI Agents Creating Your Course\n");
    let _ = writeln!(output, "**{}% Complete**\n", progress.overall_percent());

    if !progress.stages.is_empty() {
        let _ = writeln!(output, "| | Stage | Progress |");
        let _ = writeln!(output, "|---|-------|----------|");
        for stage in &progress.stages {
            let mut cell = format!("**{}**", escape_table_cell(&stage.title));
            if !stage.description.is_empty() {
                let _ = write!(cell, "<br>{}", escape_table_cell(&stage.description));
            }
            if let Some(details) = stage.details() {
                let _ = write!(
                    cell,
                    "<br>_{}_",
                    escape_table_cell(&truncate(details, MAX_DETAILS_DISPLAY_LENGTH))
                );
            }
            let status = if stage.status == StageStatus::Running {
                format!("{}%", stage.percent())
            } else {
                stage.status.to_string()
            };
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                stage_icon(stage.status),
                cell,
                status
            );
        }
        let _ = writeln!(output);
    }

    if progress.current_stage.is_some() {
        let _ = writeln!(
            output,
            "Currently working on: {}\n",
            progress.current_stage_title().unwrap_or("Processing...")
        );
    }
}

fn write_lesson_card(output: &mut String, number: usize, lesson: &Lesson) {
    let _ = writeln!(
        output,
        "## Lesson {}: {}\n",
        number,
        lesson.title().unwrap_or(TITLE_NOT_AVAILABLE)
    );

    if !lesson.key_concepts.is_empty() {
        let shown: Vec<&str> = lesson
            .key_concepts
            .iter()
            .take(MAX_CARD_CONCEPTS)
            .map(String::as_str)
            .collect();
        let _ = write!(output, "**Key Concepts:** {}", shown.join(", "));
        if lesson.key_concepts.len() > MAX_CARD_CONCEPTS {
            let _ = write!(
                output,
                " +{} more",
                lesson.key_concepts.len() - MAX_CARD_CONCEPTS
            );
        }
        let _ = writeln!(output, "\n");
    }
}

fn write_lesson_text(output: &mut String, lesson: &Lesson) {
    let paragraphs = lesson.text().map(paragraphs).unwrap_or_default();
    if paragraphs.is_empty() {
        let _ = writeln!(output, "_{CONTENT_NOT_AVAILABLE}_\n");
        return;
    }
    for paragraph in paragraphs {
        let _ = writeln!(output, "{paragraph}\n");
    }
}

fn write_question(output: &mut String, session: &AssessmentSession, index: usize) {
    let total = session.total_questions();
    let Some(question) = session.current_question() else {
        return;
    };
    let answer = session.answer_for(&question.id);

    let _ = writeln!(output, "# {}\n", session.assessment().title);
    let _ = writeln!(
        output,
        "*Question {} of {} · {}*\n",
        index + 1,
        total,
        question.question_type
    );
    let _ = writeln!(output, "## {}\n", question.question);

    match question.question_type {
        QuestionType::MultipleChoice => {
            for (i, option) in question.options.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "{} {}. {}",
                    selection_mark(answer == Some(Answer::Choice(i))),
                    i + 1,
                    option
                );
            }
        }
        QuestionType::TrueFalse => {
            for (label, value) in [("True", true), ("False", false)] {
                let _ = writeln!(
                    output,
                    "{} {}",
                    selection_mark(answer == Some(Answer::Bool(value))),
                    label
                );
            }
        }
    }
    let _ = writeln!(output);

    let next = if session.is_last_question() {
        "Finish Assessment"
    } else {
        "Next →"
    };
    let _ = writeln!(output, "Next: {next}\n");
}

fn write_results(output: &mut String, session: &AssessmentSession) {
    let Some(outcome) = session.outcome() else {
        return;
    };

    let _ = writeln!(output, "# Assessment Complete!\n");
    let _ = writeln!(output, "**{}/{}** ({}%)\n", outcome.score, outcome.total, outcome.percentage);
    let _ = writeln!(output, "{}\n", outcome.tier.message());

    let _ = writeln!(output, "## Question Review\n");
    for review in session.review() {
        let icon = if review.is_correct { "✅" } else { "❌" };
        let _ = writeln!(output, "### Q{} {} {}\n", review.number, icon, review.question.question);
        let _ = writeln!(output, "- Your answer: {}", review.answer_text());
        if !review.is_correct {
            let _ = writeln!(output, "- Correct answer: {}", review.correct_text());
        }
        if !review.question.explanation.is_empty() {
            let _ = writeln!(output, "- {}", review.question.explanation);
        }
        let _ = writeln!(output);
    }
}

fn write_unavailable(output: &mut String, reason: Option<&str>) {
    let _ = writeln!(output, "# Assessment Not Available\n");
    let _ = writeln!(
        output,
        "There was an issue loading the assessment. Please try generating it again.\n"
    );
    if let Some(reason) = reason {
        let _ = writeln!(output, "_Reason: {reason}_\n");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const fn depth_label(num_lessons: u8) -> &'static str {
    match num_lessons {
        1 => "Quick overview",
        2 => "Moderate depth",
        _ => "Comprehensive",
    }
}

const fn selection_mark(selected: bool) -> &'static str {
    if selected {
        "(x)"
    } else {
        "( )"
    }
}

fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%b %-d, %Y").to_string()
}

// ============================================================================
// Tests
// ============================================================================
