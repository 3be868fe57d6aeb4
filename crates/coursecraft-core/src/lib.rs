//! Coursecraft Core
//!
//! Course data model, screen navigation, and assessment scoring. Nothing in
//! this crate performs I/O.

pub mod assessment;
pub mod course;
pub mod error;
pub mod navigator;
pub mod progress;

pub use assessment::{
    percentage, score_answers, Answer, Assessment, AssessmentError, AssessmentOutcome,
    AssessmentPhase, AssessmentSession, Question, QuestionReview, QuestionType, ScoreTier,
};
pub use course::{
    current_lesson, ordered_lessons, total_lessons, CourseData, CourseSpec, CourseSummary,
    CreatedCourse, Lesson, MAX_LESSONS, MIN_LESSONS,
};
pub use error::{CourseError, Result};
pub use navigator::{AssessmentScreen, NavigationState, Navigator, Screen};
pub use progress::{ProgressState, Stage, StageRegression, StageStatus};
