//! Course data types and the lesson accessor.
//!
//! A course arrives from the backend as a mapping of lesson keys to lessons.
//! The order in which the keys appear in the document is the lesson order;
//! nothing in this module ever sorts by key.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CourseError, Result};

/// Smallest number of lessons a course may be requested with.
pub const MIN_LESSONS: u8 = 1;

/// Largest number of lessons a course may be requested with.
pub const MAX_LESSONS: u8 = 3;

// ============================================================================
// CourseSpec
// ============================================================================

/// A validated request to generate a course.
///
/// Serializes to the `POST /api/create-course` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSpec {
    subject: String,
    num_lessons: u8,
}

impl CourseSpec {
    /// Creates a course spec from raw form input.
    ///
    /// The subject is trimmed before validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use coursecraft_core::CourseSpec;
    ///
    /// let spec = CourseSpec::new("  History  ", 2).unwrap();
    /// assert_eq!(spec.subject(), "History");
    /// assert!(CourseSpec::new("   ", 2).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `CourseError::Validation` when the subject is blank or the
    /// lesson count is outside `1..=3`.
    pub fn new(subject: &str, num_lessons: u8) -> Result<Self> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(CourseError::validation(
                "subject",
                "Please enter a subject to learn about",
            ));
        }
        if !(MIN_LESSONS..=MAX_LESSONS).contains(&num_lessons) {
            return Err(CourseError::validation(
                "numLessons",
                format!("Number of lessons must be between {MIN_LESSONS} and {MAX_LESSONS}"),
            ));
        }

        Ok(Self {
            subject: subject.to_string(),
            num_lessons,
        })
    }

    /// The trimmed subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The requested lesson count.
    #[must_use]
    pub const fn num_lessons(&self) -> u8 {
        self.num_lessons
    }
}

// ============================================================================
// Lesson
// ============================================================================

/// A single generated lesson.
///
/// Every field may be missing in generated data. Missing lists default to
/// empty; a missing title or body is kept as `None` so screens can show an
/// explicit fallback instead of an empty page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Key concepts in presentation order.
    #[serde(default)]
    pub key_concepts: Vec<String>,

    /// Key terms mapped to their definitions, in document order.
    #[serde(default)]
    pub key_terms: IndexMap<String, String>,

    /// Raw lesson text with paragraph breaks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_lesson_text: Option<String>,
}

impl Lesson {
    /// Creates a lesson with a title and body and no concepts or terms.
    #[must_use]
    pub fn new(title: impl Into<String>, main_lesson_text: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            main_lesson_text: Some(main_lesson_text.into()),
            ..Self::default()
        }
    }

    /// Adds a key concept.
    #[must_use]
    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.key_concepts.push(concept.into());
        self
    }

    /// Adds a key term and its definition.
    #[must_use]
    pub fn with_term(mut self, term: impl Into<String>, definition: impl Into<String>) -> Self {
        self.key_terms.insert(term.into(), definition.into());
        self
    }

    /// Returns the title, if present and not blank.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Returns the lesson body, if present and not blank.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.main_lesson_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    /// Names of the expected fields that are missing or empty.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title().is_none() {
            missing.push("title");
        }
        if self.key_concepts.is_empty() {
            missing.push("key_concepts");
        }
        if self.key_terms.is_empty() {
            missing.push("key_terms");
        }
        if self.text().is_none() {
            missing.push("main_lesson_text");
        }
        missing
    }
}

// ============================================================================
// CourseData
// ============================================================================

/// A generated course: lesson keys mapped to lessons.
///
/// Wire shape is `{"course": {"lesson_1": {...}, ...}}`. The mapping keeps
/// document order, which is the authoritative lesson order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseData {
    /// Lessons keyed by lesson key, in definition order.
    #[serde(default)]
    pub course: IndexMap<String, Lesson>,
}

impl CourseData {
    /// Builds course data from `(key, lesson)` pairs, keeping their order.
    pub fn from_lessons<K, I>(lessons: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Lesson)>,
    {
        Self {
            course: lessons.into_iter().map(|(k, l)| (k.into(), l)).collect(),
        }
    }

    /// Returns the lessons in definition order.
    #[must_use]
    pub fn ordered_lessons(&self) -> Vec<(&str, &Lesson)> {
        self.course.iter().map(|(k, l)| (k.as_str(), l)).collect()
    }

    /// Returns the lesson at `index`, or `None` when out of range.
    #[must_use]
    pub fn lesson(&self, index: usize) -> Option<&Lesson> {
        self.course.get_index(index).map(|(_, lesson)| lesson)
    }

    /// Returns the key of the lesson at `index`.
    #[must_use]
    pub fn lesson_key(&self, index: usize) -> Option<&str> {
        self.course.get_index(index).map(|(key, _)| key.as_str())
    }

    /// Number of lessons in the course.
    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.course.len()
    }

    /// Returns `true` if the course has no lessons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.course.is_empty()
    }

    /// Checks that the course can be browsed.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::DataIntegrity` when the course has no lessons.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(CourseError::data_integrity(
                "Course",
                "the course contains no lessons",
            ));
        }
        Ok(())
    }
}

/// Returns the lessons of `course` in definition order.
#[must_use]
pub fn ordered_lessons(course: &CourseData) -> Vec<(&str, &Lesson)> {
    course.ordered_lessons()
}

/// Returns the lesson at `index`, or `None` if no course is loaded or the
/// index is out of range.
#[must_use]
pub fn current_lesson(course: Option<&CourseData>, index: usize) -> Option<&Lesson> {
    course.and_then(|c| c.lesson(index))
}

/// Number of lessons in `course`; 0 when no course is loaded.
#[must_use]
pub fn total_lessons(course: Option<&CourseData>) -> usize {
    course.map_or(0, CourseData::total_lessons)
}

// ============================================================================
// CreatedCourse / CourseSummary
// ============================================================================

/// A course that is ready to be opened in the overview screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCourse {
    /// The request the course was generated for.
    pub spec: CourseSpec,
    /// The generated lessons.
    pub course_data: CourseData,
}

impl CreatedCourse {
    /// Pairs a spec with the course generated for it.
    #[must_use]
    pub const fn new(spec: CourseSpec, course_data: CourseData) -> Self {
        Self { spec, course_data }
    }
}

/// A previously generated course from `GET /api/courses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    /// Server-side identifier.
    pub id: String,

    /// Backend file name, used to build an assessment for the course.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Subject the course covers.
    #[serde(default)]
    pub subject: String,

    /// Number of lessons reported by the server.
    #[serde(default)]
    pub lesson_count: usize,

    /// Creation time in seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<f64>,

    /// The full course.
    #[serde(default)]
    pub course_data: CourseData,
}

impl CourseSummary {
    /// Creation time, if the server reported one.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.created?;
        if !secs.is_finite() {
            return None;
        }
        DateTime::from_timestamp(secs.trunc() as i64, 0)
    }

    /// Lesson count clamped to a valid course size, for restoring `numLessons`.
    #[must_use]
    pub fn num_lessons(&self) -> u8 {
        let count = if self.course_data.is_empty() {
            self.lesson_count
        } else {
            self.course_data.total_lessons()
        };
        u8::try_from(count)
            .unwrap_or(MAX_LESSONS)
            .clamp(MIN_LESSONS, MAX_LESSONS)
    }
}

// ============================================================================
// Tests
// ============================================================================
