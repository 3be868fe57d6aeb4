//! Assessment model and scoring engine.
//!
//! An [`AssessmentSession`] walks the learner through the questions one at a
//! time and scores the collected answers when the last question is passed.
//!
//! ```text
//! Answering(0) --next--> Answering(1) --next--> ... --next (last)--> Results
//!      ^                                                               |
//!      +----------------------------- restart -------------------------+
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CourseError, Result};

// ============================================================================
// Errors
// ============================================================================

/// Violations of the answering rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AssessmentError {
    /// The assessment has been scored; restart to answer again.
    #[error("assessment is finished; restart to answer again")]
    Finished,

    /// An answer was recorded for a question other than the current one.
    #[error("question '{got}' is not the current question ('{expected}')")]
    NotCurrentQuestion {
        /// Id of the current question.
        expected: String,
        /// Id the answer was recorded for.
        got: String,
    },

    /// A boolean was given for a multiple-choice question or vice versa.
    #[error("answer does not match the type of question '{question_id}'")]
    AnswerKindMismatch {
        /// The question id.
        question_id: String,
    },

    /// A multiple-choice index past the end of the options.
    #[error("option {index} is out of range for question '{question_id}' ({options} options)")]
    OptionOutOfRange {
        /// The question id.
        question_id: String,
        /// The rejected index.
        index: usize,
        /// Number of options available.
        options: usize,
    },

    /// Tried to advance before answering the current question.
    #[error("answer question '{question_id}' before moving on")]
    Unanswered {
        /// The question id.
        question_id: String,
    },
}

// ============================================================================
// Question model
// ============================================================================

/// Kind of question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Pick one option by index.
    MultipleChoice,
    /// True or false.
    TrueFalse,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleChoice => write!(f, "Multiple Choice"),
            Self::TrueFalse => write!(f, "True/False"),
        }
    }
}

/// A learner's answer, or a question's correct answer.
///
/// Serialized untagged: an option index is a JSON number, a true/false
/// answer is a JSON boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// True/false answer.
    Bool(bool),
    /// Zero-based option index.
    Choice(usize),
}

impl Answer {
    /// Returns `true` if this answer has the right shape for `question_type`.
    #[must_use]
    pub const fn fits(self, question_type: QuestionType) -> bool {
        matches!(
            (self, question_type),
            (Self::Bool(_), QuestionType::TrueFalse) | (Self::Choice(_), QuestionType::MultipleChoice)
        )
    }
}

/// A single assessment question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question id, unique within the assessment. Numeric ids are accepted
    /// and stored as strings.
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    /// Kind of question.
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// The prompt.
    #[serde(default)]
    pub question: String,

    /// Options for multiple-choice questions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// The correct answer.
    pub correct_answer: Answer,

    /// Why the correct answer is correct.
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// Creates a multiple-choice question.
    #[must_use]
    pub fn multiple_choice(
        id: impl Into<String>,
        question: impl Into<String>,
        options: Vec<String>,
        correct: usize,
    ) -> Self {
        Self {
            id: id.into(),
            question_type: QuestionType::MultipleChoice,
            question: question.into(),
            options,
            correct_answer: Answer::Choice(correct),
            explanation: String::new(),
        }
    }

    /// Creates a true/false question.
    #[must_use]
    pub fn true_false(id: impl Into<String>, question: impl Into<String>, correct: bool) -> Self {
        Self {
            id: id.into(),
            question_type: QuestionType::TrueFalse,
            question: question.into(),
            options: Vec::new(),
            correct_answer: Answer::Bool(correct),
            explanation: String::new(),
        }
    }

    /// Sets the explanation.
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Returns `true` if `answer` equals the correct answer.
    #[must_use]
    pub fn is_correct(&self, answer: Answer) -> bool {
        answer == self.correct_answer
    }

    /// Human-readable text for an answer to this question.
    ///
    /// Out-of-range option indexes render as "Not answered".
    #[must_use]
    pub fn answer_text(&self, answer: Option<Answer>) -> String {
        match answer {
            Some(Answer::Bool(true)) => "True".to_string(),
            Some(Answer::Bool(false)) => "False".to_string(),
            Some(Answer::Choice(i)) => self
                .options
                .get(i)
                .cloned()
                .unwrap_or_else(|| "Not answered".to_string()),
            None => "Not answered".to_string(),
        }
    }

    /// Checks that an answer could be recorded for this question.
    fn check_answer(&self, answer: Answer) -> std::result::Result<(), AssessmentError> {
        if !answer.fits(self.question_type) {
            return Err(AssessmentError::AnswerKindMismatch {
                question_id: self.id.clone(),
            });
        }
        if let Answer::Choice(index) = answer {
            if index >= self.options.len() {
                return Err(AssessmentError::OptionOutOfRange {
                    question_id: self.id.clone(),
                    index,
                    options: self.options.len(),
                });
            }
        }
        Ok(())
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(n) => n.to_string(),
    })
}

// ============================================================================
// Assessment
// ============================================================================

/// A scored quiz over a course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Assessment title.
    #[serde(default)]
    pub title: String,

    /// Questions in presentation order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Assessment {
    /// Creates an assessment from a title and questions.
    #[must_use]
    pub fn new(title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            title: title.into(),
            questions,
        }
    }

    /// Parses an assessment payload.
    ///
    /// Accepts either the backend wrapper `{"assessment": {...}}` or a bare
    /// assessment object, and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::DataIntegrity` if the payload is malformed or
    /// fails [`Assessment::validate`].
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let inner = match value {
            serde_json::Value::Object(mut map) if map.contains_key("assessment") => map
                .remove("assessment")
                .unwrap_or(serde_json::Value::Null),
            other => other,
        };
        if !inner.is_object() {
            return Err(CourseError::data_integrity(
                "Assessment",
                "the assessment payload is missing",
            ));
        }

        let assessment: Self = serde_json::from_value(inner)
            .map_err(|e| CourseError::data_integrity("Assessment", e.to_string()))?;
        assessment.validate()?;
        Ok(assessment)
    }

    /// Checks that every question can be answered and scored.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::DataIntegrity` when there are no questions, ids
    /// repeat, or a correct answer does not fit its question.
    pub fn validate(&self) -> Result<()> {
        if self.questions.is_empty() {
            return Err(CourseError::data_integrity(
                "Assessment",
                "the assessment has no questions",
            ));
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(CourseError::data_integrity(
                    "Assessment",
                    format!("question id '{}' appears more than once", question.id),
                ));
            }
            if question.question_type == QuestionType::MultipleChoice && question.options.is_empty()
            {
                return Err(CourseError::data_integrity(
                    "Assessment",
                    format!("question '{}' has no options", question.id),
                ));
            }
            question
                .check_answer(question.correct_answer)
                .map_err(|e| CourseError::data_integrity("Assessment", e.to_string()))?;
        }
        Ok(())
    }

    /// Number of questions.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Counts the questions whose stored answer equals the correct answer.
#[must_use]
pub fn score_answers(assessment: &Assessment, answers: &HashMap<String, Answer>) -> usize {
    assessment
        .questions
        .iter()
        .filter(|q| answers.get(&q.id).is_some_and(|a| q.is_correct(*a)))
        .count()
}

/// `round(score / total * 100)`, rounding halves up. Returns 0 when `total`
/// is 0.
///
/// # Examples
///
/// ```
/// use coursecraft_core::assessment::percentage;
///
/// assert_eq!(percentage(1, 2), 50);
/// assert_eq!(percentage(2, 3), 67);
/// assert_eq!(percentage(1, 8), 13);
/// ```
#[must_use]
pub fn percentage(score: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = (score.min(total) * 200 + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Feedback band for a score, chosen from the highest threshold down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    /// 90% and above.
    Mastered,
    /// 80% and above.
    Strong,
    /// 70% and above.
    Good,
    /// 60% and above.
    Review,
    /// Below 60%.
    KeepStudying,
}

impl ScoreTier {
    /// Picks the tier for a percentage (inclusive lower bounds).
    #[must_use]
    pub const fn from_percentage(percentage: u8) -> Self {
        match percentage {
            90.. => Self::Mastered,
            80..=89 => Self::Strong,
            70..=79 => Self::Good,
            60..=69 => Self::Review,
            _ => Self::KeepStudying,
        }
    }

    /// Feedback message shown on the results screen.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Mastered => "Excellent work! You've mastered this material.",
            Self::Strong => "Great job! You have a strong understanding.",
            Self::Good => "Good work! You understand most concepts.",
            Self::Review => "Not bad! Consider reviewing some topics.",
            Self::KeepStudying => "Keep studying! Review the lessons and try again.",
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mastered => write!(f, "mastered"),
            Self::Strong => write!(f, "strong"),
            Self::Good => write!(f, "good"),
            Self::Review => write!(f, "review"),
            Self::KeepStudying => write!(f, "keep studying"),
        }
    }
}

/// Final result of an assessment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentOutcome {
    /// Number of correct answers.
    pub score: usize,
    /// Number of questions.
    pub total: usize,
    /// Rounded percentage.
    pub percentage: u8,
    /// Feedback band.
    pub tier: ScoreTier,
}

impl AssessmentOutcome {
    /// Builds the outcome for `score` correct answers out of `total`.
    #[must_use]
    pub fn new(score: usize, total: usize) -> Self {
        let percentage = percentage(score, total);
        Self {
            score,
            total,
            percentage,
            tier: ScoreTier::from_percentage(percentage),
        }
    }
}

/// Per-question line of the results review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview<'a> {
    /// 1-based question number.
    pub number: usize,
    /// The question.
    pub question: &'a Question,
    /// What the learner answered, if anything.
    pub answer: Option<Answer>,
    /// Whether the answer was correct.
    pub is_correct: bool,
}

impl QuestionReview<'_> {
    /// Text of the learner's answer.
    #[must_use]
    pub fn answer_text(&self) -> String {
        self.question.answer_text(self.answer)
    }

    /// Text of the correct answer.
    #[must_use]
    pub fn correct_text(&self) -> String {
        self.question.answer_text(Some(self.question.correct_answer))
    }
}

// ============================================================================
// AssessmentSession
// ============================================================================

/// Where the learner is in an assessment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentPhase {
    /// Answering the question at `index`.
    Answering {
        /// Zero-based question index.
        index: usize,
    },
    /// All questions passed; the attempt has been scored.
    Results {
        /// Number of correct answers.
        score: usize,
    },
}

/// One attempt at an assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentSession {
    assessment: Assessment,
    answers: HashMap<String, Answer>,
    phase: AssessmentPhase,
}

impl AssessmentSession {
    /// Starts an attempt at `Answering(0)` with no answers.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::DataIntegrity` if the assessment fails
    /// validation.
    pub fn new(assessment: Assessment) -> Result<Self> {
        assessment.validate()?;
        Ok(Self {
            assessment,
            answers: HashMap::new(),
            phase: AssessmentPhase::Answering { index: 0 },
        })
    }

    /// The assessment being taken.
    #[must_use]
    pub const fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> AssessmentPhase {
        self.phase
    }

    /// Number of questions.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.assessment.total_questions()
    }

    /// Index of the current question while answering.
    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        match self.phase {
            AssessmentPhase::Answering { index } => Some(index),
            AssessmentPhase::Results { .. } => None,
        }
    }

    /// The current question while answering.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index()
            .and_then(|i| self.assessment.questions.get(i))
    }

    /// Returns `true` when the current question is the last one.
    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_index()
            .is_some_and(|i| i + 1 == self.total_questions())
    }

    /// The stored answer for a question.
    #[must_use]
    pub fn answer_for(&self, question_id: &str) -> Option<Answer> {
        self.answers.get(question_id).copied()
    }

    /// All answers recorded so far.
    #[must_use]
    pub const fn answers(&self) -> &HashMap<String, Answer> {
        &self.answers
    }

    /// Returns `true` if the current question has an answer.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.current_question()
            .is_some_and(|q| self.answers.contains_key(&q.id))
    }

    /// Stores or overwrites the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns an `AssessmentError` if the attempt is finished, the id is not
    /// the current question, or the answer does not fit the question.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        answer: Answer,
    ) -> std::result::Result<(), AssessmentError> {
        let question = self.current_question().ok_or(AssessmentError::Finished)?;
        if question.id != question_id {
            return Err(AssessmentError::NotCurrentQuestion {
                expected: question.id.clone(),
                got: question_id.to_string(),
            });
        }
        question.check_answer(answer)?;

        self.answers.insert(question_id.to_string(), answer);
        Ok(())
    }

    /// Records an answer for whichever question is current.
    ///
    /// # Errors
    ///
    /// Same as [`AssessmentSession::record_answer`].
    pub fn answer_current(&mut self, answer: Answer) -> std::result::Result<(), AssessmentError> {
        let id = self
            .current_question()
            .map(|q| q.id.clone())
            .ok_or(AssessmentError::Finished)?;
        self.record_answer(&id, answer)
    }

    /// Moves to the next question, or scores the attempt on the last one.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Unanswered` if the current question has no
    /// answer, or `AssessmentError::Finished` in the results phase.
    pub fn next(&mut self) -> std::result::Result<AssessmentPhase, AssessmentError> {
        let AssessmentPhase::Answering { index } = self.phase else {
            return Err(AssessmentError::Finished);
        };
        if !self.can_advance() {
            let question_id = self
                .current_question()
                .map(|q| q.id.clone())
                .unwrap_or_default();
            return Err(AssessmentError::Unanswered { question_id });
        }

        self.phase = if index + 1 < self.total_questions() {
            AssessmentPhase::Answering { index: index + 1 }
        } else {
            AssessmentPhase::Results {
                score: score_answers(&self.assessment, &self.answers),
            }
        };
        Ok(self.phase)
    }

    /// Moves back one question. Returns `false` at the first question or in
    /// the results phase.
    pub fn previous(&mut self) -> bool {
        match self.phase {
            AssessmentPhase::Answering { index } if index > 0 => {
                self.phase = AssessmentPhase::Answering { index: index - 1 };
                true
            }
            _ => false,
        }
    }

    /// Clears all answers and returns to the first question.
    pub fn restart(&mut self) {
        self.answers.clear();
        self.phase = AssessmentPhase::Answering { index: 0 };
    }

    /// Score of the attempt; 0 until the results phase.
    #[must_use]
    pub const fn score(&self) -> usize {
        match self.phase {
            AssessmentPhase::Results { score } => score,
            AssessmentPhase::Answering { .. } => 0,
        }
    }

    /// Outcome of the attempt once scored.
    #[must_use]
    pub fn outcome(&self) -> Option<AssessmentOutcome> {
        match self.phase {
            AssessmentPhase::Results { score } => {
                Some(AssessmentOutcome::new(score, self.total_questions()))
            }
            AssessmentPhase::Answering { .. } => None,
        }
    }

    /// Per-question review lines in question order.
    #[must_use]
    pub fn review(&self) -> Vec<QuestionReview<'_>> {
        self.assessment
            .questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let answer = self.answer_for(&question.id);
                QuestionReview {
                    number: i + 1,
                    question,
                    answer,
                    is_correct: answer.is_some_and(|a| question.is_correct(a)),
                }
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
