//! HTTP client for the course backend.
//!
//! [`CourseApi`] is the seam the workflow and the app driver talk to;
//! [`HttpCourseApi`] implements it over `reqwest`.
//!
//! # Endpoints
//!
//! - `GET /api/courses` - Previously generated courses
//! - `POST /api/create-course` - Generate a course (slow)
//! - `POST /api/build-assessment` - Generate an assessment for a saved course
//! - `GET /api/progress` - One-shot progress snapshot

use std::future::Future;

use coursecraft_core::{Assessment, CourseData, CourseSpec, CourseSummary, ProgressState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ClientError, Result};

// ============================================================================
// Wire Types
// ============================================================================

/// Body of `POST /api/create-course`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest<'a> {
    /// Trimmed subject.
    pub subject: &'a str,
    /// Lesson count (1-3).
    pub num_lessons: u8,
}

/// Response of `POST /api/create-course`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCourseResponse {
    /// Set when the course was generated.
    #[serde(default)]
    pub success: bool,
    /// The generated course.
    #[serde(default)]
    pub course_data: Option<CourseData>,
}

/// Response of `GET /api/courses`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoursesResponse {
    /// Saved courses, newest first.
    #[serde(default)]
    pub courses: Vec<CourseSummary>,
}

/// Body of `POST /api/build-assessment`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildAssessmentRequest<'a> {
    /// Backend file name of the course.
    pub course_filename: &'a str,
}

/// Response of `POST /api/build-assessment`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildAssessmentResponse {
    /// Set when the assessment was generated.
    #[serde(default)]
    pub success: bool,
    /// `{"assessment": {...}}` as produced by the backend.
    #[serde(default)]
    pub assessment_data: Option<serde_json::Value>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error.
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// CourseApi
// ============================================================================

/// Operations the client needs from the course backend.
///
/// Futures are `Send` so requests can run on spawned tasks while the app
/// keeps handling input.
pub trait CourseApi: Send + Sync + 'static {
    /// Generates a course. May take many minutes.
    fn create_course(&self, spec: &CourseSpec) -> impl Future<Output = Result<CourseData>> + Send;

    /// Lists previously generated courses.
    fn list_courses(&self) -> impl Future<Output = Result<Vec<CourseSummary>>> + Send;

    /// Generates an assessment for a saved course.
    fn build_assessment(
        &self,
        course_filename: &str,
    ) -> impl Future<Output = Result<Assessment>> + Send;

    /// Fetches the current progress snapshot.
    fn fetch_progress(&self) -> impl Future<Output = Result<ProgressState>> + Send;
}

/// Turns a create-course response into course data.
///
/// # Errors
///
/// Returns "Invalid response from server" unless `success` is set and
/// `course_data` is present, even when a 2xx body carries an `error` field,
/// and `DataIntegrity` for an empty course.
pub fn course_from_response(response: CreateCourseResponse) -> Result<CourseData> {
    match response {
        CreateCourseResponse {
            success: true,
            course_data: Some(course),
            ..
        } => {
            course.validate()?;
            Ok(course)
        }
        _ => Err(ClientError::invalid_response()),
    }
}

/// Turns a build-assessment response into a validated assessment.
///
/// # Errors
///
/// Returns "Invalid response from server" when the payload is missing and
/// `DataIntegrity` when it does not describe a usable assessment.
pub fn assessment_from_response(response: BuildAssessmentResponse) -> Result<Assessment> {
    match response {
        BuildAssessmentResponse {
            success: true,
            assessment_data: Some(data),
        } => Ok(Assessment::from_value(data)?),
        _ => Err(ClientError::invalid_response()),
    }
}

// ============================================================================
// HttpCourseApi
// ============================================================================

/// [`CourseApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCourseApi {
    client: reqwest::Client,
    config: Config,
}

impl HttpCourseApi {
    /// Builds a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NetworkError` if the HTTP client cannot be
    /// constructed.
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ClientError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    fn send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                timeout_secs: self.config.request_timeout_secs,
            }
        } else {
            e.into()
        }
    }

    /// Reads a JSON body, mapping non-2xx statuses to `ServerError`.
    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.send_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| fallback.to_string());
            debug!(status = status.as_u16(), %message, "Backend returned an error");
            return Err(ClientError::server(Some(status.as_u16()), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            debug!(error = %e, "Undecodable response body");
            ClientError::invalid_response()
        })
    }
}

impl CourseApi for HttpCourseApi {
    async fn create_course(&self, spec: &CourseSpec) -> Result<CourseData> {
        let url = self.config.api_url("/api/create-course");
        info!(subject = spec.subject(), lessons = spec.num_lessons(), "Requesting course");

        let body = CreateCourseRequest {
            subject: spec.subject(),
            num_lessons: spec.num_lessons(),
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let parsed: CreateCourseResponse = self.read_json(response, "Failed to create course").await?;

        let course = course_from_response(parsed)?;
        info!(lessons = course.total_lessons(), "Course created");
        Ok(course)
    }

    async fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        let url = self.config.api_url("/api/courses");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let parsed: CoursesResponse = self.read_json(response, "Failed to fetch courses").await?;
        debug!(count = parsed.courses.len(), "Fetched course history");
        Ok(parsed.courses)
    }

    async fn build_assessment(&self, course_filename: &str) -> Result<Assessment> {
        let url = self.config.api_url("/api/build-assessment");
        info!(course = course_filename, "Requesting assessment");

        let response = self
            .client
            .post(&url)
            .json(&BuildAssessmentRequest { course_filename })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let parsed: BuildAssessmentResponse = self
            .read_json(response, "Failed to build assessment")
            .await?;
        assessment_from_response(parsed)
    }

    async fn fetch_progress(&self) -> Result<ProgressState> {
        let url = self.config.api_url("/api/progress");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.read_json(response, "Failed to fetch progress").await
    }
}

// ============================================================================
// Tests
// ============================================================================
