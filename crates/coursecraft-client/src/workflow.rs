//! Course creation workflow.
//!
//! Submitting a course starts two independent completions: the creation
//! request (server compute) and the progress run (displayed animation). The
//! course opens only when both have finished, in either order.
//!
//! ```text
//!          submit            response Ok             progress + result
//!   Idle ---------> Requesting ----------> AwaitingProgress ----------> Idle
//!     ^                 |                        |                (course handed off)
//!     |   response Err  |         cancel         |
//!     +-----------------+------------------------+
//! ```

use std::sync::Arc;

use coursecraft_core::{CourseData, CourseSpec, CreatedCourse, ProgressState};
use tracing::{debug, info, warn};

use crate::api::CourseApi;
use crate::error::{ClientError, Result};
use crate::queue::{AppEvent, EventQueue};
use crate::sync::{ProgressSynchronizer, SyncEvent, SyncSignal};

// ============================================================================
// Handoff
// ============================================================================

/// Pending-result slot joining the creation response and progress
/// completion.
///
/// Releases the course exactly once, when both sides have reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handoff {
    result: Option<CreatedCourse>,
    progress_complete: bool,
    delivered: bool,
}

impl Handoff {
    /// Stores the creation result. Returns the course if progress already
    /// completed.
    pub fn store(&mut self, course: CreatedCourse) -> Option<CreatedCourse> {
        if self.delivered {
            debug!("Handoff already delivered; ignoring result");
            return None;
        }
        self.result = Some(course);
        self.release()
    }

    /// Records progress completion. Returns the course if the result is
    /// already stored.
    pub fn mark_progress_complete(&mut self) -> Option<CreatedCourse> {
        self.progress_complete = true;
        self.release()
    }

    /// Returns `true` while a stored result waits for progress.
    #[must_use]
    pub const fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Returns `true` once progress completion was recorded.
    #[must_use]
    pub const fn progress_complete(&self) -> bool {
        self.progress_complete
    }

    /// Empties the slot for a new run.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn release(&mut self) -> Option<CreatedCourse> {
        if !self.progress_complete || self.delivered {
            return None;
        }
        let course = self.result.take()?;
        self.delivered = true;
        Some(course)
    }
}

// ============================================================================
// CreationWorkflow
// ============================================================================

/// Where the current run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPhase {
    /// No run in progress.
    Idle,
    /// The creation request is in flight.
    Requesting,
    /// The course arrived; waiting for progress to finish.
    AwaitingProgress,
}

/// Validates, submits and tracks course creation requests.
#[derive(Debug)]
pub struct CreationWorkflow<A> {
    api: Arc<A>,
    queue: EventQueue,
    sync: ProgressSynchronizer,
    handoff: Handoff,
    run: u64,
    phase: CreationPhase,
    spec: Option<CourseSpec>,
    error: Option<String>,
}

impl<A: CourseApi> CreationWorkflow<A> {
    /// Creates an idle workflow.
    #[must_use]
    pub fn new(api: Arc<A>, queue: EventQueue, sync: ProgressSynchronizer) -> Self {
        Self {
            api,
            queue,
            sync,
            handoff: Handoff::default(),
            run: 0,
            phase: CreationPhase::Idle,
            spec: None,
            error: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> CreationPhase {
        self.phase
    }

    /// Returns `true` while the creation request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == CreationPhase::Requesting
    }

    /// Current run number; 0 before the first submit.
    #[must_use]
    pub const fn run(&self) -> u64 {
        self.run
    }

    /// Inline error from the last submit, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Latest progress snapshot of the current run.
    #[must_use]
    pub const fn progress(&self) -> Option<&ProgressState> {
        self.sync.latest()
    }

    /// Returns `true` while the progress panel should be shown.
    #[must_use]
    pub const fn is_tracking_progress(&self) -> bool {
        self.sync.is_active()
    }

    /// The pending-result slot.
    #[must_use]
    pub const fn handoff(&self) -> &Handoff {
        &self.handoff
    }

    /// Validates the request and starts a new run.
    ///
    /// Opens the progress channel and spawns the creation request, which
    /// posts `AppEvent::CreationFinished` when it returns. A run waiting for
    /// progress is abandoned in favour of the new one.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Busy` while a request is in flight and a
    /// validation error for an empty subject or a lesson count outside 1-3.
    /// Nothing is sent in either case.
    pub fn submit(&mut self, subject: &str, num_lessons: u8) -> Result<u64> {
        if self.is_loading() {
            return Err(ClientError::Busy);
        }

        let spec = match CourseSpec::new(subject, num_lessons) {
            Ok(spec) => spec,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e.into());
            }
        };

        if self.phase == CreationPhase::AwaitingProgress {
            info!(run = self.run, "Abandoning previous course run");
            self.sync.close();
        }

        self.run += 1;
        self.phase = CreationPhase::Requesting;
        self.error = None;
        self.handoff.clear();
        self.spec = Some(spec.clone());
        info!(
            run = self.run,
            subject = spec.subject(),
            lessons = spec.num_lessons(),
            "Submitting course request"
        );

        self.sync.open();

        let api = Arc::clone(&self.api);
        let queue = self.queue.clone();
        let run = self.run;
        tokio::spawn(async move {
            let result = api.create_course(&spec).await;
            queue.post(AppEvent::CreationFinished { run, result });
        });

        Ok(run)
    }

    /// Applies the creation response for `run`.
    ///
    /// Returns the course when progress already completed. Responses for an
    /// older or cancelled run are absorbed.
    pub fn on_creation_finished(
        &mut self,
        run: u64,
        result: Result<CourseData>,
    ) -> Option<CreatedCourse> {
        if run != self.run || self.phase != CreationPhase::Requesting {
            debug!(run, current = self.run, "Absorbing response for a stale run");
            return None;
        }

        match result {
            Ok(course_data) => {
                let spec = self.spec.take()?;
                info!(run, lessons = course_data.total_lessons(), "Course ready; waiting for progress");
                self.phase = CreationPhase::AwaitingProgress;
                let delivered = self.handoff.store(CreatedCourse::new(spec, course_data));
                self.finish_if(delivered)
            }
            Err(e) => {
                warn!(run, error = %e, "Course creation failed");
                self.error = Some(e.user_message());
                self.reset();
                None
            }
        }
    }

    /// Applies progress channel traffic.
    ///
    /// Returns the course when this event completes the handoff.
    pub fn on_progress(&mut self, event: SyncEvent) -> Option<CreatedCourse> {
        match self.sync.handle(event)? {
            SyncSignal::Updated => None,
            SyncSignal::Completed => {
                let delivered = self.handoff.mark_progress_complete();
                self.finish_if(delivered)
            }
        }
    }

    /// Leaves the progress phase.
    ///
    /// Closes the channel and empties the slot; the in-flight response, if
    /// any, is absorbed when it arrives.
    pub fn cancel(&mut self) {
        if self.phase == CreationPhase::Idle && !self.sync.is_active() {
            return;
        }
        info!(run = self.run, "Cancelling course run");
        self.run += 1;
        self.reset();
    }

    /// Clears the inline error.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn finish_if(&mut self, delivered: Option<CreatedCourse>) -> Option<CreatedCourse> {
        let course = delivered?;
        info!(run = self.run, "Course handed off");
        self.reset();
        Some(course)
    }

    fn reset(&mut self) {
        self.sync.close();
        self.handoff.clear();
        self.spec = None;
        self.phase = CreationPhase::Idle;
    }
}

// ============================================================================
// Tests
// ============================================================================
