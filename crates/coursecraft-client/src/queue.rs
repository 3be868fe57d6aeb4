//! The app's single event queue.
//!
//! User actions, HTTP completions and progress-channel traffic are all posted
//! here and applied one at a time by [`crate::app::App`], so handlers never
//! run concurrently with each other.

use coursecraft_core::{Assessment, CourseData, CourseSummary};
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::Action;
use crate::error::Result;
use crate::sync::SyncEvent;

/// Everything that can happen to the app.
#[derive(Debug)]
pub enum AppEvent {
    /// A user action.
    Action(Action),

    /// Progress channel traffic or the completion timer.
    Sync(SyncEvent),

    /// The creation request for `run` returned.
    CreationFinished {
        /// Workflow run the request belongs to.
        run: u64,
        /// Generated course or the failure.
        result: Result<CourseData>,
    },

    /// The course history request returned.
    HistoryLoaded(Result<Vec<CourseSummary>>),

    /// The assessment request for `request` returned.
    AssessmentLoaded {
        /// Request counter value when the request was issued.
        request: u64,
        /// Assessment or the failure.
        result: Result<Assessment>,
    },
}

impl From<SyncEvent> for AppEvent {
    fn from(event: SyncEvent) -> Self {
        Self::Sync(event)
    }
}

impl From<Action> for AppEvent {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

/// Sending half of the event queue. Cheap to clone into spawned tasks.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: mpsc::UnboundedSender<AppEvent>,
}

impl EventQueue {
    /// Creates a queue and the receiver the app drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Posts an event. Returns `false` once the app has shut down.
    pub fn post(&self, event: impl Into<AppEvent>) -> bool {
        let delivered = self.sender.send(event.into()).is_ok();
        if !delivered {
            debug!("Event queue closed; dropping event");
        }
        delivered
    }

    /// Returns `true` once the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
