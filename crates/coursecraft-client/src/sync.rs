//! Progress synchronizer.
//!
//! Owns one progress channel subscription, keeps the latest snapshot, and
//! signals completion exactly once per lifetime after a display delay.
//!
//! # Sessions
//!
//! Every lifetime (from an `open` on a closed synchronizer until `close`)
//! gets a new session number. The reader task and the completion timer tag
//! everything they post with it, and [`ProgressSynchronizer::handle`] drops
//! events from any other session. Closing therefore suppresses late frames
//! and a pending timer even if they were already queued.
//!
//! ```text
//!            open                    reader ends
//!   Closed ---------> Open ------------------------> Dropped
//!     ^                 |  ^                            |
//!     |      close      |  +----------- open -----------+
//!     +-----------------+-------------- close ----------+
//! ```

use std::sync::Arc;
use std::time::Duration;

use coursecraft_core::ProgressState;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::ProgressTransport;
use crate::queue::EventQueue;

// ============================================================================
// Events
// ============================================================================

/// Progress channel traffic, tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The channel connected.
    Connected {
        /// Producing session.
        session: u64,
    },
    /// A `progress_update` snapshot arrived.
    Snapshot {
        /// Producing session.
        session: u64,
        /// The full snapshot.
        state: ProgressState,
    },
    /// The channel failed or sent a malformed frame.
    ChannelError {
        /// Producing session.
        session: u64,
        /// What went wrong.
        message: String,
    },
    /// The reader task ended.
    Disconnected {
        /// Producing session.
        session: u64,
    },
    /// The completion delay elapsed.
    CompletionDue {
        /// Producing session.
        session: u64,
    },
}

impl SyncEvent {
    /// The session that produced this event.
    #[must_use]
    pub const fn session(&self) -> u64 {
        match self {
            Self::Connected { session }
            | Self::Snapshot { session, .. }
            | Self::ChannelError { session, .. }
            | Self::Disconnected { session }
            | Self::CompletionDue { session } => *session,
        }
    }
}

/// What a handled event means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    /// A new snapshot replaced the previous one.
    Updated,
    /// Progress finished and the display delay elapsed. Fires once per
    /// lifetime.
    Completed,
}

// ============================================================================
// ProgressSynchronizer
// ============================================================================

#[derive(Debug)]
enum Link {
    Closed,
    Open(JoinHandle<()>),
    Dropped,
}

#[derive(Debug)]
enum Completion {
    Idle,
    Scheduled(JoinHandle<()>),
    Fired,
}

/// Tracks server-side generation progress over the push channel.
#[derive(Debug)]
pub struct ProgressSynchronizer {
    transport: Arc<dyn ProgressTransport>,
    queue: EventQueue,
    delay: Duration,
    session: u64,
    link: Link,
    latest: Option<ProgressState>,
    completion: Completion,
}

impl ProgressSynchronizer {
    /// Creates a closed synchronizer.
    #[must_use]
    pub fn new(transport: Arc<dyn ProgressTransport>, queue: EventQueue, delay: Duration) -> Self {
        Self {
            transport,
            queue,
            delay,
            session: 0,
            link: Link::Closed,
            latest: None,
            completion: Completion::Idle,
        }
    }

    /// Current session number; 0 before the first `open`.
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }

    /// Returns `true` between `open` and `close`, including while the
    /// connection is down.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.link, Link::Closed)
    }

    /// Returns `true` while a reader task is running.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.link, Link::Open(_))
    }

    /// Latest snapshot of this lifetime.
    #[must_use]
    pub const fn latest(&self) -> Option<&ProgressState> {
        self.latest.as_ref()
    }

    /// Returns `true` once completion has been signalled in this lifetime.
    #[must_use]
    pub const fn has_completed(&self) -> bool {
        matches!(self.completion, Completion::Fired)
    }

    /// Opens the channel.
    ///
    /// Does nothing while a reader task is already running. On a closed
    /// synchronizer this starts a new lifetime; after the connection dropped
    /// it reconnects within the current one.
    pub fn open(&mut self) {
        match self.link {
            Link::Open(_) => {
                debug!(session = self.session, "Progress channel already open");
                return;
            }
            Link::Closed => {
                self.session += 1;
                self.latest = None;
                self.completion = Completion::Idle;
                info!(session = self.session, "Opening progress channel");
            }
            Link::Dropped => {
                info!(session = self.session, "Reopening progress channel");
            }
        }

        let reader = self.transport.open(self.session, self.queue.clone());
        self.link = Link::Open(reader);
    }

    /// Releases the channel and cancels a pending completion.
    ///
    /// Events already queued for this lifetime are dropped when they arrive.
    pub fn close(&mut self) {
        let link = std::mem::replace(&mut self.link, Link::Closed);
        let completion = std::mem::replace(&mut self.completion, Completion::Idle);

        if matches!(link, Link::Closed) {
            return;
        }
        if let Link::Open(reader) = link {
            reader.abort();
        }
        if let Completion::Scheduled(timer) = completion {
            timer.abort();
        }
        self.latest = None;
        info!(session = self.session, "Closed progress channel");
    }

    /// Applies one event from the queue.
    pub fn handle(&mut self, event: SyncEvent) -> Option<SyncSignal> {
        if event.session() != self.session || !self.is_active() {
            debug!(
                event_session = event.session(),
                session = self.session,
                "Dropping progress event from a closed session"
            );
            return None;
        }

        match event {
            SyncEvent::Connected { session } => {
                debug!(session, "Progress channel ready");
                None
            }
            SyncEvent::Snapshot { state, .. } => Some(self.apply(state)),
            SyncEvent::ChannelError { session, message } => {
                warn!(session, %message, "Progress channel error; progress may stall");
                None
            }
            SyncEvent::Disconnected { session } => {
                if matches!(self.link, Link::Open(_)) {
                    self.link = Link::Dropped;
                }
                info!(session, "Progress channel disconnected");
                None
            }
            SyncEvent::CompletionDue { session } => {
                if matches!(self.completion, Completion::Scheduled(_)) {
                    self.completion = Completion::Fired;
                    info!(session, "Progress complete");
                    Some(SyncSignal::Completed)
                } else {
                    None
                }
            }
        }
    }

    fn apply(&mut self, state: ProgressState) -> SyncSignal {
        if let Some(previous) = &self.latest {
            for regression in state.regressions(previous) {
                warn!(
                    stage = %regression.stage_id,
                    from = %regression.from,
                    to = %regression.to,
                    "Stage status moved backward"
                );
            }
        }

        debug!(
            session = self.session,
            overall = state.overall_percent(),
            current = ?state.current_stage,
            "Progress update"
        );

        let complete = state.is_complete();
        self.latest = Some(state);
        if complete && matches!(self.completion, Completion::Idle) {
            self.schedule_completion();
        }
        SyncSignal::Updated
    }

    fn schedule_completion(&mut self) {
        let queue = self.queue.clone();
        let session = self.session;
        let delay = self.delay;
        debug!(session, delay_ms = delay.as_millis(), "All stages completed");

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.post(SyncEvent::CompletionDue { session });
        });
        self.completion = Completion::Scheduled(timer);
    }
}

impl Drop for ProgressSynchronizer {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================
