//! Generation progress snapshots.
//!
//! The backend reports course generation as a list of stages. Each push
//! message carries a complete [`ProgressState`]; clients replace their copy
//! wholesale rather than merging fields.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// StageStatus
// ============================================================================

/// Status of a single generation stage.
///
/// Stages move forward only:
/// - `Pending` -> `Running` -> `Completed`
/// - `Pending` | `Running` -> `Error`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed.
    Error,
}

impl StageStatus {
    /// Returns `true` for `Completed` and `Error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns `true` if a stage may move from `self` to `next`.
    ///
    /// Staying in the same status is always allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use coursecraft_core::StageStatus;
    ///
    /// assert!(StageStatus::Pending.can_transition_to(StageStatus::Running));
    /// assert!(StageStatus::Running.can_transition_to(StageStatus::Error));
    /// assert!(!StageStatus::Completed.can_transition_to(StageStatus::Running));
    /// ```
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, _)
            | (Self::Running, Self::Running | Self::Completed | Self::Error)
            | (Self::Completed, Self::Completed)
            | (Self::Error, Self::Error) => true,
            (Self::Running, Self::Pending) | (Self::Completed | Self::Error, _) => false,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ============================================================================
// Stage
// ============================================================================

/// One discrete step of the server-side generation pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage identifier (e.g. `curriculum_building`).
    pub id: String,

    /// Short title.
    #[serde(default)]
    pub title: String,

    /// What the stage does.
    #[serde(default)]
    pub description: String,

    /// Current status.
    #[serde(default)]
    pub status: StageStatus,

    /// Percent complete within this stage.
    #[serde(default)]
    pub progress_percent: u32,

    /// Free-form detail line from the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// When the stage started, as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    /// When the stage ended, as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl Stage {
    /// Creates a stage with the given id, title and status.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, status: StageStatus) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status,
            ..Self::default()
        }
    }

    /// Percent complete, clamped to 100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        clamp_percent(self.progress_percent)
    }

    /// Detail line, if present and not blank.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref().filter(|d| !d.trim().is_empty())
    }
}

// ============================================================================
// ProgressState
// ============================================================================

/// A full progress snapshot delivered by one `progress_update` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Stages in pipeline order.
    #[serde(default)]
    pub stages: Vec<Stage>,

    /// Id of the stage currently running, if any.
    #[serde(default)]
    pub current_stage: Option<String>,

    /// Overall progress, nominally 0-100.
    #[serde(default)]
    pub overall_progress: u32,

    /// Server timestamp of the snapshot.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A stage whose status moved backward between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRegression {
    /// The stage id.
    pub stage_id: String,
    /// Status in the earlier snapshot.
    pub from: StageStatus,
    /// Status in the later snapshot.
    pub to: StageStatus,
}

impl ProgressState {
    /// Creates a snapshot from stages, deriving the overall percentage.
    #[must_use]
    pub fn from_stages(stages: Vec<Stage>) -> Self {
        let current_stage = stages
            .iter()
            .find(|s| s.status == StageStatus::Running)
            .map(|s| s.id.clone());
        let overall_progress = if stages.is_empty() {
            0
        } else {
            let total: u32 = stages.iter().map(|s| u32::from(s.percent())).sum();
            let count = u32::try_from(stages.len()).unwrap_or(u32::MAX);
            (total / count).min(100)
        };

        Self {
            stages,
            current_stage,
            overall_progress,
            timestamp: None,
        }
    }

    /// Returns `true` when every stage has completed.
    ///
    /// An empty stage list is never complete; the first snapshot a fresh
    /// connection sees may have no stages at all.
    ///
    /// # Examples
    ///
    /// ```
    /// use coursecraft_core::{ProgressState, Stage, StageStatus};
    ///
    /// assert!(!ProgressState::default().is_complete());
    ///
    /// let done = ProgressState::from_stages(vec![
    ///     Stage::new("a", "A", StageStatus::Completed),
    ///     Stage::new("b", "B", StageStatus::Completed),
    /// ]);
    /// assert!(done.is_complete());
    /// ```
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.stages.is_empty()
            && self
                .stages
                .iter()
                .all(|s| s.status == StageStatus::Completed)
    }

    /// Returns `true` if any stage reported an error.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.stages.iter().any(|s| s.status == StageStatus::Error)
    }

    /// Overall progress, clamped to 100.
    #[must_use]
    pub fn overall_percent(&self) -> u8 {
        clamp_percent(self.overall_progress)
    }

    /// Looks up a stage by id.
    #[must_use]
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Title of the current stage, if the id resolves to a known stage.
    #[must_use]
    pub fn current_stage_title(&self) -> Option<&str> {
        let id = self.current_stage.as_deref()?;
        self.stage(id).map(|s| s.title.as_str())
    }

    /// Stages whose status moved backward relative to `previous`.
    ///
    /// Stages are matched by id; stages missing from either snapshot are
    /// ignored.
    #[must_use]
    pub fn regressions(&self, previous: &Self) -> Vec<StageRegression> {
        self.stages
            .iter()
            .filter_map(|stage| {
                let before = previous.stage(&stage.id)?;
                (!before.status.can_transition_to(stage.status)).then(|| StageRegression {
                    stage_id: stage.id.clone(),
                    from: before.status,
                    to: stage.status,
                })
            })
            .collect()
    }
}

fn clamp_percent(value: u32) -> u8 {
    u8::try_from(value.min(100)).unwrap_or(100)
}

// ============================================================================
// Tests
// ============================================================================
