//! Coursecraft Client
//!
//! Talks to the course backend over HTTP, follows generation progress over a
//! WebSocket push channel, and drives the screens from a single event queue.

pub mod api;
pub mod app;
pub mod channel;
pub mod config;
pub mod error;
pub mod queue;
pub mod sync;
pub mod workflow;

pub use api::{
    assessment_from_response, course_from_response, BuildAssessmentRequest,
    BuildAssessmentResponse, CourseApi, CoursesResponse, CreateCourseRequest,
    CreateCourseResponse, ErrorResponse, HttpCourseApi,
};
pub use app::{Action, App, History, NO_SAVED_COURSE};
pub use channel::{
    decode_frame, ChannelEvent, Frame, ProgressTransport, WebSocketTransport, CONNECT_PACKET,
    ENGINE_IO_QUERY, PONG_PACKET, PROGRESS_EVENT,
};
pub use config::{Config, CONFIG_FILE_NAME};
pub use error::{ClientError, Result};
pub use queue::{AppEvent, EventQueue};
pub use sync::{ProgressSynchronizer, SyncEvent, SyncSignal};
pub use workflow::{CreationPhase, CreationWorkflow, Handoff};
