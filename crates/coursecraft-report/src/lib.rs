//! Coursecraft Report
//!
//! Renders the client screens as Markdown for the terminal front end.
//!
//! # Overview
//!
//! - [`MarkdownGenerator`] renders whichever screen the navigator shows
//! - [`render_progress`] and [`render_overview`] render single panels
//! - [`paragraphs`] is the lesson-body paragraph splitter

pub mod markdown;
pub mod text;

pub use markdown::{
    render_overview, render_progress, ClientView, HistoryView, MarkdownGenerator,
    CONTENT_NOT_AVAILABLE, TITLE_NOT_AVAILABLE,
};
pub use text::{escape_table_cell, paragraphs, pluralize, stage_icon, truncate};
