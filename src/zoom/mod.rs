//! Zoom cloud recordings: meeting listing, transcript and summary downloads.

pub mod client;
pub mod models;

pub use client::ZoomClient;
pub use models::{recording_type, Meeting, RecordingFile, SummaryItem, ZoomSummary};
