//! Service layer for caselook business logic.
//!
//! Domain logic separated from UI concerns. The CLI drives these services
//! and renders their events.

pub mod download;

pub use download::{DownloadConfig, DownloadEvent, DownloadResult, DownloadService};
