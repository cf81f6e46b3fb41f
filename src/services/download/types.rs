//! Download service types and events.

use std::path::PathBuf;

/// Events emitted while persisting records.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Work started on a record
    Started {
        worker_id: usize,
        url: String,
        court: String,
    },
    /// Body received
    Progress {
        worker_id: usize,
        bytes: u64,
        total: Option<u64>,
    },
    /// File stored and item written
    Completed {
        worker_id: usize,
        url: String,
        path: PathBuf,
    },
    /// Item written without fetching the file
    Recorded { worker_id: usize, url: String },
    /// Fetch or write failed; the item is still recorded
    Failed {
        worker_id: usize,
        url: String,
        error: String,
    },
}

/// Counts for a finished download run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub downloaded: usize,
    pub recorded: usize,
    pub failed: usize,
}

/// Configuration for download service.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub downloads_dir: PathBuf,
    pub workers: usize,
    /// When false records only go to the manifest.
    pub fetch_files: bool,
}
