//! Crawl error types.

use std::time::Duration;

use thiserror::Error;

use super::dates::DateParseError;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// No session could be established. Nothing else can run.
    #[error("Login failed: {0}")]
    Authentication(String),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Search submission failed: {0}")]
    Submission(String),
    #[error("Result confirmation failed: {0}")]
    Confirmation(String),
    #[error("Export harvest failed: {0}")]
    Harvest(String),
    #[error("No new export link appeared within {0:?}")]
    HarvestTimeout(Duration),
    #[error("Page probe failed: {0}")]
    Probe(String),
    #[error("Unreadable probe page: {0}")]
    ProbeDates(#[from] DateParseError),
    #[error("Record channel closed")]
    RecordSinkClosed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// True for failures that end the whole run rather than one court.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
