//! Data models for caselook.

mod court;
mod record;

pub use court::{CourtId, CourtTarget};
pub use record::{CaseItem, DownloadRecord, StoredFile};
