//! Records handed from the crawl to the persistence pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::CourtId;
use crate::crawl::dates::format_portal_date;

/// A newly discovered export link for one court and date window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    /// Absolute URL of the export file.
    pub file_url: String,
    pub court: CourtId,
    /// Upper bound of the window the export was produced for.
    pub date_upper: NaiveDate,
}

impl DownloadRecord {
    pub fn new(file_url: impl Into<String>, court: CourtId, date_upper: NaiveDate) -> Self {
        Self {
            file_url: file_url.into(),
            court,
            date_upper,
        }
    }

    /// Convert into the persisted item shape, before any file is stored.
    pub fn to_item(&self) -> CaseItem {
        CaseItem {
            court: self.court.clone(),
            date_upper: format_portal_date(self.date_upper),
            file_urls: vec![self.file_url.clone()],
            files: Vec::new(),
        }
    }
}

/// Item written to the manifest, one per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseItem {
    pub court: CourtId,
    /// `YYYYMMDD`.
    pub date_upper: String,
    pub file_urls: Vec<String>,
    #[serde(default)]
    pub files: Vec<StoredFile>,
}

/// A file the pipeline stored for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub url: String,
    pub path: String,
    /// SHA-256 of the content, hex encoded.
    pub checksum: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_shape() {
        let record = DownloadRecord::new(
            "https://caselook.ru/files/export-1.xlsx",
            CourtId::new("15"),
            NaiveDate::from_ymd_opt(2012, 4, 9).unwrap(),
        );
        let json = serde_json::to_value(record.to_item()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "court": "15",
                "date_upper": "20120409",
                "file_urls": ["https://caselook.ru/files/export-1.xlsx"],
                "files": []
            })
        );
    }
}
