//! Date handling for portal search windows.
//!
//! The portal renders document dates as `dd.mm.yyyy` in listings and takes
//! `yyyymmdd` in query conditions. Some listings also return the compact
//! form, so parsing tries the dotted form first and falls back.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

/// Format used in query payloads and item records.
pub const PORTAL_DATE_FORMAT: &str = "%Y%m%d";

/// Format used in result listings.
pub const LISTING_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("Unrecognized document date '{0}'")]
    Unrecognized(String),
    #[error("No documents on the probed page")]
    NoDocuments,
    #[error("Malformed results listing: {0}")]
    MalformedListing(String),
}

/// A document entry from a results listing. Only the date matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct ListedDocument {
    pub date: String,
}

/// Body of a results listing page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsListing {
    #[serde(default)]
    pub documents: Vec<ListedDocument>,
}

/// Parse a listing date, accepting both `dd.mm.yyyy` and `yyyymmdd`.
pub fn parse_document_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, LISTING_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, PORTAL_DATE_FORMAT))
        .map_err(|_| DateParseError::Unrecognized(raw.to_string()))
}

/// Parse a `yyyymmdd` string.
pub fn parse_portal_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(raw.trim(), PORTAL_DATE_FORMAT)
        .map_err(|_| DateParseError::Unrecognized(raw.to_string()))
}

/// Render a date as `yyyymmdd`.
pub fn format_portal_date(date: NaiveDate) -> String {
    date.format(PORTAL_DATE_FORMAT).to_string()
}

/// Earliest date among the listed documents.
///
/// Any unparseable date fails the whole page: a listing we cannot read is
/// treated the same as one that is missing.
pub fn find_earliest_date(documents: &[ListedDocument]) -> Result<NaiveDate, DateParseError> {
    let mut earliest: Option<NaiveDate> = None;
    for doc in documents {
        let date = parse_document_date(&doc.date)?;
        earliest = Some(match earliest {
            Some(current) if current <= date => current,
            _ => date,
        });
    }
    earliest.ok_or(DateParseError::NoDocuments)
}

/// Earliest document date in a raw results listing body.
pub fn earliest_in_listing(body: &str) -> Result<NaiveDate, DateParseError> {
    let listing: ResultsListing =
        serde_json::from_str(body).map_err(|e| DateParseError::MalformedListing(e.to_string()))?;
    find_earliest_date(&listing.documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(dates: &[&str]) -> Vec<ListedDocument> {
        dates
            .iter()
            .map(|d| ListedDocument {
                date: d.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_both_formats_agree() {
        assert_eq!(
            parse_document_date("01.03.2008").unwrap(),
            parse_document_date("20080301").unwrap()
        );
    }

    #[test]
    fn test_find_earliest_date() {
        let earliest = find_earliest_date(&docs(&["02.03.2008", "01.03.2008"])).unwrap();
        assert_eq!(format_portal_date(earliest), "20080301");
    }

    #[test]
    fn test_find_earliest_date_mixed_formats() {
        let earliest = find_earliest_date(&docs(&["15.06.2009", "20090614", "16.06.2009"])).unwrap();
        assert_eq!(format_portal_date(earliest), "20090614");
    }

    #[test]
    fn test_find_earliest_date_empty() {
        assert_eq!(find_earliest_date(&[]), Err(DateParseError::NoDocuments));
    }

    #[test]
    fn test_find_earliest_date_garbage() {
        let err = find_earliest_date(&docs(&["01.03.2008", "yesterday"])).unwrap_err();
        assert_eq!(err, DateParseError::Unrecognized("yesterday".to_string()));
    }

    #[test]
    fn test_earliest_in_listing() {
        let body = r#"{"documents": [{"date": "02.03.2008", "title": "A"}, {"date": "01.03.2008"}], "total": 2}"#;
        let earliest = earliest_in_listing(body).unwrap();
        assert_eq!(format_portal_date(earliest), "20080301");
    }

    #[test]
    fn test_earliest_in_listing_short_page() {
        assert_eq!(earliest_in_listing("{}"), Err(DateParseError::NoDocuments));
        assert!(matches!(
            earliest_in_listing("<html>"),
            Err(DateParseError::MalformedListing(_))
        ));
    }

    #[test]
    fn test_invalid_calendar_date() {
        assert!(parse_document_date("31.02.2010").is_err());
    }

    #[test]
    fn test_portal_date_round_trip() {
        let date = parse_portal_date("20050101").unwrap();
        assert_eq!(format_portal_date(date), "20050101");
    }
}
