//! Search query payloads and responses.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::dates::format_portal_date;
use super::window::CrawlWindow;

/// Condition ids the portal uses to tag each filter of a query.
pub const DOCUMENT_TYPE_CONDITION: &str = "6749aae1-2863-4741-8ccf-1f82149be53e";
pub const COURT_CONDITION: &str = "d81b48d4-ba5d-4de7-84fd-94140af0bc80";
pub const DATE_CONDITION: &str = "358bd74c-5c24-40bb-b936-9f82bcecf5c2";
pub const CASE_TYPE_CONDITION: &str = "bf6a1c48-7ce2-49e4-ba73-fc1768a8a4b9";

/// Fixed parts of every search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilters {
    /// Lower bound of every date range.
    pub epoch: NaiveDate,
    pub document_type_id: u32,
    pub case_type_id: u32,
}

/// Opaque portal identifier for a submitted search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchHandle(String);

impl SearchHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
struct Condition {
    id: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    contains: Option<bool>,
    #[serde(rename = "type")]
    kind: &'static str,
    data: Value,
}

/// Build the query document for one court window.
pub fn build_search_payload(window: &CrawlWindow, filters: &QueryFilters) -> Value {
    let conditions = vec![
        Condition {
            id: DOCUMENT_TYPE_CONDITION,
            contains: Some(true),
            kind: "document_type",
            data: json!({ "id": filters.document_type_id }),
        },
        Condition {
            id: COURT_CONDITION,
            contains: Some(true),
            kind: "court",
            data: json!({
                "id": window.court.id.to_json(),
                "title": window.court.title,
            }),
        },
        Condition {
            id: DATE_CONDITION,
            contains: None,
            kind: "date",
            data: json!({
                "scope": "range",
                "value": [format_portal_date(filters.epoch), window.date_upper_string()],
            }),
        },
        Condition {
            id: CASE_TYPE_CONDITION,
            contains: Some(true),
            kind: "case_type",
            data: json!({ "id": filters.case_type_id }),
        },
    ];

    json!({ "conditions": conditions })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    search_id: Value,
}

/// Extract the search handle from a search response body.
pub fn parse_search_response(body: &str) -> Result<SearchHandle, String> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| format!("Malformed search response: {}", e))?;

    match response.search_id {
        Value::String(s) if !s.trim().is_empty() => Ok(SearchHandle::new(s.trim())),
        Value::Number(n) => Ok(SearchHandle::new(n.to_string())),
        other => Err(format!("Unusable search_id in response: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourtTarget;

    fn filters() -> QueryFilters {
        QueryFilters {
            epoch: NaiveDate::from_ymd_opt(2005, 1, 1).unwrap(),
            document_type_id: 150,
            case_type_id: 3,
        }
    }

    #[test]
    fn test_payload_shape() {
        let window = CrawlWindow::new(
            CourtTarget::new("120", "Ninth Appeal Court", true),
            NaiveDate::from_ymd_opt(2019, 11, 5).unwrap(),
        );
        let payload = build_search_payload(&window, &filters());
        let conditions = payload["conditions"].as_array().unwrap();

        assert_eq!(conditions.len(), 4);
        assert_eq!(conditions[0]["type"], "document_type");
        assert_eq!(conditions[0]["data"]["id"], 150);
        assert_eq!(conditions[1]["id"], COURT_CONDITION);
        assert_eq!(conditions[1]["data"]["id"], 120);
        assert_eq!(conditions[1]["data"]["title"], "Ninth Appeal Court");
        assert_eq!(
            conditions[2]["data"],
            json!({"scope": "range", "value": ["20050101", "20191105"]})
        );
        assert!(conditions[2].get("contains").is_none());
        assert_eq!(conditions[3]["contains"], true);
        assert_eq!(conditions[3]["data"]["id"], 3);
    }

    #[test]
    fn test_parse_string_search_id() {
        let handle = parse_search_response(r#"{"search_id": "a1b2"}"#).unwrap();
        assert_eq!(handle.as_str(), "a1b2");
    }

    #[test]
    fn test_parse_numeric_search_id() {
        let handle = parse_search_response(r#"{"search_id": 991, "total": 12}"#).unwrap();
        assert_eq!(handle.as_str(), "991");
    }

    #[test]
    fn test_missing_search_id() {
        assert!(parse_search_response(r#"{"error": "unauthorized"}"#).is_err());
    }

    #[test]
    fn test_null_search_id() {
        assert!(parse_search_response(r#"{"search_id": null}"#).is_err());
    }

    #[test]
    fn test_html_body() {
        assert!(parse_search_response("<html>login</html>").is_err());
    }
}
