//! Court models: the unit the crawl is partitioned by.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque portal identifier for a court.
///
/// The catalogue stores ids as text. The portal's query API expects numeric
/// ids as JSON numbers, so [`CourtId::to_json`] emits a number whenever the
/// id is all digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourtId(String);

impl CourtId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON representation used in search conditions.
    pub fn to_json(&self) -> serde_json::Value {
        match self.0.parse::<i64>() {
            Ok(n) if n.to_string() == self.0 => serde_json::Value::from(n),
            _ => serde_json::Value::from(self.0.clone()),
        }
    }
}

impl fmt::Display for CourtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourtId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A court from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtTarget {
    pub id: CourtId,
    pub title: String,
    /// Whether this court should be crawled.
    pub included: bool,
}

impl CourtTarget {
    pub fn new(id: impl Into<String>, title: impl Into<String>, included: bool) -> Self {
        Self {
            id: CourtId::new(id),
            title: title.into(),
            included,
        }
    }

    /// File name of the diagnostic screenshot for this court.
    pub fn screenshot_filename(&self) -> String {
        format!("{}.png", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id_serializes_as_number() {
        let id = CourtId::new("1234");
        assert_eq!(id.to_json(), serde_json::json!(1234));
    }

    #[test]
    fn test_text_id_serializes_as_string() {
        let id = CourtId::new("MSK-12");
        assert_eq!(id.to_json(), serde_json::json!("MSK-12"));
    }

    #[test]
    fn test_zero_padded_id_stays_text() {
        assert_eq!(CourtId::new("007").to_json(), serde_json::json!("007"));
    }

    #[test]
    fn test_id_is_trimmed() {
        assert_eq!(CourtId::new(" 42 ").as_str(), "42");
    }

    #[test]
    fn test_screenshot_filename() {
        let court = CourtTarget::new("77", "Moscow City Court", true);
        assert_eq!(court.screenshot_filename(), "77.png");
    }
}
