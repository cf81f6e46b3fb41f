//! Court catalogue loading.
//!
//! The catalogue is a CSV file with `Code`, `Title` and `Include` columns,
//! one row per court. `Include` accepts the usual spreadsheet spellings of a
//! boolean (`True`/`False`, `1`/`0`, `yes`/`no`).

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::models::{CourtId, CourtTarget};

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Failed to open court catalogue {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Invalid catalogue row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("Court catalogue is empty")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CatalogueRow {
    #[serde(rename = "Code", alias = "code")]
    code: String,
    #[serde(rename = "Title", alias = "title")]
    title: String,
    #[serde(rename = "Include", alias = "include", deserialize_with = "deserialize_flag")]
    include: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid include flag '{}'", raw)))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" | "y" => Some(true),
        "false" | "0" | "0.0" | "no" | "n" | "" => Some(false),
        _ => None,
    }
}

/// Load the court catalogue from a CSV file.
pub fn load_catalogue(path: &Path) -> Result<Vec<CourtTarget>, CatalogueError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CatalogueError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    read_rows(reader)
}

/// Load the court catalogue from CSV text already in memory.
pub fn read_catalogue<R: Read>(input: R) -> Result<Vec<CourtTarget>, CatalogueError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    read_rows(reader)
}

fn read_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<CourtTarget>, CatalogueError> {
    let mut courts = Vec::new();
    for (index, row) in reader.deserialize::<CatalogueRow>().enumerate() {
        // +2: one for the header, one for 1-based numbering
        let row = row.map_err(|source| CatalogueError::Row {
            row: index + 2,
            source,
        })?;
        courts.push(CourtTarget {
            id: CourtId::new(row.code),
            title: row.title,
            included: row.include,
        });
    }

    if courts.is_empty() {
        return Err(CatalogueError::Empty);
    }

    tracing::debug!(
        "Loaded {} courts ({} included)",
        courts.len(),
        courts.iter().filter(|c| c.included).count()
    );
    Ok(courts)
}
