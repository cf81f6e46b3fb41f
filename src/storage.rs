//! Storage helpers for exported files and the item manifest on disk.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::CaseItem;

/// Name of the JSON lines manifest inside the downloads directory.
pub const MANIFEST_FILE: &str = "items.jsonl";

/// SHA-256 of `content`, hex encoded.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Make a string safe to use as a single path component.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim().trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.chars().take(100).collect()
    }
}

/// Construct the storage path for one exported file.
///
/// Files are grouped per court: `{downloads_dir}/{court}/{date_upper}-{hash[0..8]}.{extension}`
pub fn content_storage_path(
    downloads_dir: &Path,
    court: &str,
    date_upper: &str,
    content_hash: &str,
    extension: &str,
) -> PathBuf {
    let short = &content_hash[..content_hash.len().min(8)];
    downloads_dir
        .join(sanitize_filename(court))
        .join(format!("{}-{}.{}", date_upper, short, extension))
}

/// Map MIME type to file extension.
pub fn mime_to_extension(mime: &str) -> &'static str {
    let mime = mime.split(';').next().unwrap_or(mime).trim();
    match mime {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/vnd.ms-excel" => "xls",
        "text/csv" => "csv",
        "application/zip" => "zip",
        "application/pdf" => "pdf",
        "application/json" => "json",
        "text/html" => "html",
        _ => "bin",
    }
}

/// Pick a file extension from the server filename, the URL path, or the
/// MIME type, in that order.
pub fn file_extension(url: &str, filename: Option<&str>, mime: Option<&str>) -> String {
    let from_name = |name: &str| {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase())
    };

    if let Some(ext) = filename.and_then(from_name) {
        return ext;
    }
    if let Some(ext) = url::Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments().and_then(|s| s.last().map(str::to_string)))
        .as_deref()
        .and_then(from_name)
    {
        return ext;
    }
    mime.map(mime_to_extension).unwrap_or("bin").to_string()
}

/// Write `content` to `path`, creating parent directories.
pub async fn write_content(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await
}

/// Append-only JSON lines file of emitted items.
pub struct ItemManifest {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl ItemManifest {
    /// Open `path` for appending, creating it and its directory if needed.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one item as a single line.
    pub async fn append(&self, item: &CaseItem) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(item)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await
    }
}
