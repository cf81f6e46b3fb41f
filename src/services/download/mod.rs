//! Record persistence service.
//!
//! Drains the records the crawl emits, fetches each export file, stores it
//! under the downloads directory and appends the item to the manifest.
//! Separated from UI concerns - emits events for progress tracking.

mod types;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::crawl::format_portal_date;
use crate::models::{DownloadRecord, StoredFile};
use crate::scrapers::HttpClient;
use crate::storage::{
    compute_hash, content_storage_path, file_extension, write_content, ItemManifest, MANIFEST_FILE,
};

pub use types::{DownloadConfig, DownloadEvent, DownloadResult};

#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),
}

/// Service that persists download records.
pub struct DownloadService {
    client: HttpClient,
    manifest: Arc<ItemManifest>,
    config: DownloadConfig,
}

impl DownloadService {
    /// Create a service writing to `{downloads_dir}/items.jsonl`.
    pub async fn open(client: HttpClient, config: DownloadConfig) -> std::io::Result<Self> {
        let manifest = ItemManifest::open(&config.downloads_dir.join(MANIFEST_FILE)).await?;
        Ok(Self {
            client,
            manifest: Arc::new(manifest),
            config,
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.manifest.path().to_path_buf()
    }

    /// Persist records until the channel closes.
    ///
    /// Failures are counted and reported as events; they never stop the
    /// remaining records.
    pub async fn run(
        &self,
        records: mpsc::Receiver<DownloadRecord>,
        cookie_header: String,
        event_tx: mpsc::Sender<DownloadEvent>,
    ) -> DownloadResult {
        let records = Arc::new(Mutex::new(records));
        let cookies: Arc<str> = Arc::from(cookie_header);
        let downloaded = Arc::new(AtomicUsize::new(0));
        let recorded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let workers = self.config.workers.max(1);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                client: self.client.clone(),
                manifest: self.manifest.clone(),
                config: self.config.clone(),
                cookies: cookies.clone(),
                event_tx: event_tx.clone(),
            };
            let records = records.clone();
            let downloaded = downloaded.clone();
            let recorded = recorded.clone();
            let failed = failed.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let record = { records.lock().await.recv().await };
                    let Some(record) = record else { break };

                    match worker.process(record).await {
                        Outcome::Downloaded => downloaded.fetch_add(1, Ordering::Relaxed),
                        Outcome::Recorded => recorded.fetch_add(1, Ordering::Relaxed),
                        Outcome::Failed => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Download worker panicked: {}", e);
            }
        }

        DownloadResult {
            downloaded: downloaded.load(Ordering::Relaxed),
            recorded: recorded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        }
    }
}

enum Outcome {
    Downloaded,
    Recorded,
    Failed,
}

struct Worker {
    id: usize,
    client: HttpClient,
    manifest: Arc<ItemManifest>,
    config: DownloadConfig,
    cookies: Arc<str>,
    event_tx: mpsc::Sender<DownloadEvent>,
}

impl Worker {
    async fn process(&self, record: DownloadRecord) -> Outcome {
        let url = record.file_url.clone();
        let _ = self
            .event_tx
            .send(DownloadEvent::Started {
                worker_id: self.id,
                url: url.clone(),
                court: record.court.to_string(),
            })
            .await;

        let mut item = record.to_item();
        let stored = if self.config.fetch_files {
            Some(self.fetch_and_store(&record).await)
        } else {
            None
        };

        let fetch_error = match stored {
            Some(Ok(file)) => {
                item.files.push(file);
                None
            }
            Some(Err(e)) => Some(e.to_string()),
            None => None,
        };

        // The link is kept in the manifest even when the file could not be fetched
        if let Err(e) = self.manifest.append(&item).await {
            error!("Failed to write item for {}: {}", url, e);
            return self.failed(url, format!("manifest write failed: {}", e)).await;
        }

        if let Some(e) = fetch_error {
            error!("Failed to download {}: {}", url, e);
            return self.failed(url, e).await;
        }

        match item.files.first() {
            Some(file) => {
                let _ = self
                    .event_tx
                    .send(DownloadEvent::Completed {
                        worker_id: self.id,
                        url,
                        path: PathBuf::from(&file.path),
                    })
                    .await;
                Outcome::Downloaded
            }
            None => {
                let _ = self
                    .event_tx
                    .send(DownloadEvent::Recorded {
                        worker_id: self.id,
                        url,
                    })
                    .await;
                Outcome::Recorded
            }
        }
    }

    async fn failed(&self, url: String, error: String) -> Outcome {
        let _ = self
            .event_tx
            .send(DownloadEvent::Failed {
                worker_id: self.id,
                url,
                error,
            })
            .await;
        Outcome::Failed
    }

    async fn fetch_and_store(&self, record: &DownloadRecord) -> Result<StoredFile, DownloadError> {
        let response = self.client.get(&record.file_url, &self.cookies).await?;
        if !response.is_success() {
            return Err(DownloadError::Status(response.status));
        }

        let filename = response.content_disposition_filename();
        let mime = response.content_type().map(str::to_string);
        let content = response.bytes().await?;

        let _ = self
            .event_tx
            .send(DownloadEvent::Progress {
                worker_id: self.id,
                bytes: content.len() as u64,
                total: Some(content.len() as u64),
            })
            .await;

        let checksum = compute_hash(&content);
        let extension = file_extension(&record.file_url, filename.as_deref(), mime.as_deref());
        let path = content_storage_path(
            &self.config.downloads_dir,
            record.court.as_str(),
            &format_portal_date(record.date_upper),
            &checksum,
            &extension,
        );
        write_content(&path, &content).await?;
        debug!("Stored {} as {}", record.file_url, path.display());

        Ok(StoredFile {
            url: record.file_url.clone(),
            path: path.display().to_string(),
            checksum,
        })
    }
}
