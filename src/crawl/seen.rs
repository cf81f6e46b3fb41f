//! Run-wide set of export links that have already been emitted.

use std::collections::HashSet;

use tokio::sync::Mutex;

/// Export links seen during this run, shared by every court chain.
///
/// The only operation is an atomic check-and-insert, so "never emit the same
/// link twice" holds no matter how chains interleave.
#[derive(Debug, Default)]
pub struct SeenLinks {
    links: Mutex<HashSet<String>>,
}

impl SeenLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `url` if it has not been seen. Returns true when inserted.
    pub async fn insert_if_new(&self, url: &str) -> bool {
        let mut links = self.links.lock().await;
        if links.contains(url) {
            return false;
        }
        links.insert(url.to_string())
    }
}
