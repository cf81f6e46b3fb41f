//! Export link polling.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::components::ResultsView;
use super::error::{CrawlError, Result};
use super::seen::SeenLinks;

/// Poll `view` until it shows an export link nobody has emitted yet.
///
/// The first such link is claimed in `seen` and returned; links already in
/// `seen` are skipped. Stops with [`CrawlError::HarvestTimeout`] once
/// `timeout` has elapsed without a new link.
///
/// Other new links in the same poll stay unclaimed. If one of them is still
/// exported when a later window polls, possibly a window of another court,
/// that window claims it and its record carries the later window's court and
/// upper bound.
pub async fn poll_for_new_link(
    view: &dyn ResultsView,
    seen: &SeenLinks,
    interval: Duration,
    timeout: Duration,
) -> Result<String> {
    let started = Instant::now();
    let mut polls = 0u32;

    loop {
        polls += 1;
        for link in view.export_links().await? {
            if seen.insert_if_new(&link).await {
                debug!("New export link after {} poll(s): {}", polls, link);
                return Ok(link);
            }
            debug!("Skipping already seen export link {}", link);
        }

        if started.elapsed() >= timeout {
            return Err(CrawlError::HarvestTimeout(timeout));
        }
        tokio::time::sleep(interval).await;
    }
}
