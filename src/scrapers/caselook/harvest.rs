//! Export preparation and link harvesting.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::CaselookPortal;
use crate::crawl::{
    poll_for_new_link, CrawlError, CrawlWindow, LinkHarvester, PortalSession, Result, ResultsView,
    SearchHandle, SeenLinks,
};
use crate::models::DownloadRecord;

#[async_trait]
impl LinkHarvester for CaselookPortal {
    async fn harvest(
        &self,
        session: &PortalSession,
        window: &CrawlWindow,
        handle: &SearchHandle,
        view: &dyn ResultsView,
        seen: &SeenLinks,
    ) -> Result<DownloadRecord> {
        let export_url = self.http.url(&format!("download/search/{}/xlsx", handle));
        let cookies = self.cookie_header(session).await;
        let response = self
            .http
            .get(&export_url, &cookies)
            .await
            .map_err(|e| CrawlError::Harvest(format!("export preparation failed: {}", e)))?;

        if response.is_success() {
            debug!("Export preparation for search {}: {}", handle, response.status);
        } else {
            warn!(
                "Export preparation for search {} returned HTTP {}",
                handle, response.status
            );
        }

        let link = poll_for_new_link(
            view,
            seen,
            self.settings.poll_interval,
            self.settings.harvest_timeout,
        )
        .await?;

        Ok(DownloadRecord::new(link, window.court.id.clone(), window.date_upper))
    }
}
