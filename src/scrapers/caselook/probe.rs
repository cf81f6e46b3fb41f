//! Fixed-page probe over raw HTTP.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::CaselookPortal;
use crate::crawl::{earliest_in_listing, CrawlError, PageProbe, PortalSession, Result, SearchHandle};

#[async_trait]
impl PageProbe for CaselookPortal {
    async fn earliest_date(&self, session: &PortalSession, handle: &SearchHandle) -> Result<NaiveDate> {
        let url = self
            .http
            .url(&format!("search/{}/list/{}", handle, self.settings.probe_page));
        let cookies = self.cookie_header(session).await;
        let response = self
            .http
            .get(&url, &cookies)
            .await
            .map_err(|e| CrawlError::Probe(e.to_string()))?;

        if !response.is_success() {
            return Err(CrawlError::Probe(format!(
                "page {} returned HTTP {}",
                self.settings.probe_page, response.status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CrawlError::Probe(e.to_string()))?;
        Ok(earliest_in_listing(&body)?)
    }
}
