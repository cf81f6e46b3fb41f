//! Search submission.

use async_trait::async_trait;
use tracing::debug;

use super::CaselookPortal;
use crate::crawl::{
    build_search_payload, parse_search_response, CrawlError, CrawlWindow, PortalSession, Result,
    SearchHandle, SearchSubmitter,
};

#[async_trait]
impl SearchSubmitter for CaselookPortal {
    async fn submit(&self, session: &PortalSession, window: &CrawlWindow) -> Result<SearchHandle> {
        let payload = build_search_payload(window, &self.settings.filters);
        debug!("Search payload for court {}: {}", window.court.id, payload);

        let cookies = self.cookie_header(session).await;
        let response = self
            .http
            .post_json(&self.http.url("search"), &payload, &cookies)
            .await
            .map_err(|e| CrawlError::Submission(e.to_string()))?;

        let status = response.status;
        if !response.is_success() {
            return Err(CrawlError::Submission(format!("search returned HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CrawlError::Submission(e.to_string()))?;
        parse_search_response(&body).map_err(CrawlError::Submission)
    }
}
