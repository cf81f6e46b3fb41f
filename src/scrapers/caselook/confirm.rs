//! Result confirmation and the open results view.

use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::Page;
use tracing::debug;

use super::{documents_page_url, search_page_url, CaselookPortal};
use crate::crawl::{CrawlError, CrawlWindow, PortalSession, Result, ResultConfirmer, ResultsView, SearchHandle};
use crate::scrapers::browser::{
    close_page, export_hrefs, page_url, resolve_href, save_full_screenshot, wait_for_visible,
};

/// A results listing open in the browser.
pub struct BrowserResultsView {
    page: Page,
    url: String,
    export_selector: String,
}

impl BrowserResultsView {
    pub fn new(page: Page, url: String, export_selector: String) -> Self {
        Self {
            page,
            url,
            export_selector,
        }
    }
}

#[async_trait]
impl ResultsView for BrowserResultsView {
    async fn export_links(&self) -> Result<Vec<String>> {
        let hrefs = export_hrefs(&self.page, &self.export_selector)
            .await
            .map_err(|e| CrawlError::Harvest(format!("{:#}", e)))?;

        let base = match page_url(&self.page).await {
            Ok(Some(url)) => url,
            _ => self.url.clone(),
        };
        Ok(hrefs
            .iter()
            .filter_map(|href| resolve_href(&base, href))
            .collect())
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        save_full_screenshot(&self.page, path)
            .await
            .map_err(|e| CrawlError::Browser(format!("{:#}", e)))
    }

    async fn close(self: Box<Self>) {
        let view = *self;
        close_page(view.page).await;
    }
}

#[async_trait]
impl ResultConfirmer for CaselookPortal {
    async fn confirm(
        &self,
        _session: &PortalSession,
        _window: &CrawlWindow,
        handle: &SearchHandle,
    ) -> Result<Box<dyn ResultsView>> {
        let url = documents_page_url(self.http.base_url(), handle);
        let page = self
            .browser
            .new_page(&url)
            .await
            .map_err(|e| CrawlError::Confirmation(format!("{:#}", e)))?;

        let selected = async {
            let tick =
                wait_for_visible(&page, &self.settings.selectors.select_all, self.settings.browser_timeout)
                    .await?;
            tick.click().await?;
            anyhow::Ok(())
        }
        .await;

        match selected {
            Ok(()) => {
                debug!("Selected all results for search {}", handle);
                Ok(Box::new(BrowserResultsView::new(
                    page,
                    url,
                    self.settings.selectors.export_link.clone(),
                )))
            }
            Err(e) => {
                close_page(page).await;
                Err(CrawlError::Confirmation(format!("{:#}", e)))
            }
        }
    }

    async fn snapshot_page(
        &self,
        _session: &PortalSession,
        window: &CrawlWindow,
        handle: Option<&SearchHandle>,
    ) -> Result<Box<dyn ResultsView>> {
        let url = match handle {
            Some(handle) => documents_page_url(self.http.base_url(), handle),
            None => search_page_url(self.http.base_url()),
        };
        debug!("Opening {} to capture court {}", url, window.court.id);

        let page = self
            .browser
            .new_page(&url)
            .await
            .map_err(|e| CrawlError::Browser(format!("{:#}", e)))?;
        Ok(Box::new(BrowserResultsView::new(
            page,
            url,
            self.settings.selectors.export_link.clone(),
        )))
    }
}
