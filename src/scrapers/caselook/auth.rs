//! Browser login.

use async_trait::async_trait;
use chromiumoxide::Page;
use tracing::{debug, info};

use super::{search_page_url, CaselookPortal};
use crate::crawl::{Authenticator, CrawlError, PortalSession, Result};
use crate::scrapers::browser::{close_page, page_cookies, wait_for_element, BrowserCookie};

impl CaselookPortal {
    async fn submit_login(&self, page: &Page) -> anyhow::Result<Vec<BrowserCookie>> {
        let selectors = &self.settings.selectors;
        let timeout = self.settings.browser_timeout;
        let creds = &self.settings.credentials;

        let email = wait_for_element(page, &selectors.email, timeout).await?;
        email.click().await?;
        email.type_str(&creds.email).await?;

        let password = wait_for_element(page, &selectors.password, timeout).await?;
        password.click().await?;
        password.type_str(&creds.password).await?;

        wait_for_element(page, &selectors.submit, timeout)
            .await?
            .click()
            .await?;
        debug!("Login form submitted for {}", creds.email);

        tokio::time::sleep(self.settings.login_settle).await;

        let mut cookies = page_cookies(page, self.http.base_url()).await?;
        if cookies.is_empty() {
            cookies = self.browser.cookies().await?;
        }
        Ok(cookies)
    }
}

#[async_trait]
impl Authenticator for CaselookPortal {
    async fn authenticate(&self) -> Result<PortalSession> {
        let url = search_page_url(self.http.base_url());
        info!("Logging in to {} as {}", url, self.settings.credentials.email);

        let page = self
            .browser
            .new_page(&url)
            .await
            .map_err(|e| CrawlError::Authentication(format!("{:#}", e)))?;

        let result = self.submit_login(&page).await;
        close_page(page).await;

        let cookies = result.map_err(|e| CrawlError::Authentication(format!("{:#}", e)))?;
        PortalSession::from_cookies(cookies)
    }
}
