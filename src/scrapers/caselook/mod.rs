//! The Caselook portal: browser and HTTP implementations of every crawl step.
//!
//! Login, result confirmation and export links go through the browser; search
//! submission, export preparation and the page probe are plain HTTP calls
//! carrying the browser's cookies.

mod auth;
mod confirm;
mod harvest;
mod probe;
mod search;

pub use confirm::BrowserResultsView;

use std::time::Duration;

use tracing::debug;

use super::browser::{cookie_header, PortalBrowser};
use super::http_client::HttpClient;
use crate::config::{Config, ConfigError, Credentials, SelectorConfig};
use crate::crawl::{PortalSession, QueryFilters, SearchHandle};

/// Everything the portal steps need from configuration.
#[derive(Debug, Clone)]
pub struct PortalSettings {
    pub credentials: Credentials,
    pub selectors: SelectorConfig,
    pub filters: QueryFilters,
    pub probe_page: u32,
    pub poll_interval: Duration,
    pub harvest_timeout: Duration,
    pub login_settle: Duration,
    pub browser_timeout: Duration,
}

impl PortalSettings {
    pub fn from_config(config: &Config, credentials: Credentials) -> Result<Self, ConfigError> {
        Ok(Self {
            credentials,
            selectors: config.selectors.clone(),
            filters: config.crawl.query_filters()?,
            probe_page: config.crawl.probe_page,
            poll_interval: config.crawl.poll_interval(),
            harvest_timeout: config.crawl.harvest_timeout(),
            login_settle: config.crawl.login_settle(),
            browser_timeout: config.browser.timeout(),
        })
    }
}

/// SPA route serving the login form and the search screen.
///
/// Distinct from the `search` API endpoint, which only answers POSTs.
fn search_page_url(base: &str) -> String {
    format!("{}/#/search", base.trim_end_matches('/'))
}

/// SPA route listing the documents of one search.
fn documents_page_url(base: &str, handle: &SearchHandle) -> String {
    format!("{}/#/search/{}/documents/", base.trim_end_matches('/'), handle)
}

/// Caselook client shared by every court chain.
pub struct CaselookPortal {
    browser: PortalBrowser,
    http: HttpClient,
    settings: PortalSettings,
}

impl CaselookPortal {
    pub fn new(browser: PortalBrowser, http: HttpClient, settings: PortalSettings) -> Self {
        Self {
            browser,
            http,
            settings,
        }
    }

    /// Cookie header for a programmatic call.
    ///
    /// Cookies are read again from the browser so that anything the portal
    /// set after login is included; the login snapshot is the fallback.
    async fn cookie_header(&self, session: &PortalSession) -> String {
        match self.browser.cookies().await {
            Ok(cookies) if !cookies.is_empty() => cookie_header(&cookies),
            Ok(_) => session.cookie_header(),
            Err(e) => {
                debug!("Using login cookie snapshot: {}", e);
                session.cookie_header()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_opens_spa_route() {
        let http = HttpClient::new(
            "https://caselook.ru/",
            Duration::from_secs(5),
            None,
            crate::scrapers::ACCEPT_LANGUAGE,
        )
        .unwrap();

        let url = search_page_url(http.base_url());
        assert_eq!(url, "https://caselook.ru/#/search");
        assert_ne!(url, http.url("search"));
    }

    #[test]
    fn test_documents_route() {
        assert_eq!(
            documents_page_url("https://caselook.ru", &SearchHandle::new("77")),
            "https://caselook.ru/#/search/77/documents/"
        );
    }
}
