//! Authenticated portal session.

use chrono::{DateTime, Utc};

use super::error::{CrawlError, Result};
use crate::scrapers::browser::{cookie_header, BrowserCookie};

/// Cookie snapshot taken right after login.
///
/// Read-only once created; every chain borrows it.
#[derive(Debug, Clone)]
pub struct PortalSession {
    cookies: Vec<BrowserCookie>,
    established_at: DateTime<Utc>,
}

impl PortalSession {
    /// Build a session from the cookies a login produced.
    ///
    /// A login that yields no cookies did not log in.
    pub fn from_cookies(cookies: Vec<BrowserCookie>) -> Result<Self> {
        if cookies.is_empty() {
            return Err(CrawlError::Authentication(
                "no cookies were set after submitting the login form".to_string(),
            ));
        }
        Ok(Self {
            cookies,
            established_at: Utc::now(),
        })
    }

    pub fn cookies(&self) -> &[BrowserCookie] {
        &self.cookies
    }

    /// `Cookie` header value for programmatic calls.
    pub fn cookie_header(&self) -> String {
        cookie_header(&self.cookies)
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}
