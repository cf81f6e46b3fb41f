//! Cookie extraction from CDP.

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::network::{Cookie, GetCookiesParams};
use chromiumoxide::Page;
use tracing::{debug, warn};

use super::types::BrowserCookie;

impl From<&Cookie> for BrowserCookie {
    fn from(c: &Cookie) -> Self {
        BrowserCookie {
            name: c.name.clone(),
            value: c.value.clone(),
            domain: c.domain.clone(),
            path: c.path.clone(),
            secure: c.secure,
            http_only: c.http_only,
        }
    }
}

/// Cookies visible to `url` from `page`.
///
/// Asks for the URL explicitly so cookies set on the parent domain are
/// included; falls back to the page's own cookie list.
pub async fn page_cookies(page: &Page, url: &str) -> Result<Vec<BrowserCookie>> {
    let params = GetCookiesParams::builder().urls(vec![url.to_string()]).build();
    let cookies = match page.execute(params).await {
        Ok(result) => result.result.cookies,
        Err(e) => {
            warn!("Failed to get cookies via CDP: {}, trying page.get_cookies()", e);
            page.get_cookies().await?
        }
    };
    debug!("Got {} cookies from page", cookies.len());
    Ok(cookies.iter().map(BrowserCookie::from).collect())
}
