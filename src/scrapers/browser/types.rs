//! Browser session types shared with the HTTP layer.

use url::Url;

/// Cookie extracted from browser session.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

impl BrowserCookie {
    /// Minimal cookie, mostly useful for tests and injected sessions.
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            secure: true,
            http_only: false,
        }
    }
}

/// Serialize cookies into a `Cookie` header value (`a=1; b=2`).
pub fn cookie_header(cookies: &[BrowserCookie]) -> String {
    cookies
        .iter()
        .filter(|c| !c.name.is_empty())
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolve an `href` taken from a page against the page's URL.
///
/// Hash-routed pages resolve like any other: the fragment of `base` is
/// dropped for relative paths.
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string()),
    }
}
