//! HTTP client for programmatic portal calls made outside the browser.

mod response;
mod user_agent;

pub use response::{parse_content_disposition_filename, HttpResponse};
pub use user_agent::{resolve_user_agent, ACCEPT_LANGUAGE, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE as ACCEPT_LANGUAGE_HEADER, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use reqwest::{Client, Method, RequestBuilder};
use tracing::debug;

/// HTTP client that sends the portal's standard headers and a session
/// cookie string with every request.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    accept_language: String,
}

impl HttpClient {
    /// Create a client for the portal at `base_url`.
    /// - `user_agent_config` None: desktop Chrome user agent
    /// - Some("impersonate"): random real browser user agent
    /// - Some(custom): custom user agent string
    pub fn new(
        base_url: &str,
        timeout: Duration,
        user_agent_config: Option<&str>,
        accept_language: &str,
    ) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            accept_language: accept_language.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a portal path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Headers sent on every call. Invalid cookie characters drop the
    /// `Cookie` header rather than failing the request.
    pub fn standard_headers(&self, cookie_header: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(referer) = HeaderValue::from_str(&format!("{}/", self.base_url)) {
            headers.insert(REFERER, referer);
        }
        if let Ok(lang) = HeaderValue::from_str(&self.accept_language) {
            headers.insert(ACCEPT_LANGUAGE_HEADER, lang);
        }
        if !cookie_header.is_empty() {
            match HeaderValue::from_str(cookie_header) {
                Ok(cookie) => {
                    headers.insert(COOKIE, cookie);
                }
                Err(_) => debug!("Session cookies contain invalid header characters"),
            }
        }
        headers
    }

    fn request(&self, method: Method, url: &str, cookie_header: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .headers(self.standard_headers(cookie_header))
    }

    /// GET with the standard headers.
    pub async fn get(&self, url: &str, cookie_header: &str) -> Result<HttpResponse, reqwest::Error> {
        debug!("GET {}", url);
        let response = self.request(Method::GET, url, cookie_header).send().await?;
        Ok(HttpResponse::from_response(response))
    }

    /// POST a JSON body with the standard headers plus `Origin`.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        cookie_header: &str,
    ) -> Result<HttpResponse, reqwest::Error> {
        debug!("POST {}", url);
        let mut request = self.request(Method::POST, url, cookie_header);
        if let Ok(origin) = HeaderValue::from_str(&self.base_url) {
            request = request.header(ORIGIN, origin);
        }
        let response = request.body(body.to_string()).send().await?;
        Ok(HttpResponse::from_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new("https://caselook.ru/", Duration::from_secs(5), None, ACCEPT_LANGUAGE).unwrap()
    }

    #[test]
    fn test_url_joins_paths() {
        let client = client();
        assert_eq!(client.url("/search"), "https://caselook.ru/search");
        assert_eq!(
            client.url("download/search/7/xlsx"),
            "https://caselook.ru/download/search/7/xlsx"
        );
    }

    #[test]
    fn test_standard_headers() {
        let headers = client().standard_headers("sid=42; lang=ru");
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[REFERER], "https://caselook.ru/");
        assert_eq!(headers[COOKIE], "sid=42; lang=ru");
        assert!(headers[ACCEPT_LANGUAGE_HEADER]
            .to_str()
            .unwrap()
            .starts_with("en-NZ,en;q=0.9"));
    }

    #[test]
    fn test_no_cookie_header_without_cookies() {
        let headers = client().standard_headers("");
        assert!(!headers.contains_key(COOKIE));
    }
}
