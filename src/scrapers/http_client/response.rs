//! Portal responses.

use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};

/// A portal response whose body has not been read yet.
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    response: Response,
}

impl HttpResponse {
    pub(crate) fn from_response(response: Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            response,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Server-suggested name of an exported file.
    pub fn content_disposition_filename(&self) -> Option<String> {
        self.headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition_filename)
    }

    pub async fn bytes(self) -> Result<Vec<u8>, reqwest::Error> {
        Ok(self.response.bytes().await?.to_vec())
    }

    pub async fn text(self) -> Result<String, reqwest::Error> {
        self.response.text().await
    }
}

/// Filename from a `Content-Disposition` value.
///
/// `filename*=UTF-8''...` takes precedence over a plain `filename=`; export
/// names on the portal are usually Cyrillic and only survive in the encoded
/// form.
pub fn parse_content_disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut encoded = None;

    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                encoded = value
                    .split_once("''")
                    .and_then(|(_, raw)| urlencoding::decode(raw.trim()).ok())
                    .map(|name| name.into_owned());
            }
            "filename" => plain = Some(value.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    encoded
        .filter(|name| !name.trim().is_empty())
        .or(plain)
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_filename() {
        assert_eq!(
            parse_content_disposition_filename(r#"attachment; filename="export.xlsx""#),
            Some("export.xlsx".to_string())
        );
    }

    #[test]
    fn test_encoded_cyrillic_filename() {
        let header = "attachment; filename*=UTF-8''%D0%B4%D0%B5%D0%BB%D0%B0.xlsx";
        assert_eq!(
            parse_content_disposition_filename(header),
            Some("дела.xlsx".to_string())
        );
    }

    #[test]
    fn test_encoded_filename_wins() {
        let header = r#"attachment; filename="fallback.xlsx"; filename*=UTF-8''preferred.xlsx"#;
        assert_eq!(
            parse_content_disposition_filename(header),
            Some("preferred.xlsx".to_string())
        );
    }

    #[test]
    fn test_no_filename() {
        assert_eq!(parse_content_disposition_filename("attachment"), None);
        assert_eq!(parse_content_disposition_filename(r#"attachment; filename="""#), None);
    }
}
