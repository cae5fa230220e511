//! Changelog HTTP responses.

use edge_cache::{CacheStatus, HTML_CONTENT_TYPE};
use http::{header, StatusCode};

/// A response produced by the changelog service.
#[derive(Debug, Clone)]
pub struct ChangelogResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers, in emission order.
    pub headers: Vec<(String, String)>,
    /// The response body (empty for 304).
    pub body: String,
    /// Render cache outcome, when the cache was consulted.
    pub cache_status: Option<CacheStatus>,
}

impl ChangelogResponse {
    /// A 200 response carrying a rendered page.
    pub fn ok(headers: Vec<(String, String)>, body: String, cache_status: CacheStatus) -> Self {
        Self {
            status: StatusCode::OK,
            headers,
            body,
            cache_status: Some(cache_status),
        }
    }

    /// A bodiless 304 response.
    pub fn not_modified(headers: Vec<(String, String)>) -> Self {
        Self {
            status: StatusCode::NOT_MODIFIED,
            headers,
            body: String::new(),
            cache_status: None,
        }
    }

    /// A plain error page.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![(
                header::CONTENT_TYPE.as_str().to_string(),
                HTML_CONTENT_TYPE.to_string(),
            )],
            body: message.into(),
            cache_status: None,
        }
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the response carries a body.
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Convert into an `http::Response`. Headers with values that are not
    /// valid header text are skipped.
    pub fn into_http(self) -> http::Response<String> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            let (Ok(name), Ok(value)) = (
                header::HeaderName::from_bytes(name.as_bytes()),
                header::HeaderValue::from_str(&value),
            ) else {
                tracing::warn!(header = %name, "skipping invalid response header");
                continue;
            };
            headers.append(name, value);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_modified_has_no_body() {
        let response = ChangelogResponse::not_modified(vec![("ETag".into(), "\"abc\"".into())]);
        assert_eq!(response.status, StatusCode::NOT_MODIFIED);
        assert!(!response.has_body());
        assert_eq!(response.header("etag"), Some("\"abc\""));
    }

    #[test]
    fn test_error_response() {
        let response = ChangelogResponse::error(StatusCode::NOT_FOUND, "Download not found.");
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.header("Content-Type"), Some(HTML_CONTENT_TYPE));
        assert_eq!(response.body, "Download not found.");
    }

    #[test]
    fn test_into_http() {
        let response = ChangelogResponse::ok(
            vec![
                ("Content-Type".into(), HTML_CONTENT_TYPE.into()),
                ("X-Bad\nName".into(), "x".into()),
            ],
            "<html></html>".into(),
            CacheStatus::Miss,
        )
        .into_http();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            HTML_CONTENT_TYPE
        );
        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.body(), "<html></html>");
    }
}
