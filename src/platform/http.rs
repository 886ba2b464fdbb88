//! HTTP utilities for platform REST API calls

use crate::error::{Result, XdmError};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body for logging and strip control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Build the error for a non-2xx response, keeping the server's `title`/`detail` when present
fn request_failure(status: u16, body: &str) -> XdmError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |key: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    XdmError::RemoteRequestFailure {
        status,
        title: field("title"),
        detail: field("detail"),
    }
}

/// A single outgoing request
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub json: Option<&'a Value>,
}

impl<'a> Request<'a> {
    pub fn new(method: Method, url: &'a str) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            json: None,
        }
    }
}

/// HTTP client wrapper for platform API calls
#[derive(Clone)]
pub struct XdmHttpClient {
    client: Client,
}

impl XdmHttpClient {
    /// Create a new HTTP client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("xdmctl/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Send a request and parse the response body.
    ///
    /// Returns `None` for an empty body (e.g. `204 No Content` on delete).
    pub async fn send(&self, request: Request<'_>) -> Result<Option<Value>> {
        tracing::debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url)
            .headers(request.headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.json {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(request_failure(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.ends_with("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("bad\nrequest\t!"), "badrequest!");
    }

    #[test]
    fn test_request_failure_reads_title_and_detail() {
        let err = request_failure(400, r#"{"title":"Bad Request","detail":"missing title"}"#);
        match err {
            XdmError::RemoteRequestFailure { status, title, detail } => {
                assert_eq!(status, 400);
                assert_eq!(title.as_deref(), Some("Bad Request"));
                assert_eq!(detail.as_deref(), Some("missing title"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_request_failure_with_plain_text_body() {
        let err = request_failure(502, "upstream unavailable");
        assert!(matches!(
            err,
            XdmError::RemoteRequestFailure { status: 502, title: None, detail: None }
        ));
    }
}
