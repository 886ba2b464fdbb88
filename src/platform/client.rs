//! Platform Client
//!
//! Main client for the platform REST API, combining authentication
//! and HTTP functionality behind a path-based request method.

use super::auth::XdmCredentials;
use super::http::{Request, XdmHttpClient};
use crate::config::{Credentials, Settings};
use crate::error::{Result, XdmError};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default platform gateway
pub const DEFAULT_BASE_URL: &str = "https://platform.adobe.io";

/// Main platform client
#[derive(Clone)]
pub struct XdmClient {
    pub credentials: XdmCredentials,
    pub http: XdmHttpClient,
    base_url: String,
}

impl XdmClient {
    /// Create a client from loaded settings and developer-console credentials
    pub fn new(settings: &Settings, credentials: &Credentials) -> Result<Self> {
        let http = XdmHttpClient::new(Duration::from_secs(settings.timeout_secs))?;
        let credentials = XdmCredentials::from_client_credentials(
            credentials,
            &settings.ims_url,
            &settings.sandbox,
            http.clone(),
        )?;

        Self::with_credentials(&settings.base_url, credentials, http)
    }

    /// Create a client around existing credentials
    pub fn with_credentials(
        base_url: &str,
        credentials: XdmCredentials,
        http: XdmHttpClient,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| XdmError::InvalidConfig(format!("invalid base url \"{}\": {}", base_url, e)))?;

        Ok(Self {
            credentials,
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Switch to a different sandbox
    pub fn switch_sandbox(&mut self, sandbox: &str) {
        self.credentials.set_sandbox(sandbox);
    }

    /// Send a request to `path` (relative to the base URL) with auth headers attached
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        accept: &str,
        query: &[(String, String)],
        json: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = Request::new(method, &url);
        request.headers = self.credentials.headers().await?;
        request.headers.insert(
            ACCEPT,
            HeaderValue::from_str(accept)
                .map_err(|_| XdmError::InvalidConfig(format!("invalid accept header \"{}\"", accept)))?,
        );
        request.query = query.to_vec();
        request.json = json;

        self.http.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Result<XdmClient> {
        let http = XdmHttpClient::new(Duration::from_secs(5))?;
        let credentials = XdmCredentials::from_token("t", "c", "o", "prod");
        XdmClient::with_credentials(base, credentials, http)
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = client("https://platform.adobe.io/").unwrap();
        assert_eq!(client.base_url(), "https://platform.adobe.io");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(client("not a url").is_err());
    }

    #[test]
    fn test_switch_sandbox() {
        let mut client = client(DEFAULT_BASE_URL).unwrap();
        client.switch_sandbox("dev");
        assert_eq!(client.credentials.sandbox(), "dev");
    }
}
