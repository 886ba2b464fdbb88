//! Platform Authentication
//!
//! Obtains bearer tokens through the OAuth client-credentials grant of the
//! IMS token endpoint and produces the header set every registry request carries.

use super::http::{Request, XdmHttpClient};
use crate::config::Credentials;
use crate::error::{Result, XdmError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default IMS host used to mint access tokens
pub const DEFAULT_IMS_URL: &str = "https://ims-na1.adobelogin.com";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if the token response carries no `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

const API_KEY_HEADER: &str = "x-api-key";
const ORG_ID_HEADER: &str = "x-gw-ims-org-id";
const SANDBOX_HEADER: &str = "x-sandbox-name";

#[derive(Clone)]
enum TokenSource {
    /// OAuth client credentials exchanged at the IMS endpoint
    ClientCredentials {
        http: XdmHttpClient,
        ims_url: String,
        client_secret: String,
        scopes: Vec<String>,
    },
    /// Pre-issued token, never refreshed
    Static(String),
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Credentials holder with token caching
#[derive(Clone)]
pub struct XdmCredentials {
    client_id: String,
    org_id: String,
    sandbox: String,
    source: TokenSource,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl XdmCredentials {
    /// Credentials that mint tokens from the developer-console client credentials
    pub fn from_client_credentials(
        credentials: &Credentials,
        ims_url: &str,
        sandbox: &str,
        http: XdmHttpClient,
    ) -> Result<Self> {
        let client_secret = credentials
            .client_secrets
            .first()
            .cloned()
            .ok_or_else(|| XdmError::Auth("credentials file lists no client secret".to_string()))?;

        Ok(Self {
            client_id: credentials.client_id.clone(),
            org_id: credentials.org_id.clone(),
            sandbox: sandbox.to_string(),
            source: TokenSource::ClientCredentials {
                http,
                ims_url: ims_url.trim_end_matches('/').to_string(),
                client_secret,
                scopes: credentials.scopes.clone(),
            },
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Credentials around an already issued access token
    pub fn from_token(token: &str, client_id: &str, org_id: &str, sandbox: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            org_id: org_id.to_string(),
            sandbox: sandbox.to_string(),
            source: TokenSource::Static(token.to_string()),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn sandbox(&self) -> &str {
        &self.sandbox
    }

    /// Select a different sandbox for subsequent requests
    pub fn set_sandbox(&mut self, sandbox: &str) {
        self.sandbox = sandbox.to_string();
    }

    /// Get an access token for API calls, reusing the cached one while it is valid
    pub async fn get_token(&self) -> Result<String> {
        let (http, ims_url, client_secret, scopes) = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ClientCredentials {
                http,
                ims_url,
                client_secret,
                scopes,
            } => (http, ims_url, client_secret, scopes),
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let url = format!("{}/ims/token/v2", ims_url);
        let mut request = Request::new(Method::POST, &url);
        request.query = vec![
            ("grant_type".to_string(), "client_credentials".to_string()),
            ("client_id".to_string(), self.client_id.clone()),
            ("client_secret".to_string(), client_secret.clone()),
            ("scope".to_string(), scopes.join(",")),
        ];

        let response = http
            .send(request)
            .await?
            .ok_or_else(|| XdmError::Auth("empty token response".to_string()))?;

        let token = response
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| XdmError::Auth("token response has no access_token".to_string()))?
            .to_string();

        let ttl = response
            .get("expires_in")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token)
    }

    /// Headers identifying the caller: bearer token, API key, org, and sandbox
    pub async fn headers(&self) -> Result<HeaderMap> {
        let token = self.get_token().await?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), header_value(&self.client_id)?);
        headers.insert(HeaderName::from_static(ORG_ID_HEADER), header_value(&self.org_id)?);
        headers.insert(HeaderName::from_static(SANDBOX_HEADER), header_value(&self.sandbox)?);
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| XdmError::Auth("credential contains characters not allowed in a header".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_headers() {
        let credentials = XdmCredentials::from_token("abc", "client", "org@AdobeOrg", "prod");
        let headers = credentials.headers().await.unwrap();

        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert_eq!(headers[API_KEY_HEADER], "client");
        assert_eq!(headers[ORG_ID_HEADER], "org@AdobeOrg");
        assert_eq!(headers[SANDBOX_HEADER], "prod");
    }

    #[tokio::test]
    async fn test_set_sandbox_changes_header() {
        let mut credentials = XdmCredentials::from_token("abc", "client", "org", "prod");
        credentials.set_sandbox("stage");
        let headers = credentials.headers().await.unwrap();
        assert_eq!(headers[SANDBOX_HEADER], "stage");
        assert_eq!(credentials.sandbox(), "stage");
    }

    #[test]
    fn test_client_credentials_require_a_secret() {
        let credentials = Credentials {
            client_id: "client".to_string(),
            client_secrets: vec![],
            org_id: "org".to_string(),
            scopes: vec!["openid".to_string()],
        };
        let http = XdmHttpClient::new(Duration::from_secs(5)).unwrap();
        let result =
            XdmCredentials::from_client_credentials(&credentials, DEFAULT_IMS_URL, "prod", http);
        assert!(matches!(result, Err(XdmError::Auth(_))));
    }
}
