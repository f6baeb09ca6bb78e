//! OAuth 2.0 authorization code flow
//!
//! This module drives the browser-based authorization code grant against the
//! account's OAuth endpoints and produces the [`AccessToken`] used by every
//! MCP request.
//!
//! # Flow overview
//!
//! 1. Bind the single-use [`CallbackListener`] on the host, port and path of
//!    the configured `redirect_uri`.
//! 2. Build the authorization URL (`client_id`, `response_type=code`,
//!    `redirect_uri`, optional `scope`) and open it in the user's browser.
//! 3. Wait for the redirect and take the `code` query parameter.
//! 4. Exchange the code for a token with one form-encoded POST to the token
//!    endpoint. There is no retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{Result, SnowmcpError};
use crate::mcp::auth::callback::{AuthorizationCode, CallbackListener};

/// Default wait for the browser redirect.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// OAuthFlowConfig
// ---------------------------------------------------------------------------

/// Endpoints and client credentials for one authorization attempt.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use url::Url;
/// use snowmcp::mcp::auth::flow::OAuthFlowConfig;
///
/// let config = OAuthFlowConfig {
///     authorize_endpoint: Url::parse("https://acme.snowflakecomputing.com/oauth/authorize").unwrap(),
///     token_endpoint: Url::parse("https://acme.snowflakecomputing.com/oauth/token-request").unwrap(),
///     client_id: "client".to_string(),
///     client_secret: "secret".to_string(),
///     redirect_uri: Url::parse("http://localhost:3000/oauth/callback").unwrap(),
///     scope: None,
///     callback_timeout: Duration::from_secs(300),
/// };
///
/// assert_eq!(config.redirect_uri.port(), Some(3000));
/// ```
#[derive(Clone)]
pub struct OAuthFlowConfig {
    /// Authorization endpoint the browser is sent to.
    pub authorize_endpoint: Url,

    /// Token endpoint that exchanges the code.
    pub token_endpoint: Url,

    /// OAuth client identifier.
    pub client_id: String,

    /// OAuth client secret, sent only to the token endpoint.
    pub client_secret: String,

    /// Redirect URI registered for the client. Its host, port and path
    /// determine where the callback listener binds. Port `0` lets the OS
    /// choose and the chosen port is substituted into the URI.
    pub redirect_uri: Url,

    /// Optional space-separated scope string.
    pub scope: Option<String>,

    /// How long to wait for the browser redirect.
    pub callback_timeout: Duration,
}

impl std::fmt::Debug for OAuthFlowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthFlowConfig")
            .field("authorize_endpoint", &self.authorize_endpoint.as_str())
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scope", &self.scope)
            .field("callback_timeout", &self.callback_timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AuthorizationGrant
// ---------------------------------------------------------------------------

/// The parameters of one authorization request.
///
/// Immutable for the lifetime of a flow; the same `redirect_uri` must be
/// presented to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    /// OAuth client identifier.
    pub client_id: String,
    /// Effective redirect URI (with the bound port substituted).
    pub redirect_uri: String,
    /// Optional scope string.
    pub scope: Option<String>,
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// A bearer token obtained from the token endpoint.
///
/// Expiry is observational: nothing refreshes or rejects an expired token.
/// `Debug` output redacts the token value.
///
/// # Examples
///
/// ```
/// use snowmcp::mcp::auth::flow::AccessToken;
///
/// let token = AccessToken::new("tok123", Some(600));
/// assert_eq!(token.value(), "tok123");
/// assert!(!token.is_expired());
/// assert!(!format!("{token:?}").contains("tok123"));
/// ```
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    token_type: String,
    expires_in: Option<u64>,
    obtained_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a bearer token obtained now.
    pub fn new(value: impl Into<String>, expires_in: Option<u64>) -> Self {
        Self {
            value: value.into(),
            token_type: "Bearer".to_string(),
            expires_in,
            obtained_at: Utc::now(),
        }
    }

    /// The raw token value for the `Authorization` header.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Token type reported by the server, `Bearer` when absent.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Lifetime in seconds as reported by the token endpoint.
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// When the token was received.
    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }

    /// Absolute expiry time, when the server reported a lifetime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| {
            self.obtained_at + chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
        })
    }

    /// Returns `true` once the reported lifetime has elapsed.
    ///
    /// Tokens without a reported lifetime never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at().map(|at| Utc::now() >= at).unwrap_or(false)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Token endpoint response (raw deserialization)
// ---------------------------------------------------------------------------

/// Raw JSON response from the token endpoint.
///
/// Every field is optional so that a missing `access_token` is reported as
/// [`SnowmcpError::TokenResponseMalformed`] instead of a serde error.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn into_access_token(self) -> Result<AccessToken> {
        let value = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SnowmcpError::TokenResponseMalformed(
                    "response has no access_token".to_string(),
                )
            })?;

        // Some servers send the lifetime as a string.
        let expires_in = self.expires_in.and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });

        let mut token = AccessToken::new(value, expires_in);
        if let Some(token_type) = self.token_type {
            token.token_type = token_type;
        }
        Ok(token)
    }
}

// ---------------------------------------------------------------------------
// UrlOpener
// ---------------------------------------------------------------------------

/// Presents the authorization URL to the user.
///
/// Opening is fire-and-forget: implementations must not block and failures
/// are not reported.
pub trait UrlOpener: Send + Sync {
    /// Opens `url` for the user.
    fn open(&self, url: &str);
}

/// Opens URLs in the system's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) {
        #[cfg(target_os = "macos")]
        {
            let _ = std::process::Command::new("open").arg(url).spawn();
        }
        #[cfg(target_os = "linux")]
        {
            let _ = std::process::Command::new("xdg-open").arg(url).spawn();
        }
        #[cfg(target_os = "windows")]
        {
            let _ = std::process::Command::new("cmd")
                .args(["/C", "start", "", url])
                .spawn();
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            // The URL is also printed to stderr for manual copying.
            let _ = url;
        }
    }
}

// ---------------------------------------------------------------------------
// OAuthFlow
// ---------------------------------------------------------------------------

/// Drives the authorization code flow for one client.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use url::Url;
/// use snowmcp::mcp::auth::flow::{OAuthFlow, OAuthFlowConfig};
///
/// # async fn example() -> snowmcp::error::Result<()> {
/// let config = OAuthFlowConfig {
///     authorize_endpoint: Url::parse("https://acme.snowflakecomputing.com/oauth/authorize")?,
///     token_endpoint: Url::parse("https://acme.snowflakecomputing.com/oauth/token-request")?,
///     client_id: "client".to_string(),
///     client_secret: "secret".to_string(),
///     redirect_uri: Url::parse("http://localhost:3000/oauth/callback")?,
///     scope: None,
///     callback_timeout: Duration::from_secs(300),
/// };
///
/// let flow = OAuthFlow::new(Arc::new(reqwest::Client::new()), config);
/// let token = flow.authenticate().await?;
/// # let _ = token;
/// # Ok(())
/// # }
/// ```
pub struct OAuthFlow {
    http: Arc<reqwest::Client>,
    config: OAuthFlowConfig,
    opener: Box<dyn UrlOpener>,
}

impl OAuthFlow {
    /// Creates a flow that opens the system browser.
    ///
    /// # Arguments
    ///
    /// * `http` - Shared HTTP client for the token exchange.
    /// * `config` - Endpoints and client credentials.
    pub fn new(http: Arc<reqwest::Client>, config: OAuthFlowConfig) -> Self {
        Self {
            http,
            config,
            opener: Box::new(SystemBrowser),
        }
    }

    /// Replaces the way the authorization URL is presented.
    pub fn with_opener(mut self, opener: impl UrlOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// The flow configuration.
    pub fn config(&self) -> &OAuthFlowConfig {
        &self.config
    }

    /// Runs the complete authorization code flow.
    ///
    /// # Errors
    ///
    /// - [`SnowmcpError::Config`] if the redirect URI has no host.
    /// - [`SnowmcpError::ListenerBindFailed`] if the redirect port is taken.
    /// - [`SnowmcpError::AuthorizationTimeout`] if the user never completes
    ///   the browser step.
    /// - [`SnowmcpError::AuthorizationDenied`] if the redirect carries no code.
    /// - [`SnowmcpError::AuthorizationCodeMissing`] if the code is empty.
    /// - [`SnowmcpError::TokenExchangeFailed`] or
    ///   [`SnowmcpError::TokenResponseMalformed`] from the token exchange.
    pub async fn authenticate(&self) -> Result<AccessToken> {
        let (host, port, path) = redirect_target(&self.config.redirect_uri)?;

        // Bind before opening the browser so the redirect cannot race us.
        let listener = CallbackListener::bind(&host, port, &path).await?;

        let mut redirect_uri = self.config.redirect_uri.clone();
        if port == 0 {
            let bound = listener.local_addr().port();
            redirect_uri.set_port(Some(bound)).map_err(|_| {
                SnowmcpError::Config("redirect URI cannot carry a port".to_string())
            })?;
        }

        let grant = AuthorizationGrant {
            client_id: self.config.client_id.clone(),
            redirect_uri: redirect_uri.to_string(),
            scope: self.config.scope.clone(),
        };

        let auth_url = self.build_authorization_url(&grant);
        eprintln!("Open the following URL in your browser to authorize:\n{auth_url}");
        tracing::info!("Waiting for authorization (check your browser)");
        self.opener.open(auth_url.as_str());

        let code = listener.wait(self.config.callback_timeout).await?;
        if code.is_empty() {
            return Err(SnowmcpError::AuthorizationCodeMissing.into());
        }
        tracing::info!("Authorization code received; exchanging for access token");

        let token = self.exchange_code(&grant, &code).await?;
        tracing::info!(
            expires_in = ?token.expires_in(),
            "Access token obtained"
        );
        Ok(token)
    }

    /// Builds the authorization URL for `grant`.
    ///
    /// Existing query parameters on the configured endpoint are preserved.
    pub fn build_authorization_url(&self, grant: &AuthorizationGrant) -> Url {
        let mut url = self.config.authorize_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &grant.client_id);
            query.append_pair("response_type", "code");
            query.append_pair("redirect_uri", &grant.redirect_uri);
            if let Some(scope) = &grant.scope {
                query.append_pair("scope", scope);
            }
        }
        url
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// Sends a single form-encoded POST; non-2xx responses are not retried.
    ///
    /// # Errors
    ///
    /// - [`SnowmcpError::Http`] if the request cannot be sent.
    /// - [`SnowmcpError::TokenExchangeFailed`] on a non-2xx status.
    /// - [`SnowmcpError::TokenResponseMalformed`] if the body is not JSON or
    ///   has no `access_token`.
    pub async fn exchange_code(
        &self,
        grant: &AuthorizationGrant,
        code: &AuthorizationCode,
    ) -> Result<AccessToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", grant.redirect_uri.as_str()),
            ("client_id", grant.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let resp = self
            .http
            .post(self.config.token_endpoint.clone())
            .form(&params)
            .send()
            .await
            .map_err(SnowmcpError::Http)?;

        let status = resp.status();
        let body = resp.text().await.map_err(SnowmcpError::Http)?;

        if !status.is_success() {
            tracing::error!("Token endpoint returned {}", status);
            return Err(SnowmcpError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let raw: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            SnowmcpError::TokenResponseMalformed(format!("token response is not JSON: {e}"))
        })?;

        raw.into_access_token()
    }
}

// ---------------------------------------------------------------------------
// Utility functions
// ---------------------------------------------------------------------------

/// Splits a redirect URI into the listener's bind host, port and path.
fn redirect_target(redirect_uri: &Url) -> Result<(String, u16, String)> {
    let host = redirect_uri
        .host_str()
        .ok_or_else(|| {
            SnowmcpError::Config(format!("redirect URI {redirect_uri} has no host"))
        })?
        // IPv6 literals come back bracketed.
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = redirect_uri.port_or_known_default().ok_or_else(|| {
        SnowmcpError::Config(format!("redirect URI {redirect_uri} has no port"))
    })?;
    Ok((host, port, redirect_uri.path().to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
