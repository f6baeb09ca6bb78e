//! Single-use OAuth redirect listener
//!
//! [`CallbackListener`] binds a local TCP socket, accepts exactly one HTTP
//! request, answers it with a static HTML page and hands the outcome to the
//! caller over a [`tokio::sync::oneshot`] channel owned by the listener. The
//! socket is closed as soon as the first HTTP request line arrives, so a
//! second browser request is refused rather than answered. Connections that
//! close or send nothing recognisable before that are dropped and do not
//! count as the request.
//!
//! The listener never logs; request details (including the authorization
//! code) stay out of the process logs.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{Result, SnowmcpError};

/// Upper bound on the request head the listener is willing to read.
const MAX_REQUEST_HEAD_BYTES: usize = 16 * 1024;

const HTML_SUCCESS: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Authentication Successful</title></head>
  <body>
    <h1>Authentication Successful</h1>
    <p>You can close this window now.</p>
  </body>
</html>"#;

const HTML_FAILURE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Authentication Failed</title></head>
  <body>
    <h1>Authentication Failed</h1>
    <p>No authorization code received. Please try again.</p>
  </body>
</html>"#;

// ---------------------------------------------------------------------------
// AuthorizationCode
// ---------------------------------------------------------------------------

/// An authorization code captured from the redirect query string.
///
/// The code is consumed by the token exchange and never persisted. Its
/// `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    /// Wraps a raw code value.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The raw code value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the redirect carried `code=` with no value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthorizationCode(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// CallbackListener
// ---------------------------------------------------------------------------

/// Outcome of the single request, sent from the accept task to the caller.
type CallbackOutcome<T = AuthorizationCode> = std::result::Result<T, SnowmcpError>;

/// A bound, single-request redirect listener.
///
/// Dropping the listener (for example when the caller's future is cancelled)
/// aborts the accept task, which releases the socket.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use snowmcp::mcp::auth::callback::CallbackListener;
///
/// # async fn example() -> snowmcp::error::Result<()> {
/// let listener = CallbackListener::bind("127.0.0.1", 0, "/oauth/callback").await?;
/// println!("redirect to http://{}/oauth/callback", listener.local_addr());
/// let code = listener.wait(Duration::from_secs(300)).await?;
/// # let _ = code;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CallbackListener {
    local_addr: SocketAddr,
    outcome_rx: oneshot::Receiver<CallbackOutcome>,
    task: JoinHandle<()>,
}

impl CallbackListener {
    /// Binds `bind_host:bind_port` and starts waiting for one request on
    /// `expected_path`.
    ///
    /// # Errors
    ///
    /// Returns [`SnowmcpError::ListenerBindFailed`] when the address cannot
    /// be bound (typically because the port is already in use).
    pub async fn bind(bind_host: &str, bind_port: u16, expected_path: &str) -> Result<Self> {
        let addr = format!("{bind_host}:{bind_port}");
        let listener = TcpListener::bind((bind_host, bind_port))
            .await
            .map_err(|source| SnowmcpError::ListenerBindFailed {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| SnowmcpError::ListenerBindFailed { addr, source })?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let expected_path = expected_path.to_string();
        let task = tokio::spawn(async move {
            let received = accept_request(&listener).await;
            // Stop listening before answering so later connections are refused.
            drop(listener);
            let outcome = match received {
                Ok((stream, request_line)) => {
                    respond(stream, &request_line, &expected_path).await
                }
                Err(e) => Err(e),
            };
            let _ = outcome_tx.send(outcome);
        });

        Ok(Self {
            local_addr,
            outcome_rx,
            task,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the single redirect request.
    ///
    /// # Errors
    ///
    /// - [`SnowmcpError::AuthorizationTimeout`] if nothing arrives in time.
    /// - [`SnowmcpError::AuthorizationDenied`] if the request carried no
    ///   `code` parameter or hit a different path.
    /// - [`SnowmcpError::Io`] if accepting fails or the response page cannot
    ///   be written.
    pub async fn wait(mut self, timeout: Duration) -> Result<AuthorizationCode> {
        match tokio::time::timeout(timeout, &mut self.outcome_rx).await {
            Ok(Ok(outcome)) => Ok(outcome?),
            Ok(Err(_)) => Err(SnowmcpError::AuthorizationDenied(
                "callback listener stopped before a request arrived".to_string(),
            )
            .into()),
            Err(_) => Err(SnowmcpError::AuthorizationTimeout {
                // Round up so sub-second waits do not report 0s.
                seconds: timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0),
            }
            .into()),
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Binds a listener and waits for the authorization code in one call.
///
/// # Errors
///
/// See [`CallbackListener::bind`] and [`CallbackListener::wait`].
pub async fn await_authorization_code(
    bind_host: &str,
    bind_port: u16,
    expected_path: &str,
    timeout: Duration,
) -> Result<AuthorizationCode> {
    CallbackListener::bind(bind_host, bind_port, expected_path)
        .await?
        .wait(timeout)
        .await
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

/// Accepts connections until one delivers an HTTP request line.
///
/// Connections are read concurrently, so an idle preconnect or a port probe
/// that closes without sending anything does not consume the listener.
async fn accept_request(listener: &TcpListener) -> CallbackOutcome<(TcpStream, String)> {
    let mut pending = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _peer) = accepted?;
                pending.spawn(read_request_head(stream));
            }
            Some(read) = pending.join_next(), if !pending.is_empty() => {
                if let Ok(Some(request)) = read {
                    return Ok(request);
                }
            }
        }
    }
}

/// Reads the request line and drains the headers.
///
/// Returns `None` when the peer closed, sent something that is not an HTTP
/// request line, or broke the connection mid-read.
async fn read_request_head(stream: TcpStream) -> Option<(TcpStream, String)> {
    let mut reader = BufReader::new(stream.take(MAX_REQUEST_HEAD_BYTES as u64));

    let mut request_line = String::new();
    let n = reader.read_line(&mut request_line).await.ok()?;
    if n == 0 || !is_request_line(&request_line) {
        return None;
    }

    // Drain headers up to the blank line so the browser sees a clean reply.
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) if line.trim_end().is_empty() => break,
            Ok(_) => {}
        }
    }

    Some((reader.into_inner().into_inner(), request_line))
}

/// An uppercase method token followed by a request target.
fn is_request_line(line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(method), Some(_)) => method.bytes().all(|b| b.is_ascii_uppercase()),
        _ => false,
    }
}

/// Writes the response page and returns the classified outcome.
async fn respond(
    mut stream: TcpStream,
    request_line: &str,
    expected_path: &str,
) -> CallbackOutcome {
    let outcome = classify_request(request_line, expected_path);

    let (status, body) = match outcome {
        Ok(_) => ("200 OK", HTML_SUCCESS),
        Err(_) => ("400 Bad Request", HTML_FAILURE),
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    stream.write_all(response.as_bytes()).await?;
    let _ = stream.shutdown().await;

    outcome
}

/// Decides the outcome from an HTTP request line such as
/// `GET /oauth/callback?code=abc HTTP/1.1`.
fn classify_request(request_line: &str, expected_path: &str) -> CallbackOutcome {
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");

    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    if method != "GET" {
        return Err(SnowmcpError::AuthorizationDenied(format!(
            "unexpected {method} request on the callback listener"
        )));
    }
    if path != expected_path {
        return Err(SnowmcpError::AuthorizationDenied(format!(
            "redirect hit {path}, expected {expected_path}"
        )));
    }

    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    if let Some(code) = params.get("code") {
        return Ok(AuthorizationCode::new(code.clone()));
    }

    let reason = match (params.get("error"), params.get("error_description")) {
        (Some(error), Some(description)) => format!("{error}: {description}"),
        (Some(error), None) => error.clone(),
        _ => "no authorization code in redirect".to_string(),
    };
    Err(SnowmcpError::AuthorizationDenied(reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_extracts_code() {
        let code = classify_request(
            "GET /oauth/callback?code=abc123 HTTP/1.1\r\n",
            "/oauth/callback",
        )
        .unwrap();
        assert_eq!(code.as_str(), "abc123");
    }

    #[test]
    fn test_classify_percent_decodes_code() {
        let code =
            classify_request("GET /cb?code=a%2Fb%3Dc&state=x HTTP/1.1", "/cb").unwrap();
        assert_eq!(code.as_str(), "a/b=c");
    }

    #[test]
    fn test_classify_keeps_empty_code() {
        let code = classify_request("GET /cb?code= HTTP/1.1", "/cb").unwrap();
        assert!(code.is_empty());
    }

    #[test]
    fn test_classify_error_param_is_denied_with_reason() {
        let err = classify_request(
            "GET /cb?error=access_denied&error_description=User+declined HTTP/1.1",
            "/cb",
        )
        .unwrap_err();
        match err {
            SnowmcpError::AuthorizationDenied(reason) => {
                assert_eq!(reason, "access_denied: User declined")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_missing_query_is_denied() {
        let err = classify_request("GET /cb HTTP/1.1", "/cb").unwrap_err();
        assert!(matches!(err, SnowmcpError::AuthorizationDenied(_)));
    }

    #[test]
    fn test_classify_wrong_path_is_denied() {
        let err = classify_request("GET /favicon.ico HTTP/1.1", "/cb").unwrap_err();
        match err {
            SnowmcpError::AuthorizationDenied(reason) => assert!(reason.contains("/favicon.ico")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_non_get_is_denied() {
        let err = classify_request("POST /cb?code=abc HTTP/1.1", "/cb").unwrap_err();
        assert!(matches!(err, SnowmcpError::AuthorizationDenied(_)));
    }

    #[test]
    fn test_authorization_code_debug_is_redacted() {
        let code = AuthorizationCode::new("super-secret");
        let debug = format!("{code:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[tokio::test]
    async fn test_bind_port_zero_reports_assigned_port() {
        let listener = CallbackListener::bind("127.0.0.1", 0, "/cb").await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_wait_times_out_without_request() {
        let listener = CallbackListener::bind("127.0.0.1", 0, "/cb").await.unwrap();
        let err = listener.wait(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SnowmcpError>(),
            Some(SnowmcpError::AuthorizationTimeout { seconds: 1 })
        ));
    }

    #[test]
    fn test_is_request_line() {
        assert!(is_request_line("GET /cb?code=abc HTTP/1.1\r\n"));
        assert!(is_request_line("POST /cb HTTP/1.1"));
        assert!(!is_request_line(""));
        assert!(!is_request_line("\r\n"));
        assert!(!is_request_line("GET"));
        assert!(!is_request_line("hello there"));
    }

    #[tokio::test]
    async fn test_dropping_listener_releases_port() {
        let listener = CallbackListener::bind("127.0.0.1", 0, "/cb").await.unwrap();
        let port = listener.local_addr().port();
        drop(listener);
        // Give the runtime a chance to run the abort.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let rebound = CallbackListener::bind("127.0.0.1", port, "/cb").await;
        assert!(rebound.is_ok(), "port {port} should be free after drop");
    }
}
