use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use meridian_domain::{MeridianError, Result};
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

use crate::errors::{BuildError, IntoMeridianError};

/// HTTP methods supported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Canonical upper-case name, as used in cache keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// A fully assembled outbound request.
///
/// Owns its body bytes so it can be re-issued verbatim (token retry, bounded
/// transport retry) without cloning restrictions.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), body: None }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace any Authorization header with a bearer token.
    ///
    /// An empty token removes the header entirely rather than sending
    /// `Bearer ` with nothing behind it.
    #[must_use]
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        if !token.is_empty() {
            self.headers.push(("Authorization".into(), format!("Bearer {token}")));
        }
        self
    }

    /// First header value matching `name`, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A transport-level response: status, headers, raw body.
///
/// Status classification is the pipeline's job; the transport reports
/// whatever the server said.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Sends requests over the wire.
///
/// One interface, implementations selected at construction; the pipeline and
/// the refresh coordinator never touch an HTTP library directly.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue the request and return the server's response.
    ///
    /// Errors are already classified (`NoNetwork`, `Timeout`, `Unknown`);
    /// non-2xx statuses are returned as responses, not errors.
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse>;
}

/// Reqwest-backed transport with bounded retry and backoff.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl ReqwestTransport {
    /// Start building a transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> std::result::Result<Self, BuildError> {
        Self::builder().build()
    }

    fn assemble(&self, request: &TransportRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(request.method.into(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let method = request.method;
            let url = request.url.as_str();
            debug!(attempt = attempt + 1, %method, url, "sending HTTP request");

            match self.assemble(request).send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, url, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    let headers = response
                        .headers()
                        .iter()
                        .map(|(name, value)| {
                            (
                                name.as_str().to_owned(),
                                String::from_utf8_lossy(value.as_bytes()).into_owned(),
                            )
                        })
                        .collect();
                    let body =
                        response.bytes().await.map_err(IntoMeridianError::into_meridian)?.to_vec();

                    return Ok(TransportResponse { status: status.as_u16(), headers, body });
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, url, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(err.into_meridian());
                }
            }
        }

        Err(MeridianError::Unknown("transport exhausted retries without producing a result".into()))
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
            default_headers: None,
        }
    }
}

impl ReqwestTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> std::result::Result<ReqwestTransport, BuildError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| BuildError::HttpInit(err.to_string()))?;

        Ok(ReqwestTransport {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn transport_with_defaults() -> ReqwestTransport {
        ReqwestTransport::builder()
            .base_backoff(Duration::from_millis(10))
            .max_attempts(3)
            .build()
            .expect("transport")
    }

    #[test]
    fn bearer_helper_replaces_existing_header() {
        let request = TransportRequest::new(HttpMethod::Get, "http://localhost/a")
            .with_bearer("old-token")
            .with_bearer("new-token");

        assert_eq!(request.header("authorization"), Some("Bearer new-token"));
        let auth_headers = request
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .count();
        assert_eq!(auth_headers, 1);
    }

    #[test]
    fn bearer_helper_skips_empty_token() {
        let request =
            TransportRequest::new(HttpMethod::Get, "http://localhost/a").with_bearer("");

        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = TransportRequest::new(HttpMethod::Post, "http://localhost/a")
            .with_header("Content-Type", "application/json");

        assert_eq!(request.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn returns_successful_response_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_with_defaults();
        let request = TransportRequest::new(HttpMethod::Get, server.uri());
        let response = transport.send(&request).await.expect("response");

        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(response.body, b"ok");
    }

    #[tokio::test]
    async fn forwards_request_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-probe", "1"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_with_defaults();
        let request = TransportRequest::new(HttpMethod::Post, server.uri())
            .with_header("x-probe", "1")
            .with_body(b"{\"k\":true}".to_vec());
        let response = transport.send(&request).await.expect("response");

        assert_eq!(response.status, 201);
        let received = server.received_requests().await.unwrap();
        assert_eq!(received[0].body, b"{\"k\":true}".to_vec());
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                let current = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    ResponseTemplate::new(500)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let transport = transport_with_defaults();
        let request = TransportRequest::new(HttpMethod::Get, server.uri());
        let response = transport.send(&request).await.expect("response");

        assert_eq!(response.status, 200);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_with_defaults();
        let request = TransportRequest::new(HttpMethod::Get, server.uri());
        let response = transport.send(&request).await.expect("response");

        assert_eq!(response.status, 404);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn maps_refused_connection_to_no_network() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        let url = format!("http://{addr}");

        let transport = ReqwestTransport::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .expect("transport");

        let request = TransportRequest::new(HttpMethod::Get, url);
        let result = transport.send(&request).await;
        assert!(matches!(result, Err(MeridianError::NoNetwork(_))));
    }
}
