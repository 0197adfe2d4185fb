//! Request and response types for the pipeline.

use meridian_domain::{MeridianError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CachePolicy;
use crate::http::{HttpMethod, TransportResponse};

/// A logical API call handed to [`crate::pipeline::ApiClient`].
///
/// Paths are relative to the client's base URL and conventionally start
/// with `/`. Caching is opt-in per request: without a policy the pipeline
/// never consults or fills the cache for the call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub cache: Option<CachePolicy>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: Vec::new(), body: None, cache: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
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

    /// Attach a JSON body and the matching content type.
    pub fn with_json<T: Serialize>(self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| MeridianError::Unknown(format!("failed to encode request body: {err}")))?;
        Ok(self.with_header("Content-Type", "application/json").with_body(bytes))
    }

    /// Opt this request into the response cache.
    #[must_use]
    pub fn with_cache(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }
}

/// Response returned to the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Whether the payload came from the cache instead of the transport.
    pub from_cache: bool,
}

impl ApiResponse {
    pub(crate) fn from_transport(response: TransportResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            from_cache: false,
        }
    }

    /// A cached payload presented as a successful response.
    pub(crate) fn from_cached_payload(payload: Vec<u8>) -> Self {
        Self { status: 200, headers: Vec::new(), body: payload, from_cache: true }
    }

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

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|err| MeridianError::Unknown(format!("failed to decode response body: {err}")))
    }

    /// Body as text, lossily converted.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Allow-list entry marking an endpoint as a cacheable read.
///
/// Matches on method plus path prefix at a segment boundary: the prefix
/// `/v1/course` matches `/v1/course` and `/v1/course/category` but not
/// `/v1/courses`. Query strings are ignored for matching; they still
/// contribute to the cache key.
#[derive(Debug, Clone)]
pub struct CacheableRoute {
    method: HttpMethod,
    path_prefix: String,
}

impl CacheableRoute {
    pub fn new(method: HttpMethod, path_prefix: impl Into<String>) -> Self {
        Self { method, path_prefix: path_prefix.into() }
    }

    /// Cacheable GET endpoint, the common case.
    pub fn get(path_prefix: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path_prefix)
    }

    /// Whether a request matches this route.
    pub fn matches(&self, method: HttpMethod, path: &str) -> bool {
        if self.method != method {
            return false;
        }
        let path = match path.split_once('?') {
            Some((before_query, _)) => before_query,
            None => path,
        };
        match path.strip_prefix(&self.path_prefix) {
            Some(rest) => {
                rest.is_empty() || rest.starts_with('/') || self.path_prefix.ends_with('/')
            }
            None => false,
        }
    }
}
