//! Request pipeline orchestration.
//!
//! [`ApiClient`] runs each logical call through one fixed sequence: attach
//! the current access token, consult the cache for allow-listed reads,
//! dispatch to the transport, classify the outcome, and recover where the
//! contract allows. Authentication failures are delegated to the
//! [`RefreshCoordinator`]; transport failures fall back to the cache
//! before propagating; successful cacheable responses are written through
//! before the caller sees them.

use std::sync::Arc;

use meridian_domain::{MeridianError, Result};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::request::{ApiRequest, ApiResponse, CacheableRoute};
use crate::auth::{RefreshCoordinator, TokenKind, TokenStore};
use crate::cache::TieredCache;
use crate::connectivity::{ConnectivityOracle, StaticConnectivity};
use crate::errors::BuildError;
use crate::http::{HttpMethod, Transport, TransportRequest, TransportResponse};

fn status_error(response: &TransportResponse) -> MeridianError {
    MeridianError::from_status(
        response.status,
        String::from_utf8_lossy(&response.body).into_owned(),
    )
}

/// Client-side request pipeline.
///
/// Construct one per API surface through [`ApiClient::builder`] and share
/// it; every collaborator is injected, so hosts and tests can swap the
/// transport, stores, and connectivity oracle freely.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    coordinator: Arc<RefreshCoordinator>,
    cache: Arc<TieredCache>,
    connectivity: Arc<dyn ConnectivityOracle>,
    token_store: Arc<dyn TokenStore>,
    base_url: Url,
    cacheable_routes: Vec<CacheableRoute>,
}

impl ApiClient {
    /// Start building a client.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// The response cache, for host-driven maintenance.
    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// The refresh coordinator, for explicit renewal or logout.
    pub fn coordinator(&self) -> Arc<RefreshCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Execute a logical API call.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let correlation_id = Uuid::new_v4();
        let url = self.resolve_url(&request.path)?;

        let cache_key = match &request.cache {
            Some(_) if self.is_cacheable(request.method, &request.path) => {
                Some(self.cache.request_key(request.method, url.as_str()))
            }
            _ => None,
        };

        if let (Some(key), Some(policy)) = (&cache_key, &request.cache) {
            let consult_cache = !policy.offline_only || !self.connectivity.is_online();
            if consult_cache {
                if let Some(payload) = self.cache.get(key).await {
                    debug!(%correlation_id, path = %request.path, "serving response from cache");
                    return Ok(ApiResponse::from_cached_payload(payload));
                }
            }
        }

        let transport_request = self.assemble(&request, url.as_str());
        debug!(%correlation_id, method = %request.method, path = %request.path, "dispatching request");

        let response = match self.transport.send(&transport_request).await {
            Ok(response) => response,
            Err(err) => {
                // Last resort before surfacing the failure: anything cached
                // for this request, expired or not
                if let Some(key) = &cache_key {
                    if let Some(payload) = self.cache.get_allow_stale(key).await {
                        warn!(%correlation_id, error = %err, "transport failed; serving cached payload");
                        return Ok(ApiResponse::from_cached_payload(payload));
                    }
                }
                return Err(err);
            }
        };

        let response = if response.is_success() {
            response
        } else {
            let error = status_error(&response);
            if !error.is_auth_failure() {
                return Err(error);
            }

            debug!(%correlation_id, status = response.status, "authentication failure; delegating to token refresh");
            let retried =
                Arc::clone(&self.coordinator).handle_auth_failure(transport_request, error).await?;
            if !retried.is_success() {
                return Err(status_error(&retried));
            }
            retried
        };

        if let (Some(key), Some(policy)) = (&cache_key, &request.cache) {
            self.cache.set(key, response.body.clone(), policy).await;
        }

        Ok(ApiResponse::from_transport(response))
    }

    /// GET a path.
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.execute(ApiRequest::get(path)).await
    }

    /// POST a JSON body to a path.
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.execute(ApiRequest::post(path).with_json(body)?).await
    }

    /// PUT a JSON body to a path.
    pub async fn put<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.execute(ApiRequest::put(path).with_json(body)?).await
    }

    /// DELETE a path.
    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.execute(ApiRequest::delete(path)).await
    }

    fn resolve_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| MeridianError::Unknown(format!("invalid request path {path:?}: {err}")))
    }

    fn is_cacheable(&self, method: HttpMethod, path: &str) -> bool {
        self.cacheable_routes.iter().any(|route| route.matches(method, path))
    }

    fn assemble(&self, request: &ApiRequest, url: &str) -> TransportRequest {
        let mut transport_request = TransportRequest::new(request.method, url);
        for (name, value) in &request.headers {
            transport_request = transport_request.with_header(name.clone(), value.clone());
        }
        if let Some(body) = &request.body {
            transport_request = transport_request.with_body(body.clone());
        }
        transport_request.with_bearer(&self.token_store.read(TokenKind::Access))
    }
}

/// Builder for [`ApiClient`].
///
/// The base URL, transport, coordinator, cache, and token store are
/// required. The connectivity oracle defaults to always-online; the
/// cacheable-route allow-list defaults to empty, which disables caching.
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    coordinator: Option<Arc<RefreshCoordinator>>,
    cache: Option<Arc<TieredCache>>,
    connectivity: Option<Arc<dyn ConnectivityOracle>>,
    token_store: Option<Arc<dyn TokenStore>>,
    cacheable_routes: Vec<CacheableRoute>,
}

impl ApiClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn cache(mut self, cache: Arc<TieredCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn ConnectivityOracle>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Add one endpoint to the cacheable-read allow-list.
    pub fn cacheable_route(mut self, route: CacheableRoute) -> Self {
        self.cacheable_routes.push(route);
        self
    }

    /// Add several endpoints to the cacheable-read allow-list.
    pub fn cacheable_routes(mut self, routes: impl IntoIterator<Item = CacheableRoute>) -> Self {
        self.cacheable_routes.extend(routes);
        self
    }

    pub fn build(self) -> std::result::Result<ApiClient, BuildError> {
        let base_url = self.base_url.ok_or(BuildError::MissingComponent("base url"))?;
        let base_url =
            Url::parse(&base_url).map_err(|err| BuildError::InvalidBaseUrl(err.to_string()))?;
        let transport = self.transport.ok_or(BuildError::MissingComponent("transport"))?;
        let coordinator =
            self.coordinator.ok_or(BuildError::MissingComponent("refresh coordinator"))?;
        let cache = self.cache.ok_or(BuildError::MissingComponent("cache"))?;
        let token_store = self.token_store.ok_or(BuildError::MissingComponent("token store"))?;
        let connectivity =
            self.connectivity.unwrap_or_else(|| Arc::new(StaticConnectivity::online()));

        Ok(ApiClient {
            transport,
            coordinator,
            cache,
            connectivity,
            token_store,
            base_url,
            cacheable_routes: self.cacheable_routes,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for pipeline::client.
    use std::time::Duration;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::cache::{CachePolicy, SqliteCacheStore};
    use crate::connectivity::SharedConnectivity;
    use crate::http::ReqwestTransport;

    struct Harness {
        server: MockServer,
        store: Arc<MemoryTokenStore>,
        connectivity: SharedConnectivity,
        client: ApiClient,
    }

    async fn harness(routes: Vec<CacheableRoute>) -> Harness {
        // A dedicated (non-pooled) server: dropping it must close the
        // listener so tests can simulate transport failure
        let server = MockServer::builder().start().await;
        let transport: Arc<dyn Transport> = Arc::new(
            ReqwestTransport::builder()
                .max_attempts(1)
                .timeout(Duration::from_secs(5))
                .build()
                .expect("transport"),
        );
        let store = Arc::new(MemoryTokenStore::new());
        let coordinator = Arc::new(
            RefreshCoordinator::builder()
                .transport(transport.clone())
                .token_store(store.clone())
                .refresh_url(format!("{}/v1/auth/refresh", server.uri()))
                .payload_builder(|refresh| serde_json::json!({ "refresh_token": refresh }))
                .response_parser(|body| serde_json::from_slice(body).unwrap_or_default())
                .build()
                .expect("coordinator"),
        );
        let connectivity = SharedConnectivity::new(true);
        let cache_store = Arc::new(SqliteCacheStore::open_in_memory().expect("cache store"));
        let cache =
            Arc::new(TieredCache::new(cache_store, Arc::new(connectivity.clone()), "meridian"));
        let client = ApiClient::builder()
            .base_url(server.uri())
            .transport(transport)
            .coordinator(coordinator)
            .cache(cache)
            .connectivity(Arc::new(connectivity.clone()))
            .token_store(store.clone())
            .cacheable_routes(routes)
            .build()
            .expect("client");

        Harness { server, store, connectivity, client }
    }

    /// Validates `ApiClientBuilder::build` behavior for the missing
    /// component scenario.
    ///
    /// Assertions:
    /// - Ensures each missing required component is rejected by name.
    /// - Ensures an unparseable base URL is rejected.
    #[test]
    fn test_builder_requires_components() {
        let missing = ApiClient::builder().build();
        assert!(matches!(missing, Err(BuildError::MissingComponent("base url"))));

        let invalid = ApiClient::builder().base_url("not a url").build();
        assert!(matches!(invalid, Err(BuildError::InvalidBaseUrl(_))));
    }

    /// Validates `ApiClient::get` behavior for the plain request scenario.
    ///
    /// Assertions:
    /// - Confirms the response body and status come back untouched.
    /// - Ensures the response is not marked as cached.
    #[tokio::test]
    async fn test_get_returns_response() {
        let h = harness(Vec::new()).await;
        Mock::given(method("GET"))
            .and(path("/v1/items"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
            .expect(1)
            .mount(&h.server)
            .await;

        let response = h.client.get("/v1/items").await.expect("response");

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"[1,2,3]");
        assert!(!response.from_cache);
    }

    /// Validates `ApiClient::execute` behavior for the bearer attachment
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the stored access token rides as a bearer header.
    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let h = harness(Vec::new()).await;
        h.store.write(TokenKind::Access, "token-1");
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .and(header("Authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&h.server)
            .await;

        h.client.get("/v1/me").await.expect("response");
    }

    /// Validates `ApiClient::execute` behavior for the empty token
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures no Authorization header is sent when no token is stored.
    #[tokio::test]
    async fn test_empty_token_sends_no_authorization_header() {
        let h = harness(Vec::new()).await;
        Mock::given(method("GET"))
            .and(path("/v1/public"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&h.server)
            .await;

        h.client.get("/v1/public").await.expect("response");

        let received = h.server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    /// Validates `ApiClient::execute` behavior for the write-through and
    /// cache hit scenario.
    ///
    /// Assertions:
    /// - Confirms the first call reaches the transport and the second is
    ///   served from cache.
    /// - Confirms both calls return the same payload.
    #[tokio::test]
    async fn test_cache_hit_short_circuits_transport() {
        let h = harness(vec![CacheableRoute::get("/v1/course")]).await;
        Mock::given(method("GET"))
            .and(path("/v1/course/category"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[\"math\"]"))
            .expect(1)
            .mount(&h.server)
            .await;

        let request = ApiRequest::get("/v1/course/category")
            .with_cache(CachePolicy::ttl(Duration::from_secs(600)));

        let first = h.client.execute(request.clone()).await.expect("first");
        assert!(!first.from_cache);

        let second = h.client.execute(request).await.expect("second");
        assert!(second.from_cache);
        assert_eq!(first.body, second.body);
    }

    /// Validates `ApiClient::execute` behavior for the auth failure retry
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms a 401 triggers one refresh and one retried request.
    /// - Confirms the renewed token pair is persisted.
    #[tokio::test]
    async fn test_auth_failure_refreshes_and_retries() {
        let h = harness(Vec::new()).await;
        h.store.write(TokenKind::Access, "stale");
        h.store.write(TokenKind::Refresh, "refresh-1");

        Mock::given(method("GET"))
            .and(path("/v1/data"))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "refresh_token": "refresh-2",
            })))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/data"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&h.server)
            .await;

        let response = h.client.get("/v1/data").await.expect("response");

        assert_eq!(response.body, b"ok");
        assert_eq!(h.store.read(TokenKind::Access), "fresh");
        assert_eq!(h.store.read(TokenKind::Refresh), "refresh-2");
    }

    /// Validates `ApiClient::execute` behavior for the upstream
    /// unavailable scenario.
    ///
    /// Assertions:
    /// - Ensures a 503 surfaces as `ServerUnavailable`.
    /// - Ensures no refresh call is made.
    #[tokio::test]
    async fn test_503_bypasses_refresh() {
        let h = harness(Vec::new()).await;
        h.store.write(TokenKind::Access, "valid");
        h.store.write(TokenKind::Refresh, "refresh-1");

        Mock::given(method("GET"))
            .and(path("/v1/data"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&h.server)
            .await;

        let result = h.client.get("/v1/data").await;

        assert!(matches!(result, Err(MeridianError::ServerUnavailable(_))));
        assert_eq!(h.store.read(TokenKind::Access), "valid");
    }

    /// Validates `ApiClient::execute` behavior for the transport failure
    /// fallback scenario.
    ///
    /// Assertions:
    /// - Confirms an expired cached entry is served when the transport
    ///   fails, even while the oracle still reports online.
    #[tokio::test]
    async fn test_transport_failure_serves_stale_cache() {
        let h = harness(vec![CacheableRoute::get("/v1/course")]).await;
        Mock::given(method("GET"))
            .and(path("/v1/course/category"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[\"math\"]"))
            .expect(1)
            .mount(&h.server)
            .await;

        // Zero TTL: the write-through entry is immediately stale
        let request = ApiRequest::get("/v1/course/category")
            .with_cache(CachePolicy::ttl(Duration::ZERO));
        let primed = h.client.execute(request.clone()).await.expect("prime");
        assert!(!primed.from_cache);

        // Take the server down; the next dispatch fails at the transport
        drop(h.server);

        let fallback = h.client.execute(request).await.expect("fallback");
        assert!(fallback.from_cache);
        assert_eq!(fallback.body, b"[\"math\"]");
    }

    /// Validates `ApiClient::execute` behavior for the offline-only cache
    /// policy scenario.
    ///
    /// Assertions:
    /// - Ensures the cache is bypassed while online.
    /// - Confirms the cached payload is served once offline.
    #[tokio::test]
    async fn test_offline_only_policy_gates_cache_reads() {
        let h = harness(vec![CacheableRoute::get("/v1/course")]).await;
        Mock::given(method("GET"))
            .and(path("/v1/course/category"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[\"math\"]"))
            .expect(2)
            .mount(&h.server)
            .await;

        let request = ApiRequest::get("/v1/course/category")
            .with_cache(CachePolicy::offline_fallback(Duration::from_secs(600)));

        // Online: both calls reach the transport despite the cached copy
        let first = h.client.execute(request.clone()).await.expect("first");
        let second = h.client.execute(request.clone()).await.expect("second");
        assert!(!first.from_cache);
        assert!(!second.from_cache);

        h.connectivity.set_online(false);

        let offline = h.client.execute(request).await.expect("offline");
        assert!(offline.from_cache);
        assert_eq!(offline.body, b"[\"math\"]");
    }
}
