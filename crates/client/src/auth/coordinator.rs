//! Single-flight token refresh coordination.
//!
//! Many requests can fail authentication at once; only one refresh call may
//! go out. The coordinator runs an `Idle -> Refreshing -> Idle` state
//! machine guarded by a mutex: the first failure starts a refresh cycle,
//! later failures enqueue a continuation and await the shared outcome. The
//! cycle task drains the queue in arrival order, re-issuing each captured
//! request with the renewed token, so callers complete in the order their
//! failures were observed. A failed cycle clears stored tokens and fires the
//! unauthenticated callback exactly once, no matter how many callers waited.
//!
//! The cycle runs on a spawned task, so a caller abandoning its own wait
//! cannot interrupt the shared refresh or strand the other waiters.

use std::collections::VecDeque;
use std::sync::Arc;

use meridian_domain::{MeridianError, Result};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use super::store::TokenStore;
use super::types::{RefreshParseFn, RefreshPayloadFn, TokenKind, UnauthenticatedFn};
use crate::errors::BuildError;
use crate::http::{HttpMethod, Transport, TransportRequest, TransportResponse};

/// Outcome delivered to a queued retry continuation.
enum WaiterOutcome {
    /// Refresh succeeded; the captured request was re-issued and this is
    /// its result.
    Retried(Result<TransportResponse>),
    /// Refresh failed; the caller surfaces its own original auth error.
    RefreshFailed,
}

struct Waiter {
    request: TransportRequest,
    tx: oneshot::Sender<WaiterOutcome>,
}

/// Callers of [`RefreshCoordinator::refresh_token`] that joined an
/// in-flight cycle; they only need the outcome, not a retry.
type Observer = oneshot::Sender<Option<String>>;

enum RefreshState {
    Idle,
    Refreshing { waiters: VecDeque<Waiter>, observers: Vec<Observer> },
}

/// Refresh endpoint description supplied by the host as a complete set.
struct RefreshEndpoint {
    url: String,
    build_payload: RefreshPayloadFn,
    parse_response: RefreshParseFn,
}

/// Coordinates bearer-token renewal across concurrent requests.
///
/// Constructed through [`RefreshCoordinator::builder`]; hold it in an
/// [`Arc`] and share it with the pipeline.
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    refresh: Option<RefreshEndpoint>,
    on_unauthenticated: Option<UnauthenticatedFn>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Start building a coordinator.
    pub fn builder() -> RefreshCoordinatorBuilder {
        RefreshCoordinatorBuilder::default()
    }

    /// Renew the access token, sharing any in-flight refresh cycle.
    ///
    /// Returns the new access token, or `None` when refresh is not
    /// configured, no refresh token is stored, or the refresh call failed.
    /// Every `None` path has already cleared stored tokens and fired the
    /// unauthenticated callback for its cycle.
    pub async fn refresh_token(self: Arc<Self>) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        let start_cycle = {
            let mut state = self.state.lock();
            match &mut *state {
                RefreshState::Refreshing { observers, .. } => {
                    debug!("joining in-flight token refresh");
                    observers.push(tx);
                    false
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: VecDeque::new(),
                        observers: vec![tx],
                    };
                    true
                }
            }
        };

        if start_cycle {
            Arc::clone(&self).spawn_cycle();
        }

        rx.await.unwrap_or(None)
    }

    /// Handle an authentication failure observed by the pipeline.
    ///
    /// Queues `request` for re-issue with the renewed token. If no refresh
    /// is in flight this starts one; otherwise the request waits its turn.
    /// On refresh success the result of the retried request is returned; on
    /// refresh failure the caller gets back `original_error` unchanged.
    pub async fn handle_auth_failure(
        self: Arc<Self>,
        request: TransportRequest,
        original_error: MeridianError,
    ) -> Result<TransportResponse> {
        let (tx, rx) = oneshot::channel();
        let start_cycle = {
            let mut state = self.state.lock();
            match &mut *state {
                RefreshState::Refreshing { waiters, .. } => {
                    debug!(url = %request.url, "queuing retry behind in-flight token refresh");
                    waiters.push_back(Waiter { request, tx });
                    false
                }
                RefreshState::Idle => {
                    let mut waiters = VecDeque::new();
                    waiters.push_back(Waiter { request, tx });
                    *state = RefreshState::Refreshing { waiters, observers: Vec::new() };
                    true
                }
            }
        };

        if start_cycle {
            info!("authentication failure observed; starting token refresh cycle");
            Arc::clone(&self).spawn_cycle();
        }

        match rx.await {
            Ok(WaiterOutcome::Retried(result)) => result,
            Ok(WaiterOutcome::RefreshFailed) | Err(_) => Err(original_error),
        }
    }

    /// Delete both stored tokens without firing the unauthenticated
    /// callback. For host-driven logout.
    pub fn clear_tokens(&self) {
        debug!("clearing stored tokens");
        self.store.delete();
    }

    fn spawn_cycle(self: Arc<Self>) {
        tokio::spawn(async move {
            let outcome = self.run_refresh().await;
            self.settle(outcome).await;
        });
    }

    /// Perform the refresh network call and persist or clear tokens.
    ///
    /// Exactly one invocation per `Idle -> Refreshing` transition.
    #[instrument(skip_all)]
    async fn run_refresh(&self) -> Option<String> {
        let Some(endpoint) = &self.refresh else {
            debug!("token refresh not configured; clearing tokens");
            self.fail_unauthenticated();
            return None;
        };

        let refresh_token = self.store.read(TokenKind::Refresh);
        if refresh_token.is_empty() {
            debug!("no refresh token stored; clearing tokens");
            self.fail_unauthenticated();
            return None;
        }

        let payload = (endpoint.build_payload)(&refresh_token);
        let request = TransportRequest::new(HttpMethod::Post, endpoint.url.clone())
            .with_header("Content-Type", "application/json")
            .with_body(serde_json::to_vec(&payload).unwrap_or_default());

        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => {
                let parsed = (endpoint.parse_response)(&response.body);
                match parsed.access_token.filter(|token| !token.is_empty()) {
                    Some(access) => {
                        let refresh = parsed
                            .refresh_token
                            .filter(|token| !token.is_empty())
                            .unwrap_or(refresh_token);
                        self.store.write(TokenKind::Access, &access);
                        self.store.write(TokenKind::Refresh, &refresh);
                        info!("access token renewed");
                        Some(access)
                    }
                    None => {
                        warn!("refresh response yielded no access token");
                        self.fail_unauthenticated();
                        None
                    }
                }
            }
            Ok(response) => {
                warn!(status = response.status, "token refresh request rejected");
                self.fail_unauthenticated();
                None
            }
            Err(err) => {
                warn!(error = %err, "token refresh transport failure");
                self.fail_unauthenticated();
                None
            }
        }
    }

    /// Clear tokens and fire the unauthenticated callback.
    ///
    /// Called once per failed cycle, never once per waiter.
    fn fail_unauthenticated(&self) {
        self.store.delete();
        if let Some(callback) = &self.on_unauthenticated {
            callback();
        }
    }

    /// Resolve every queued continuation and return the state to idle.
    ///
    /// Retries execute sequentially in arrival order, so waiters complete
    /// in the order their failures were observed. Continuations that arrive
    /// while draining are picked up by the next pass; the state flips back
    /// to `Idle` only once the queue is observed empty under the lock.
    async fn settle(&self, outcome: Option<String>) {
        loop {
            let (waiters, observers) = {
                let mut state = self.state.lock();
                match &mut *state {
                    RefreshState::Refreshing { waiters, observers } => {
                        if waiters.is_empty() && observers.is_empty() {
                            *state = RefreshState::Idle;
                            return;
                        }
                        (std::mem::take(waiters), std::mem::take(observers))
                    }
                    RefreshState::Idle => return,
                }
            };

            for observer in observers {
                let _ = observer.send(outcome.clone());
            }

            for Waiter { request, tx } in waiters {
                match &outcome {
                    Some(token) => {
                        let retry = request.with_bearer(token);
                        let result = self.transport.send(&retry).await;
                        let _ = tx.send(WaiterOutcome::Retried(result));
                    }
                    None => {
                        let _ = tx.send(WaiterOutcome::RefreshFailed);
                    }
                }
            }
        }
    }

    #[cfg(test)]
    fn queued(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters, .. } => waiters.len(),
        }
    }
}

/// Builder for [`RefreshCoordinator`].
///
/// The refresh endpoint, payload builder, and response parser come as a
/// complete set or not at all; supplying only part of the set is a
/// construction-time error. Without the set, refresh is disabled and every
/// auth failure clears tokens immediately.
#[derive(Default)]
pub struct RefreshCoordinatorBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn TokenStore>>,
    refresh_url: Option<String>,
    build_payload: Option<RefreshPayloadFn>,
    parse_response: Option<RefreshParseFn>,
    on_unauthenticated: Option<UnauthenticatedFn>,
}

impl RefreshCoordinatorBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// URL of the token refresh endpoint.
    pub fn refresh_url(mut self, url: impl Into<String>) -> Self {
        self.refresh_url = Some(url.into());
        self
    }

    /// Function building the refresh request body from the stored refresh
    /// token.
    pub fn payload_builder<F>(mut self, build: F) -> Self
    where
        F: Fn(&str) -> serde_json::Value + Send + Sync + 'static,
    {
        self.build_payload = Some(Arc::new(build));
        self
    }

    /// Function extracting token material from the raw refresh response
    /// body.
    pub fn response_parser<F>(mut self, parse: F) -> Self
    where
        F: Fn(&[u8]) -> super::types::RenewedTokens + Send + Sync + 'static,
    {
        self.parse_response = Some(Arc::new(parse));
        self
    }

    /// Callback fired exactly once per failed refresh cycle, after stored
    /// tokens are cleared.
    pub fn on_unauthenticated<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_unauthenticated = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> std::result::Result<RefreshCoordinator, BuildError> {
        let transport = self.transport.ok_or(BuildError::MissingComponent("transport"))?;
        let store = self.store.ok_or(BuildError::MissingComponent("token store"))?;

        let refresh = match (self.refresh_url, self.build_payload, self.parse_response) {
            (Some(url), Some(build_payload), Some(parse_response)) => {
                Some(RefreshEndpoint { url, build_payload, parse_response })
            }
            (None, None, None) => None,
            (url, build_payload, parse_response) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push("refresh_url");
                }
                if build_payload.is_none() {
                    missing.push("payload_builder");
                }
                if parse_response.is_none() {
                    missing.push("response_parser");
                }
                return Err(BuildError::IncompleteRefresh(format!(
                    "missing {}",
                    missing.join(", ")
                )));
            }
        };

        Ok(RefreshCoordinator {
            transport,
            store,
            refresh,
            on_unauthenticated: self.on_unauthenticated,
            state: Mutex::new(RefreshState::Idle),
        })
    }
}
