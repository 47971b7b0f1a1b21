//! Authenticated request pipeline.
//!
//! Every backend call made through [`AuthenticatedClient`] carries the
//! current bearer token. A 401 on a protected endpoint triggers one
//! coordinated refresh and exactly one retry.

use std::sync::Arc;

use async_trait::async_trait;
use galleria_domain::{AuthError, RequestSpec, ResponseSpec};
use tracing::{debug, warn};

use crate::auth::{RefreshCoordinator, TokenStore};
use crate::ports::{ApiClient, HttpClient, TerminationReason};
use crate::ApplicationResult;

/// Login endpoint. Never triggers a refresh.
pub const LOGIN_ENDPOINT: &str = "/api/login/jwt";

/// Refresh endpoint. Never triggers a refresh.
pub const REFRESH_ENDPOINT: &str = "/api/refresh-token";

/// Which endpoints skip credentials and which skip 401 handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPolicy {
    public: Vec<String>,
    never_refresh: Vec<String>,
}

impl EndpointPolicy {
    /// Creates a policy with the given credential-free endpoints.
    #[must_use]
    pub fn new(public: Vec<String>) -> Self {
        Self {
            public,
            never_refresh: vec![LOGIN_ENDPOINT.to_string(), REFRESH_ENDPOINT.to_string()],
        }
    }

    /// Returns true if `request` is sent without credentials or interception.
    #[must_use]
    pub fn is_public(&self, request: &RequestSpec) -> bool {
        self.public.iter().any(|e| request.targets(e))
    }

    /// Returns true if a 401 from `request` must be passed through untouched.
    #[must_use]
    pub fn is_refresh_exempt(&self, request: &RequestSpec) -> bool {
        self.never_refresh.iter().any(|e| request.targets(e))
    }
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        Self::new(vec!["/api/logout".to_string()])
    }
}

/// [`ApiClient`] that attaches credentials and recovers from expired tokens.
pub struct AuthenticatedClient {
    http: Arc<dyn HttpClient>,
    coordinator: Arc<RefreshCoordinator>,
    policy: EndpointPolicy,
}

impl AuthenticatedClient {
    /// Wraps the raw client.
    #[must_use]
    pub fn new(
        http: Arc<dyn HttpClient>,
        coordinator: Arc<RefreshCoordinator>,
        policy: EndpointPolicy,
    ) -> Self {
        Self {
            http,
            coordinator,
            policy,
        }
    }

    /// The coordinator used for refreshes.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    fn tokens(&self) -> &TokenStore {
        self.coordinator.tokens()
    }

    /// Attaches the current token, or decides what to do without one.
    async fn authorize(&self, request: &mut RequestSpec, exempt: bool) -> ApplicationResult<()> {
        if let Some(token) = self.tokens().access_token().await {
            request.set_bearer(&token);
            return Ok(());
        }

        match self.coordinator.join_in_flight().await {
            Some(outcome) => {
                request.set_bearer(&outcome?);
                Ok(())
            }
            None if exempt => Ok(()),
            None => {
                warn!(url = %request.url, "No access token for protected request, ending session");
                self.coordinator
                    .terminate(TerminationReason::NotAuthenticated)
                    .await;
                Err(AuthError::NotAuthenticated.into())
            }
        }
    }
}

#[async_trait]
impl ApiClient for AuthenticatedClient {
    async fn send(&self, mut request: RequestSpec) -> ApplicationResult<ResponseSpec> {
        if self.policy.is_public(&request) {
            return Ok(self.http.execute(request).await?);
        }

        let exempt = self.policy.is_refresh_exempt(&request);
        self.authorize(&mut request, exempt).await?;
        let sent_token = request.bearer().map(str::to_string);

        let response = self.http.execute(request.clone()).await?;
        if exempt || !response.status.is_unauthorized() {
            return Ok(response);
        }

        debug!(url = %request.url, "Request unauthorized, refreshing token");
        let token = match self.tokens().access_token().await {
            // Refreshed by someone else while this request was in flight.
            Some(current) if sent_token.as_deref() != Some(current.as_str()) => current,
            Some(_) => self.coordinator.ensure_fresh_token().await?,
            None => return Err(AuthError::NotAuthenticated.into()),
        };

        request.set_bearer(&token);
        let retried = self.http.execute(request.clone()).await?;
        if retried.status.is_unauthorized() {
            warn!(url = %request.url, "Request still unauthorized after refresh");
            return Err(AuthError::Unauthorized { url: request.url }.into());
        }
        Ok(retried)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{SessionTerminator, TokenRefresher};
    use crate::ports::HttpClientError;
    use crate::testing::{MemoryStore, RecordingTerminator, ScriptedHttp};
    use crate::ApplicationError;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct GatedRefresher {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self) -> Result<String, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok("fresh".to_string())
        }
    }

    struct Harness {
        client: Arc<AuthenticatedClient>,
        http: Arc<ScriptedHttp>,
        refresher: Arc<GatedRefresher>,
        terminator: Arc<RecordingTerminator>,
    }

    async fn harness(token: Option<&str>, http: Arc<ScriptedHttp>) -> Harness {
        let tokens = TokenStore::new(Arc::new(MemoryStore::default()));
        if let Some(token) = token {
            tokens.set_access_token(token).await.unwrap();
        }
        let refresher = Arc::new(GatedRefresher {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let coordinator = Arc::new(RefreshCoordinator::new(refresher.clone(), tokens));
        let terminator = Arc::new(RecordingTerminator::default());
        let weak: std::sync::Weak<dyn SessionTerminator> = Arc::downgrade(&terminator) as _;
        coordinator.set_terminator(weak);
        let client = Arc::new(AuthenticatedClient::new(
            http.clone(),
            coordinator,
            EndpointPolicy::default(),
        ));
        Harness {
            client,
            http,
            refresher,
            terminator,
        }
    }

    /// Accepts only the refreshed token.
    fn fresh_only() -> Arc<ScriptedHttp> {
        ScriptedHttp::new(|request| {
            Ok(match request.bearer() {
                Some("fresh") => ResponseSpec::empty(200),
                _ => ResponseSpec::empty(401),
            })
        })
    }

    #[tokio::test]
    async fn test_attaches_bearer_but_not_on_public_endpoints() {
        let h = harness(Some("tok"), ScriptedHttp::new(|_| Ok(ResponseSpec::empty(200)))).await;

        h.client.send(RequestSpec::get("/api/images")).await.unwrap();
        h.client.send(RequestSpec::post("/api/logout")).await.unwrap();

        let requests = h.http.requests();
        assert_eq!(requests[0].bearer(), Some("tok"));
        assert_eq!(requests[1].bearer(), None);
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        const N: usize = 4;
        let h = harness(Some("stale"), fresh_only()).await;

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let client = h.client.clone();
                tokio::spawn(async move { client.send(RequestSpec::get(format!("/api/images/{i}"))).await })
            })
            .collect();

        while h.client.coordinator().pending_waiters() < N - 1 {
            tokio::task::yield_now().await;
        }
        h.refresher.gate.notify_one();

        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_success());
        }
        assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);

        let retries: Vec<_> = h
            .http
            .requests()
            .into_iter()
            .filter(|r| r.bearer() == Some("fresh"))
            .collect();
        assert_eq!(retries.len(), N);
    }

    #[tokio::test]
    async fn test_second_401_is_final() {
        let h = harness(Some("stale"), ScriptedHttp::new(|_| Ok(ResponseSpec::empty(401)))).await;
        h.refresher.gate.notify_one();

        let err = h.client.send(RequestSpec::get("/api/members/me")).await.unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Auth(AuthError::Unauthorized { ref url }) if url == "/api/members/me"
        ));
        assert_eq!(h.http.requests().len(), 2);
        assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);
        assert!(h.terminator.reasons.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_terminates_without_sending() {
        let h = harness(None, ScriptedHttp::new(|_| Ok(ResponseSpec::empty(200)))).await;

        let err = h.client.send(RequestSpec::get("/api/images")).await.unwrap_err();

        assert!(matches!(err, ApplicationError::Auth(AuthError::NotAuthenticated)));
        assert!(h.http.requests().is_empty());
        assert_eq!(
            h.terminator.reasons.lock().clone(),
            vec![TerminationReason::NotAuthenticated]
        );
    }

    #[tokio::test]
    async fn test_login_401_passes_through() {
        let h = harness(None, ScriptedHttp::new(|_| Ok(ResponseSpec::empty(401)))).await;

        let response = h.client.send(RequestSpec::post(LOGIN_ENDPOINT)).await.unwrap();

        assert_eq!(response.status.as_u16(), 401);
        assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 0);
        assert!(h.terminator.reasons.lock().is_empty());
    }

    #[tokio::test]
    async fn test_other_statuses_pass_through() {
        let h = harness(Some("tok"), ScriptedHttp::new(|_| Ok(ResponseSpec::empty(403)))).await;
        let response = h.client.send(RequestSpec::get("/api/admin")).await.unwrap();
        assert_eq!(response.status.as_u16(), 403);
        assert_eq!(h.http.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_token_joins_in_flight_refresh() {
        let h = harness(None, fresh_only()).await;
        let coordinator = h.client.coordinator().clone();
        let leader = tokio::spawn(async move { coordinator.ensure_fresh_token().await });
        while h.refresher.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let client = h.client.clone();
        let request = tokio::spawn(async move { client.send(RequestSpec::get("/api/images")).await });
        while h.client.coordinator().pending_waiters() < 1 {
            tokio::task::yield_now().await;
        }
        assert!(h.http.requests().is_empty());
        h.refresher.gate.notify_one();

        assert_eq!(leader.await.unwrap().unwrap(), "fresh");
        assert!(request.await.unwrap().unwrap().is_success());
        let requests = h.http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer(), Some("fresh"));
        assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);
        assert!(h.terminator.reasons.lock().is_empty());
    }

    /// Rotates the stored token while a request with the old one is in flight.
    struct RotatingHttp {
        tokens: TokenStore,
        seen: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl HttpClient for RotatingHttp {
        async fn execute(&self, request: RequestSpec) -> Result<ResponseSpec, HttpClientError> {
            self.seen.lock().push(request.bearer().map(str::to_string));
            if request.bearer() == Some("rotated") {
                return Ok(ResponseSpec::empty(200));
            }
            self.tokens
                .set_access_token("rotated")
                .await
                .map_err(|e| HttpClientError::Other(e.to_string()))?;
            Ok(ResponseSpec::empty(401))
        }
    }

    #[tokio::test]
    async fn test_stale_401_retries_with_stored_token_without_refresh() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::default()));
        tokens.set_access_token("old").await.unwrap();
        let http = Arc::new(RotatingHttp {
            tokens: tokens.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let refresher = Arc::new(GatedRefresher {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let coordinator = Arc::new(RefreshCoordinator::new(refresher.clone(), tokens));
        let client = AuthenticatedClient::new(http.clone(), coordinator, EndpointPolicy::default());

        let response = client.send(RequestSpec::get("/api/images")).await.unwrap();

        assert!(response.is_success());
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            http.seen.lock().clone(),
            vec![Some("old".to_string()), Some("rotated".to_string())]
        );
    }
}
