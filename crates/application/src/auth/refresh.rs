//! Single-flight token refresh.
//!
//! At most one refresh call is in flight per coordinator. Callers that arrive
//! while it runs are parked on a oneshot channel and settled, exactly once,
//! with the outcome of that call.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use galleria_domain::{AuthError, RequestSpec, TokenResponse};
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::auth::pipeline::REFRESH_ENDPOINT;
use crate::auth::TokenStore;
use crate::ports::{HttpClient, TerminationReason};

/// Obtains a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Performs one refresh call.
    async fn refresh(&self) -> Result<String, AuthError>;
}

/// Ends the current session.
#[async_trait]
pub trait SessionTerminator: Send + Sync {
    /// Clears credentials and notifies the user.
    async fn terminate(&self, reason: TerminationReason);
}

/// Calls `GET /api/refresh-token`, relying on the ambient refresh cookie.
///
/// The call goes through the raw client so a 401 here is never fed back into
/// the refresh path.
pub struct HttpTokenRefresher {
    http: Arc<dyn HttpClient>,
}

impl HttpTokenRefresher {
    /// Creates a refresher over the raw client.
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self) -> Result<String, AuthError> {
        let response = self
            .http
            .execute(RequestSpec::get(REFRESH_ENDPOINT))
            .await
            .map_err(|e| AuthError::RefreshFailed {
                message: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(AuthError::RefreshRejected {
                status: response.status.as_u16(),
            });
        }

        response
            .json_body::<TokenResponse>()
            .map(|body| body.access_token)
            .map_err(|e| AuthError::RefreshFailed {
                message: e.to_string(),
            })
    }
}

type Waiter = oneshot::Sender<Result<String, AuthError>>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: Vec<Waiter>,
}

/// Coordinates token refreshes for one client session.
pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    tokens: TokenStore,
    terminator: RwLock<Option<Weak<dyn SessionTerminator>>>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new(refresher: Arc<dyn TokenRefresher>, tokens: TokenStore) -> Self {
        Self {
            refresher,
            tokens,
            terminator: RwLock::new(None),
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Installs the session terminator invoked on refresh failure.
    pub fn set_terminator(&self, terminator: Weak<dyn SessionTerminator>) {
        *self.terminator.write() = Some(terminator);
    }

    /// Returns the token store this coordinator writes to.
    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Returns true while a refresh call is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers parked on the in-flight refresh.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Returns a fresh token, issuing at most one refresh call across all
    /// concurrent callers.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure. The session has been terminated by the
    /// time the leading caller sees it.
    pub async fn ensure_fresh_token(&self) -> Result<String, AuthError> {
        let parked = {
            let mut state = self.state.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.refreshing = true;
                None
            }
        };

        if let Some(rx) = parked {
            debug!("Refresh in flight, queued");
            return Self::await_outcome(rx).await;
        }

        let mut latch = Latch {
            coordinator: self,
            settled: false,
        };
        info!("Refreshing access token");

        match self.refresher.refresh().await {
            Ok(token) => {
                if let Err(e) = self.tokens.set_access_token(&token).await {
                    warn!(error = %e, "Refreshed token could not be persisted");
                }
                latch.settle(&Ok(token.clone()));
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed");
                latch.settle(&Err(err.clone()));
                self.terminate(TerminationReason::RefreshFailed(err.clone()))
                    .await;
                Err(err)
            }
        }
    }

    /// Waits for the refresh in flight, if any, and returns its outcome.
    pub async fn join_in_flight(&self) -> Option<Result<String, AuthError>> {
        let rx = {
            let mut state = self.state.lock();
            if !state.refreshing {
                return None;
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            rx
        };
        Some(Self::await_outcome(rx).await)
    }

    /// Invokes the installed terminator.
    pub async fn terminate(&self, reason: TerminationReason) {
        let terminator = self.terminator.read().as_ref().and_then(Weak::upgrade);
        match terminator {
            Some(terminator) => terminator.terminate(reason).await,
            None => warn!(?reason, "No session terminator installed"),
        }
    }

    async fn await_outcome(
        rx: oneshot::Receiver<Result<String, AuthError>>,
    ) -> Result<String, AuthError> {
        rx.await.unwrap_or_else(|_| {
            Err(AuthError::RefreshFailed {
                message: "refresh abandoned".to_string(),
            })
        })
    }
}

/// Releases the refresh latch and settles every parked caller.
///
/// Dropping an unsettled latch (the leading future was cancelled) rejects
/// the parked callers so none is left waiting.
struct Latch<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Latch<'_> {
    fn settle(&mut self, outcome: &Result<String, AuthError>) {
        let waiters = {
            let mut state = self.coordinator.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        self.settled = true;
        debug!(waiters = waiters.len(), "Settling refresh waiters");
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for Latch<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(&Err(AuthError::RefreshFailed {
                message: "refresh abandoned".to_string(),
            }));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, RecordingTerminator, ScriptedHttp};
    use galleria_domain::ResponseSpec;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Refresher that blocks until released and counts calls.
    struct GatedRefresher {
        gate: Notify,
        calls: AtomicUsize,
        outcome: Result<String, AuthError>,
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self) -> Result<String, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.outcome.clone()
        }
    }

    fn coordinator(outcome: Result<String, AuthError>) -> (Arc<RefreshCoordinator>, Arc<GatedRefresher>) {
        let refresher = Arc::new(GatedRefresher {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
            outcome,
        });
        let tokens = TokenStore::new(Arc::new(MemoryStore::default()));
        (
            Arc::new(RefreshCoordinator::new(refresher.clone(), tokens)),
            refresher,
        )
    }

    async fn wait_for_waiters(coordinator: &RefreshCoordinator, n: usize) {
        while coordinator.pending_waiters() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let (coordinator, refresher) = coordinator(Ok("fresh".to_string()));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.ensure_fresh_token().await })
            })
            .collect();

        wait_for_waiters(&coordinator, 4).await;
        refresher.gate.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "fresh");
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.tokens().access_token().await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_failure_rejects_waiters_and_terminates() {
        let (coordinator, refresher) = coordinator(Err(AuthError::RefreshRejected { status: 401 }));
        let terminator = Arc::new(RecordingTerminator::default());
        let weak: Weak<dyn SessionTerminator> = Arc::downgrade(&terminator) as _;
        coordinator.set_terminator(weak);

        let leader = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.ensure_fresh_token().await })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let follower = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.ensure_fresh_token().await })
        };
        wait_for_waiters(&coordinator, 1).await;
        refresher.gate.notify_one();

        let expected = AuthError::RefreshRejected { status: 401 };
        assert_eq!(leader.await.unwrap(), Err(expected.clone()));
        assert_eq!(follower.await.unwrap(), Err(expected.clone()));
        assert_eq!(
            terminator.reasons.lock().clone(),
            vec![TerminationReason::RefreshFailed(expected)]
        );
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_cancelled_leader_releases_waiters() {
        let (coordinator, _refresher) = coordinator(Ok("never".to_string()));

        let leader = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.ensure_fresh_token().await })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let follower = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.ensure_fresh_token().await })
        };
        wait_for_waiters(&coordinator, 1).await;

        leader.abort();
        let outcome = follower.await.unwrap();
        assert!(matches!(outcome, Err(AuthError::RefreshFailed { .. })));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_join_in_flight_when_idle() {
        let (coordinator, _) = coordinator(Ok("t".to_string()));
        assert!(coordinator.join_in_flight().await.is_none());
    }

    #[tokio::test]
    async fn test_http_refresher_maps_status() {
        let http = ScriptedHttp::new(|_| Ok(ResponseSpec::empty(401)));
        let refresher = HttpTokenRefresher::new(http.clone());
        assert_eq!(
            refresher.refresh().await,
            Err(AuthError::RefreshRejected { status: 401 })
        );
        assert_eq!(http.requests()[0].url, REFRESH_ENDPOINT);

        let http = ScriptedHttp::new(|_| {
            Ok(ResponseSpec::json(200, &serde_json::json!({"accessToken": "new"})))
        });
        let refresher = HttpTokenRefresher::new(http);
        assert_eq!(refresher.refresh().await.unwrap(), "new");
    }
}
