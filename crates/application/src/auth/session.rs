//! Login, logout and session termination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use galleria_domain::{AuthError, CurrentUser, LoginRequest, RequestSpec, TokenResponse};
use tracing::{info, instrument, warn};

use crate::auth::{SessionTerminator, TokenStore, LOGIN_ENDPOINT};
use crate::ports::{ApiClient, SessionObserver, TerminationReason};
use crate::{expect_success, ApplicationResult};

/// Logout endpoint.
pub const LOGOUT_ENDPOINT: &str = "/api/logout";

/// Endpoint returning the signed-in user.
pub const USER_INFO_ENDPOINT: &str = "/api/members/userinfo";

/// Owns the session lifecycle of one client.
pub struct SessionService {
    api: Arc<dyn ApiClient>,
    tokens: TokenStore,
    observer: Arc<dyn SessionObserver>,
    ended: AtomicBool,
}

impl SessionService {
    /// Creates the service.
    #[must_use]
    pub fn new(api: Arc<dyn ApiClient>, tokens: TokenStore, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            api,
            tokens,
            observer,
            ended: AtomicBool::new(false),
        }
    }

    /// Resumes a persisted session, returning its user.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted state cannot be read.
    pub async fn restore(&self) -> ApplicationResult<Option<CurrentUser>> {
        if self.tokens.restore().await? {
            self.ended.store(false, Ordering::SeqCst);
        }
        Ok(self.tokens.current_user().await)
    }

    /// Signs in and loads the user profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::LoginFailed`] if the credentials are refused, or
    /// the error of the profile request.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> ApplicationResult<CurrentUser> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .api
            .send(RequestSpec::post_json(LOGIN_ENDPOINT, &body)?)
            .await?;

        if !response.is_success() {
            let message = response.api_error().map_or_else(
                || format!("status {}", response.status),
                |e| e.user_message(),
            );
            warn!(%message, "Login refused");
            return Err(AuthError::LoginFailed { message }.into());
        }

        let token: TokenResponse = response.json_body()?;
        self.tokens.set_access_token(&token.access_token).await?;
        self.ended.store(false, Ordering::SeqCst);

        let user: CurrentUser = expect_success(self.api.send(RequestSpec::get(USER_INFO_ENDPOINT)).await?)?
            .json_body()?;
        self.tokens.set_user(user.clone()).await?;
        info!(user_id = user.id, "Logged in");
        Ok(user)
    }

    /// Forgets local credentials, then tells the backend.
    ///
    /// Returns true if the backend acknowledged the logout. Local state is
    /// cleared either way.
    pub async fn logout(&self) -> bool {
        if let Err(e) = self.tokens.clear().await {
            warn!(error = %e, "Failed to clear persisted session");
        }

        match self.api.send(RequestSpec::post(LOGOUT_ENDPOINT)).await {
            Ok(response) if response.is_success() => {
                info!("Logged out");
                true
            }
            Ok(response) => {
                warn!(status = %response.status, "Backend refused logout");
                false
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed");
                false
            }
        }
    }

    /// Returns the signed-in user.
    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.tokens.current_user().await
    }
}

#[async_trait]
impl SessionTerminator for SessionService {
    async fn terminate(&self, reason: TerminationReason) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!(?reason, "Session terminated");
        self.logout().await;
        self.observer.session_ended(&reason);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, Passthrough, ScriptedHttp};
    use crate::ApplicationError;
    use galleria_domain::ResponseSpec;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Observer(Mutex<Vec<TerminationReason>>);

    impl SessionObserver for Observer {
        fn session_ended(&self, reason: &TerminationReason) {
            self.0.lock().push(reason.clone());
        }
    }

    fn backend() -> Arc<ScriptedHttp> {
        ScriptedHttp::new(|request| {
            Ok(if request.targets(LOGIN_ENDPOINT) {
                ResponseSpec::json(200, &serde_json::json!({"accessToken": "jwt-1"}))
            } else if request.targets(USER_INFO_ENDPOINT) {
                ResponseSpec::json(200, &serde_json::json!({"id": 7, "username": "alice"}))
            } else {
                ResponseSpec::empty(200)
            })
        })
    }

    fn service(http: Arc<ScriptedHttp>) -> (SessionService, Arc<MemoryStore>, Arc<Observer>) {
        let storage = Arc::new(MemoryStore::default());
        let observer = Arc::new(Observer::default());
        let service = SessionService::new(
            Arc::new(Passthrough(http)),
            TokenStore::new(storage.clone()),
            observer.clone(),
        );
        (service, storage, observer)
    }

    #[tokio::test]
    async fn test_login_stores_token_and_user() {
        let (service, storage, _) = service(backend());

        let user = service.login("alice", "pw").await.unwrap();

        assert_eq!(user.id, 7);
        assert_eq!(storage.value("accessToken").as_deref(), Some("jwt-1"));
        assert!(storage.value("user").unwrap().contains("alice"));
    }

    #[tokio::test]
    async fn test_login_refused() {
        let http = ScriptedHttp::new(|_| {
            Ok(ResponseSpec::json(
                401,
                &serde_json::json!({"errorCode": "INVALID_CREDENTIALS", "message": "bad"}),
            ))
        });
        let (service, storage, _) = service(http);

        let err = service.login("alice", "nope").await.unwrap_err();

        assert!(matches!(err, ApplicationError::Auth(AuthError::LoginFailed { .. })));
        assert!(storage.value("accessToken").is_none());
    }

    #[tokio::test]
    async fn test_terminate_runs_once() {
        let http = backend();
        let (service, storage, observer) = service(http.clone());
        service.login("alice", "pw").await.unwrap();

        service.terminate(TerminationReason::NotAuthenticated).await;
        service.terminate(TerminationReason::NotAuthenticated).await;

        assert_eq!(observer.0.lock().len(), 1);
        assert_eq!(http.count_matching(LOGOUT_ENDPOINT), 1);
        assert!(storage.value("accessToken").is_none());

        service.login("alice", "pw").await.unwrap();
        service.terminate(TerminationReason::NotAuthenticated).await;
        assert_eq!(observer.0.lock().len(), 2);
    }
}
