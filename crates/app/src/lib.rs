//! Galleria client - application wiring
//!
//! [`App`] owns one client session: configuration, the authenticated API
//! client, the session service and the notification socket. It is created
//! once with [`App::init`] and released with [`App::teardown`].

use std::sync::{Arc, Weak};

use galleria_application::auth::{
    AuthenticatedClient, EndpointPolicy, HttpTokenRefresher, RefreshCoordinator, SessionService,
    SessionTerminator, TokenStore,
};
use galleria_application::notify::NotificationClient;
use galleria_application::ports::{
    Clock, DesktopNotifier, HttpClient, HttpClientError, KeyValueStore, NotificationTransport,
    PreviewUrlRegistry, SessionObserver,
};
use galleria_application::upload::UploadPipeline;
use galleria_application::views::{ViewKind, ViewTracker};
use galleria_application::{ApplicationError, ApplicationResult};
use galleria_domain::{ClientConfig, DomainError};
use galleria_infrastructure::{
    default_state_file, ConfigError, FileKeyValueStore, InMemoryPreviewRegistry,
    ReqwestHttpClient, SystemClock, TracingNotifier, TracingSessionObserver, TungsteniteTransport,
};
use thiserror::Error;
use tracing::info;

/// Errors starting the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration is invalid.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Http(#[from] HttpClientError),

    /// Session restore or another application step failed.
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// The external collaborators an [`App`] is assembled from.
pub struct Adapters {
    /// Raw HTTP client for the API.
    pub http: Arc<dyn HttpClient>,
    /// HTTP client for presigned storage transfers.
    pub storage: Arc<dyn HttpClient>,
    /// Persisted state.
    pub store: Arc<dyn KeyValueStore>,
    /// Preview URL registry.
    pub previews: Arc<dyn PreviewUrlRegistry>,
    /// Notification socket transport.
    pub transport: Arc<dyn NotificationTransport>,
    /// Popup notifier.
    pub notifier: Arc<dyn DesktopNotifier>,
    /// Receives session-ended events.
    pub observer: Arc<dyn SessionObserver>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl Adapters {
    /// Production adapters for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn production(config: &ClientConfig) -> Result<Self, AppError> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(config.api_base()?)?);
        let state_file = config.state_file.clone().unwrap_or_else(default_state_file);
        Ok(Self {
            storage: Arc::clone(&http),
            http,
            store: Arc::new(FileKeyValueStore::new(state_file)),
            previews: Arc::new(InMemoryPreviewRegistry::new()),
            transport: Arc::new(TungsteniteTransport::new()),
            notifier: Arc::new(TracingNotifier),
            observer: Arc::new(TracingSessionObserver),
            clock: Arc::new(SystemClock::new()),
        })
    }
}

/// One client session.
pub struct App {
    config: ClientConfig,
    tokens: TokenStore,
    api: Arc<AuthenticatedClient>,
    session: Arc<SessionService>,
    notifications: NotificationClient,
    storage: Arc<dyn HttpClient>,
    store: Arc<dyn KeyValueStore>,
    previews: Arc<dyn PreviewUrlRegistry>,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Builds the application with production adapters and restores any
    /// persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter cannot be built or persisted state
    /// cannot be read.
    pub async fn init(config: ClientConfig) -> Result<Self, AppError> {
        let adapters = Adapters::production(&config)?;
        Self::with_adapters(config, adapters).await
    }

    /// Builds the application from explicit adapters.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or persisted state
    /// cannot be read.
    pub async fn with_adapters(config: ClientConfig, adapters: Adapters) -> Result<Self, AppError> {
        config.validate()?;
        let tokens = TokenStore::new(Arc::clone(&adapters.store));

        let refresher = Arc::new(HttpTokenRefresher::new(Arc::clone(&adapters.http)));
        let coordinator = Arc::new(RefreshCoordinator::new(refresher, tokens.clone()));
        let api = Arc::new(AuthenticatedClient::new(
            Arc::clone(&adapters.http),
            Arc::clone(&coordinator),
            EndpointPolicy::new(config.public_endpoints.clone()),
        ));
        let session = Arc::new(SessionService::new(
            api.clone(),
            tokens.clone(),
            adapters.observer,
        ));
        let terminator: Weak<dyn SessionTerminator> = Arc::downgrade(&session) as _;
        coordinator.set_terminator(terminator);

        let notifications =
            NotificationClient::init(&config, adapters.transport, adapters.notifier)?;

        if let Some(user) = session.restore().await? {
            info!(user_id = user.id, "Restored session");
        }

        Ok(Self {
            config,
            tokens,
            api,
            session,
            notifications,
            storage: adapters.storage,
            store: adapters.store,
            previews: adapters.previews,
            clock: adapters.clock,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authenticated API client.
    #[must_use]
    pub const fn api(&self) -> &Arc<AuthenticatedClient> {
        &self.api
    }

    /// Session service.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionService> {
        &self.session
    }

    /// Token store.
    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Notification client.
    #[must_use]
    pub const fn notifications(&self) -> &NotificationClient {
        &self.notifications
    }

    /// Connects the notification socket as the signed-in user.
    ///
    /// Returns false when nobody is signed in.
    pub async fn connect_notifications(&self) -> bool {
        match self.tokens.current_user().await {
            Some(user) => {
                self.notifications
                    .connect_with_user(user.id, Some(user.username));
                true
            }
            None => false,
        }
    }

    /// Starts a new upload batch.
    #[must_use]
    pub fn upload_pipeline(&self) -> UploadPipeline {
        UploadPipeline::new(
            self.api.clone(),
            Arc::clone(&self.storage),
            Arc::clone(&self.previews),
            self.tokens.clone(),
        )
    }

    /// Loads the view history of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted state cannot be read or written.
    pub async fn view_tracker(&self, kind: ViewKind) -> ApplicationResult<ViewTracker> {
        ViewTracker::init(kind, Arc::clone(&self.store), Arc::clone(&self.clock)).await
    }

    /// Closes the notification socket and releases the session.
    pub fn teardown(self) {
        self.notifications.teardown();
        info!("Application torn down");
    }
}
