//! Reconnecting notification socket client.
//!
//! One [`NotificationClient`] lives for the whole application. It keeps a
//! socket open for the signed-in user, registers the user after each open,
//! reconnects with a fixed delay up to a bounded number of attempts and fans
//! inbound notifications out to a callback and to broadcast subscribers.
//!
//! All session state sits behind one mutex that is never held across an
//! `.await`. A generation counter invalidates tasks that belong to a
//! superseded connection.

use std::sync::Arc;

use galleria_domain::{
    ClientConfig, ConnectionState, DomainResult, Notification, NotificationEndpoint,
    ReconnectPolicy, RegisterMessage, RegistrationTiming,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::ports::{
    DesktopNotifier, NotificationPermission, NotificationTransport, SocketChannel, SocketEvent,
    TransportError,
};

const EVENT_CAPACITY: usize = 64;
const POPUP_TITLE: &str = "New notification";

type Subscriber = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Point-in-time view of the notification session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Connection state.
    pub state: ConnectionState,
    /// Registered user id.
    pub user_id: Option<i64>,
    /// Registered username.
    pub username: Option<String>,
    /// Reconnection attempts since the last open.
    pub reconnect_attempts: u32,
    /// Whether a notification arrived since the last clear.
    pub has_unseen: bool,
    /// Text of the latest notification.
    pub latest_message: Option<String>,
    /// Whether a notification callback is set.
    pub has_subscriber: bool,
}

#[derive(Debug, Clone)]
struct Identity {
    user_id: i64,
    username: Option<String>,
}

#[derive(Default)]
struct Session {
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<String>>,
    identity: Option<Identity>,
    attempts: u32,
    has_unseen: bool,
    latest_message: Option<String>,
    subscriber: Option<Subscriber>,
    intentional_close: bool,
    driver: Option<JoinHandle<()>>,
    generation: u64,
}

#[derive(Debug, PartialEq, Eq)]
enum Registration {
    Sent,
    Skipped,
    NotOpen,
}

struct Inner {
    endpoint: NotificationEndpoint,
    policy: ReconnectPolicy,
    timing: RegistrationTiming,
    transport: Arc<dyn NotificationTransport>,
    notifier: Arc<dyn DesktopNotifier>,
    session: Mutex<Session>,
    events: broadcast::Sender<Notification>,
}

/// Handle to the notification session. Clones share the session.
#[derive(Clone)]
pub struct NotificationClient {
    inner: Arc<Inner>,
}

impl NotificationClient {
    /// Creates a disconnected client.
    #[must_use]
    pub fn new(
        endpoint: NotificationEndpoint,
        policy: ReconnectPolicy,
        timing: RegistrationTiming,
        transport: Arc<dyn NotificationTransport>,
        notifier: Arc<dyn DesktopNotifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                endpoint,
                policy,
                timing,
                transport,
                notifier,
                session: Mutex::new(Session::default()),
                events,
            }),
        }
    }

    /// Creates the application's client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket endpoint cannot be derived.
    pub fn init(
        config: &ClientConfig,
        transport: Arc<dyn NotificationTransport>,
        notifier: Arc<dyn DesktopNotifier>,
    ) -> DomainResult<Self> {
        let endpoint = config.notification_endpoint()?;
        info!(url = %endpoint.url, "Notification client initialized");
        Ok(Self::new(
            endpoint,
            config.reconnect_policy(),
            config.registration_timing(),
            transport,
            notifier,
        ))
    }

    /// Disconnects and releases the client.
    pub fn teardown(self) {
        self.disconnect();
        debug!("Notification client torn down");
    }

    /// The socket URL.
    #[must_use]
    pub fn endpoint(&self) -> &NotificationEndpoint {
        &self.inner.endpoint
    }

    /// Stores the identity and opens the socket, replacing any current one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect_with_user(&self, user_id: i64, username: Option<String>) {
        let generation = {
            let mut session = self.inner.session.lock();
            session.identity = Some(Identity { user_id, username });
            session.intentional_close = false;
            session.attempts = 0;
            session.outbound = None;
            if let Some(driver) = session.driver.take() {
                driver.abort();
            }
            session.generation += 1;
            session.state = ConnectionState::Connecting;
            session.generation
        };
        info!(user_id, "Connecting notification socket");

        let driver = tokio::spawn(Arc::clone(&self.inner).drive(generation));
        let mut session = self.inner.session.lock();
        if session.generation == generation {
            session.driver = Some(driver);
        } else {
            driver.abort();
        }
    }

    /// Closes the socket and stops reconnecting until the next
    /// [`connect_with_user`](Self::connect_with_user).
    pub fn disconnect(&self) {
        let (driver, outbound) = {
            let mut session = self.inner.session.lock();
            session.intentional_close = true;
            session.generation += 1;
            session.state = ConnectionState::Disconnected;
            (session.driver.take(), session.outbound.take())
        };
        drop(outbound);
        if let Some(driver) = driver {
            driver.abort();
            info!("Notification socket disconnected");
        }
    }

    /// Returns true if the socket is open right now.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let session = self.inner.session.lock();
        session.state.is_connected()
            && session
                .outbound
                .as_ref()
                .is_some_and(|tx| !tx.is_closed())
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.session.lock().state
    }

    /// Snapshot of the session.
    #[must_use]
    pub fn status(&self) -> SessionSnapshot {
        let session = self.inner.session.lock();
        SessionSnapshot {
            state: session.state,
            user_id: session.identity.as_ref().map(|i| i.user_id),
            username: session.identity.as_ref().and_then(|i| i.username.clone()),
            reconnect_attempts: session.attempts,
            has_unseen: session.has_unseen,
            latest_message: session.latest_message.clone(),
            has_subscriber: session.subscriber.is_some(),
        }
    }

    /// Marks notifications as seen.
    pub fn clear_notification(&self) {
        let mut session = self.inner.session.lock();
        session.has_unseen = false;
        session.latest_message = None;
    }

    /// Sets the callback invoked with every user-visible notification.
    pub fn set_subscriber(&self, subscriber: impl Fn(&Notification) + Send + Sync + 'static) {
        self.inner.session.lock().subscriber = Some(Arc::new(subscriber));
    }

    /// Removes the callback.
    pub fn clear_subscriber(&self) {
        self.inner.session.lock().subscriber = None;
    }

    /// Returns a receiver of every user-visible notification.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.events.subscribe()
    }

    /// Sends `text` unchanged on the open socket.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] if no socket is open.
    pub fn send_message(&self, text: &str) -> Result<(), TransportError> {
        self.inner.send_raw(text.to_string()).inspect_err(|_| {
            warn!("Notification socket is not open, message dropped");
        })
    }

    /// Sends the registration message now.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] if no socket is open.
    pub fn register_again(&self) -> Result<(), TransportError> {
        let generation = self.inner.session.lock().generation;
        match self.inner.try_register(generation) {
            Registration::NotOpen => Err(TransportError::NotOpen),
            Registration::Sent | Registration::Skipped => Ok(()),
        }
    }
}

impl Inner {
    async fn drive(self: Arc<Self>, generation: u64) {
        loop {
            {
                let mut session = self.session.lock();
                if session.generation != generation {
                    return;
                }
                session.state = ConnectionState::Connecting;
            }

            match self.transport.connect(&self.endpoint.url).await {
                Ok(channel) => Arc::clone(&self).run_connection(generation, channel).await,
                Err(e) => warn!(url = %self.endpoint.url, error = %e, "Notification socket connect failed"),
            }

            let delay = {
                let mut session = self.session.lock();
                if session.generation != generation || session.intentional_close {
                    return;
                }
                session.outbound = None;
                if self.policy.allows(session.attempts) {
                    session.attempts += 1;
                    session.state = ConnectionState::Reconnecting;
                    info!(
                        attempt = session.attempts,
                        max_attempts = self.policy.max_attempts,
                        "Scheduling notification socket reconnect"
                    );
                    self.policy.delay
                } else {
                    session.state = ConnectionState::Exhausted;
                    error!(
                        attempts = session.attempts,
                        "Notification socket reconnection attempts exhausted"
                    );
                    return;
                }
            };
            tokio::time::sleep(delay).await;
        }
    }

    async fn run_connection(self: Arc<Self>, generation: u64, channel: SocketChannel) {
        let SocketChannel {
            outbound,
            mut inbound,
        } = channel;
        {
            let mut session = self.session.lock();
            if session.generation != generation {
                return;
            }
            session.outbound = Some(outbound);
            session.attempts = 0;
            session.state = ConnectionState::Connected;
        }
        info!(url = %self.endpoint.url, "Notification socket connected");
        tokio::spawn(Arc::clone(&self).register_after_open(generation));

        while let Some(event) = inbound.recv().await {
            match event {
                SocketEvent::Message(raw) => self.handle_message(&raw),
                SocketEvent::Error(e) => warn!(error = %e, "Notification socket error"),
                SocketEvent::Closed { code, reason } => {
                    info!(?code, %reason, "Notification socket closed");
                    break;
                }
            }
        }

        let mut session = self.session.lock();
        if session.generation == generation {
            session.outbound = None;
            session.state = ConnectionState::Disconnected;
        }
    }

    async fn register_after_open(self: Arc<Self>, generation: u64) {
        tokio::time::sleep(self.timing.delay).await;
        if self.try_register(generation) != Registration::NotOpen {
            return;
        }
        debug!("Socket not open for registration, retrying");
        tokio::time::sleep(self.timing.retry_delay).await;
        if self.try_register(generation) == Registration::NotOpen {
            warn!("Socket still not open, registration skipped");
        }
    }

    fn try_register(&self, generation: u64) -> Registration {
        let session = self.session.lock();
        if session.generation != generation {
            return Registration::Skipped;
        }
        let Some(identity) = session.identity.clone() else {
            debug!("No user identity, registration skipped");
            return Registration::Skipped;
        };
        let Some(outbound) = session.outbound.as_ref().filter(|_| session.state.is_connected()) else {
            return Registration::NotOpen;
        };

        let message = RegisterMessage::new(identity.user_id, identity.username);
        let Ok(raw) = serde_json::to_string(&message) else {
            return Registration::Skipped;
        };
        if outbound.send(raw).is_err() {
            return Registration::NotOpen;
        }
        info!(user_id = identity.user_id, "Registration sent");
        Registration::Sent
    }

    fn send_raw(&self, raw: String) -> Result<(), TransportError> {
        let session = self.session.lock();
        let outbound = session
            .outbound
            .as_ref()
            .filter(|_| session.state.is_connected())
            .ok_or(TransportError::NotOpen)?;
        outbound.send(raw).map_err(|_| TransportError::NotOpen)
    }

    fn handle_message(&self, raw: &str) {
        let notification = Notification::parse(raw);
        if notification.is_registered_ack() {
            debug!("Registration acknowledged");
            return;
        }

        let subscriber = {
            let mut session = self.session.lock();
            session.has_unseen = true;
            session.latest_message = Some(notification.message.clone());
            session.subscriber.clone()
        };
        debug!(kind = %notification.kind, "Notification received");

        if let Some(subscriber) = subscriber {
            subscriber(&notification);
        }
        let body = notification.message.clone();
        let _ = self.events.send(notification);
        self.popup(body);
    }

    fn popup(&self, body: String) {
        match self.notifier.permission() {
            None => debug!("Platform notifications unsupported"),
            Some(NotificationPermission::Denied) => debug!("Platform notifications denied"),
            Some(NotificationPermission::Granted) => show(self.notifier.as_ref(), &body),
            Some(NotificationPermission::Default) => {
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    if notifier.request_permission().await == NotificationPermission::Granted {
                        show(notifier.as_ref(), &body);
                    }
                });
            }
        }
    }
}

fn show(notifier: &dyn DesktopNotifier, body: &str) {
    if let Err(e) = notifier.show(POPUP_TITLE, body) {
        warn!(error = %e, "Failed to show notification popup");
    }
}
