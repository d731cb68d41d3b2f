//! # Notification Connection Manager
//!
//! Owns the single logical connection to the backend's `/ws` endpoint and
//! keeps it alive despite transient network failures, while exposing a stable
//! pub/sub surface (`on`/`off`/`send`) that is independent of connection
//! state. Views register a handler per event kind; the dispatch loop invokes
//! the registered handler synchronously with each envelope's payload.
//!
//! ## Design
//!
//! - One supervisor task per `connect()` window. It establishes a link through
//!   the injected [`Connect`] strategy, pumps inbound events, and on any
//!   failure sleeps for the configured delay and tries again, indefinitely.
//!   `disconnect()` cancels the supervisor through a `CancellationToken`, so
//!   repeated connect/disconnect cycles cannot leak retry tasks.
//! - The handler registry is shared state mutated only through `on`/`off`.
//!   A kind maps to at most one handler: re-registering overwrites. This
//!   last-write-wins rule matches one-view-at-a-time UI usage and is
//!   intentional; a fan-out design would need a handler list instead.
//! - The manager is an explicit value. Create it in the composition root and
//!   share it via `Arc`; tests get isolation from fresh instances.
//!
//! Network errors never reach consumers. A view only ever observes the absence
//! of notifications, which is the accepted contract for a best-effort
//! UI-refresh channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::realtime::envelope::Envelope;
use crate::realtime::transport::{Connect, Link, LinkEvent, WsConnector};

/// Handler bound to one event kind. Invoked with the envelope payload.
pub type Handler = Arc<dyn Fn(Value) + Send + Sync>;

/// Lifecycle state of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No transport handle and no supervisor running.
    Disconnected,
    /// Supervisor is establishing (or re-establishing) a link.
    Connecting,
    /// Link is live; envelopes are being dispatched.
    Connected,
    /// Explicitly shut down; no automatic reconnection until `connect()`.
    Closed,
}

/// Settings for the notification channel.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket URL of the notification endpoint.
    pub url: String,
    /// Fixed delay between a detected disconnect and the next attempt.
    pub reconnect_delay: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

/// State shared between the manager handle and its supervisor task.
struct Shared {
    state: Mutex<LinkState>,
    handlers: Mutex<HashMap<String, Handler>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl Shared {
    fn set_state(&self, next: LinkState) {
        *self.state.lock().expect("realtime state lock poisoned") = next;
    }

    fn clear_outbound(&self) {
        self.outbound
            .lock()
            .expect("realtime outbound lock poisoned")
            .take();
    }
}

/// Connection/subscription manager for the notification channel.
pub struct ConnectionManager {
    config: RealtimeConfig,
    connector: Arc<dyn Connect>,
    shared: Arc<Shared>,
    supervisor: Mutex<Option<CancellationToken>>,
}

impl ConnectionManager {
    /// Creates a manager that connects over a real WebSocket.
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Creates a manager with an injected transport strategy.
    pub fn with_connector(config: RealtimeConfig, connector: Arc<dyn Connect>) -> Self {
        Self {
            config,
            connector,
            shared: Arc::new(Shared {
                state: Mutex::new(LinkState::Disconnected),
                handlers: Mutex::new(HashMap::new()),
                outbound: Mutex::new(None),
            }),
            supervisor: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        *self
            .shared
            .state
            .lock()
            .expect("realtime state lock poisoned")
    }

    /// Starts the supervisor if one is not already running.
    ///
    /// Calling this while connecting or connected is a no-op; the manager
    /// guarantees that at most one live transport handle exists at a time.
    pub fn connect(&self) {
        let mut supervisor = self
            .supervisor
            .lock()
            .expect("realtime supervisor lock poisoned");

        if supervisor.as_ref().is_some_and(|t| !t.is_cancelled()) {
            log::debug!("connect() ignored: notification channel already running");
            return;
        }

        let token = CancellationToken::new();
        *supervisor = Some(token.clone());
        self.shared.set_state(LinkState::Connecting);

        let config = self.config.clone();
        let connector = Arc::clone(&self.connector);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            supervise(config, connector, shared, token).await;
        });
    }

    /// Registers (or overwrites) the handler for `kind`.
    ///
    /// Registration is independent of connection state: handlers registered
    /// before `connect()` survive every reconnect.
    pub fn on(&self, kind: &str, handler: impl Fn(Value) + Send + Sync + 'static) {
        self.shared
            .handlers
            .lock()
            .expect("realtime handlers lock poisoned")
            .insert(kind.to_string(), Arc::new(handler));
    }

    /// Removes the handler for `kind`, if any.
    pub fn off(&self, kind: &str) {
        self.shared
            .handlers
            .lock()
            .expect("realtime handlers lock poisoned")
            .remove(kind);
    }

    /// Serializes and transmits `message` while connected.
    ///
    /// Anything else (not connected, link gone, unserializable message) is
    /// dropped silently. Callers that need delivery confirmation must build an
    /// acknowledgement protocol on top.
    pub fn send<T: Serialize>(&self, message: &T) {
        if self.state() != LinkState::Connected {
            log::trace!("send while not connected: frame dropped");
            return;
        }

        let raw = match serde_json::to_string(message) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Failed to serialize outbound message: {e}");
                return;
            }
        };

        let outbound = self
            .shared
            .outbound
            .lock()
            .expect("realtime outbound lock poisoned");
        if let Some(tx) = outbound.as_ref() {
            // A failed send means the link died under us; the supervisor is
            // already on its way to a reconnect.
            let _ = tx.send(raw);
        }
    }

    /// Closes the channel and suppresses automatic reconnection.
    ///
    /// Handlers stay registered; a later `connect()` resumes dispatch to them.
    pub fn disconnect(&self) {
        let mut supervisor = self
            .supervisor
            .lock()
            .expect("realtime supervisor lock poisoned");

        if let Some(token) = supervisor.take() {
            token.cancel();
            self.shared.clear_outbound();
            self.shared.set_state(LinkState::Closed);
            log::info!("Notification channel closed");
        }
    }
}

/// Retry loop: connect, pump, and on any failure wait out the fixed delay and
/// go again. Runs until the token is cancelled. All state writes happen here
/// or in `disconnect()`; after cancellation this task writes nothing, so a
/// fresh `connect()` can take over immediately.
async fn supervise(
    config: RealtimeConfig,
    connector: Arc<dyn Connect>,
    shared: Arc<Shared>,
    token: CancellationToken,
) {
    loop {
        shared.set_state(LinkState::Connecting);
        log::info!("Connecting to notification endpoint: {}", config.url);

        let attempt = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            attempt = connector.connect(&config.url) => attempt,
        };

        match attempt {
            Ok(link) => {
                log::info!("Notification channel connected");
                let Link {
                    outbound,
                    mut inbound,
                } = link;
                *shared
                    .outbound
                    .lock()
                    .expect("realtime outbound lock poisoned") = Some(outbound);
                shared.set_state(LinkState::Connected);

                loop {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        event = inbound.recv() => match event {
                            Some(LinkEvent::Text(raw)) => dispatch(&shared, &raw),
                            Some(LinkEvent::Error(e)) => {
                                log::warn!("Notification channel error: {e}");
                                break;
                            }
                            Some(LinkEvent::Closed) | None => {
                                log::warn!("Notification channel closed by remote");
                                break;
                            }
                        },
                    }
                }

                // On cancellation, disconnect() already performed the state
                // transition; touch nothing here.
                if token.is_cancelled() {
                    return;
                }
                shared.clear_outbound();
                shared.set_state(LinkState::Disconnected);
            }
            Err(e) => {
                log::warn!(
                    "Failed to connect notification channel: {e}. Retrying in {:?}",
                    config.reconnect_delay
                );
                if token.is_cancelled() {
                    return;
                }
                shared.set_state(LinkState::Disconnected);
            }
        }

        // Exactly one scheduled retry at a time.
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }
}

/// Decodes one inbound frame and routes it to the registered handler.
///
/// Malformed frames are logged and discarded; an unregistered kind is a silent
/// no-op. Neither affects the connection or later dispatches. The handler Arc
/// is cloned out of the lock before invocation so handlers may call `on`/`off`
/// themselves.
fn dispatch(shared: &Shared, raw: &str) {
    let envelope = match Envelope::decode(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("Failed to parse notification frame: {e}");
            return;
        }
    };

    let handler = shared
        .handlers
        .lock()
        .expect("realtime handlers lock poisoned")
        .get(&envelope.kind)
        .cloned();

    if let Some(handler) = handler {
        handler(envelope.payload);
    } else {
        log::trace!("No handler registered for kind '{}'", envelope.kind);
    }
}
