//! Transport layer behind the connection manager.
//!
//! The manager never touches a socket directly. A [`Connect`] implementation
//! hands it a [`Link`]: an outbound sender for text frames plus an inbound
//! stream of [`LinkEvent`]s. [`WsConnector`] is the production implementation
//! on `tokio-tungstenite`; [`MemoryConnector`] hands out in-memory links so
//! the reconnect and dispatch behavior can be exercised without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

/// Errors raised while establishing a link.
///
/// These are always treated as transient by the manager; they only ever feed
/// the retry loop and are never surfaced to consumers.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
}

/// An event delivered by a live link.
#[derive(Debug)]
pub enum LinkEvent {
    /// A complete inbound text frame.
    Text(String),
    /// The peer closed the connection normally.
    Closed,
    /// The link failed mid-stream.
    Error(String),
}

/// One live connection, as seen by the manager.
///
/// Dropping the `outbound` sender closes the underlying connection; the pump
/// task behind it shuts down once both halves are gone.
pub struct Link {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<LinkEvent>,
}

/// Strategy for establishing a [`Link`].
pub trait Connect: Send + Sync {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Link, TransportError>>;
}

/// WebSocket connector used against the real backend.
pub struct WsConnector;

impl Connect for WsConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Link, TransportError>> {
        Box::pin(async move {
            let (ws_stream, _) = connect_async(url)
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?;

            let (mut write, mut read) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
            let (evt_tx, evt_rx) = mpsc::unbounded_channel::<LinkEvent>();

            // Pump task: bridges the split sink/stream onto the channels the
            // manager selects over. It ends when either side goes away.
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        msg = read.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    if evt_tx.send(LinkEvent::Text(text.to_string())).is_err() {
                                        break;
                                    }
                                }
                                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                                Some(Ok(Message::Close(_))) | None => {
                                    let _ = evt_tx.send(LinkEvent::Closed);
                                    break;
                                }
                                Some(Err(e)) => {
                                    let _ = evt_tx.send(LinkEvent::Error(e.to_string()));
                                    break;
                                }
                                _ => {}
                            }
                        }
                        out = out_rx.recv() => {
                            match out {
                                Some(text) => {
                                    if let Err(e) = write.send(Message::Text(text.into())).await {
                                        let _ = evt_tx.send(LinkEvent::Error(e.to_string()));
                                        break;
                                    }
                                }
                                None => {
                                    // Manager dropped the link. Close politely.
                                    let _ = write.close().await;
                                    break;
                                }
                            }
                        }
                    }
                }
            });

            Ok(Link {
                outbound: out_tx,
                inbound: evt_rx,
            })
        })
    }
}

/// Test-side control handle for one link handed out by [`MemoryConnector`].
pub struct MemorySession {
    inbound: mpsc::UnboundedSender<LinkEvent>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl MemorySession {
    /// Feeds a raw inbound text frame to the manager.
    pub fn push_text(&self, raw: impl Into<String>) {
        let _ = self.inbound.send(LinkEvent::Text(raw.into()));
    }

    /// Simulates an abnormal mid-stream failure.
    pub fn fail(&self, reason: &str) {
        let _ = self.inbound.send(LinkEvent::Error(reason.to_string()));
    }

    /// Simulates the peer closing the connection.
    pub fn close(&self) {
        let _ = self.inbound.send(LinkEvent::Closed);
    }

    /// Drains every frame the manager has transmitted so far.
    pub fn sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// True once the manager has dropped its half of the link.
    pub fn is_dropped(&self) -> bool {
        self.inbound.is_closed()
    }
}

/// In-memory connector for tests.
///
/// Every `connect` call produces a fresh link and emits the matching
/// [`MemorySession`] on the session channel, so a test can script inbound
/// frames and failures and count connection attempts. Optionally the first N
/// attempts can be scripted to fail.
pub struct MemoryConnector {
    attempts: AtomicUsize,
    failures: Mutex<VecDeque<TransportError>>,
    sessions: mpsc::UnboundedSender<MemorySession>,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemorySession>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                attempts: AtomicUsize::new(0),
                failures: Mutex::new(VecDeque::new()),
                sessions: tx,
            },
            rx,
        )
    }

    /// Number of `connect` calls observed so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Queues an establishment failure for the next `connect` call.
    pub fn fail_next_connect(&self, reason: &str) {
        self.failures
            .lock()
            .expect("MemoryConnector lock poisoned")
            .push_back(TransportError::Connect(reason.to_string()));
    }
}

impl Connect for MemoryConnector {
    fn connect<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Link, TransportError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);

            if let Some(err) = self
                .failures
                .lock()
                .expect("MemoryConnector lock poisoned")
                .pop_front()
            {
                return Err(err);
            }

            let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
            let (evt_tx, evt_rx) = mpsc::unbounded_channel::<LinkEvent>();

            let _ = self.sessions.send(MemorySession {
                inbound: evt_tx,
                outbound: out_rx,
            });

            Ok(Link {
                outbound: out_tx,
                inbound: evt_rx,
            })
        })
    }
}
