use crate::hub::{EventHandler, EventHub, FeedEvent, FeedEventKind};
use crate::record::EntityRecord;
use crate::store::LiveStore;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};


/// Default window after which an unrefreshed entity is dropped
pub const DEFAULT_ENTITY_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default fixed delay between reconnect attempts
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3_000);

/// Default cap on consecutive reconnect attempts
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Transport connection status.
///
/// `ReconnectExhausted` is dispatched once the reconnect budget is spent,
/// so callers can tell "gave up" apart from "will retry shortly".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    ReconnectExhausted,
}

/// Live-entity state manager for one feed endpoint.
///
/// Owns the transport task, the reconnect timer, the live store and the
/// event hub. Consumers observe it exclusively through subscribed handlers
/// and the snapshot accessors.
pub struct FeedClient {
    endpoint: String,
    reconnect_interval: Duration,
    max_reconnect_attempts: u32,
    hub: Arc<EventHub>,
    store: Arc<LiveStore>,
    state: Mutex<ConnectionState>,
    reconnect_attempts: AtomicU32,
    transport_task: Mutex<Option<JoinHandle<()>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    /// Handle to ourselves for the transport and reconnect tasks
    weak_self: Weak<FeedClient>,
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("endpoint", &self.endpoint)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("state", &*self.state.lock())
            .field(
                "reconnect_attempts",
                &self.reconnect_attempts.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl FeedClient {
    /// Client with the default reconnect policy.
    pub fn new(endpoint: impl Into<String>, entity_timeout: Duration) -> Arc<Self> {
        Self::with_policy(
            endpoint,
            entity_timeout,
            DEFAULT_RECONNECT_INTERVAL,
            DEFAULT_MAX_RECONNECT_ATTEMPTS,
        )
    }

    pub fn with_policy(
        endpoint: impl Into<String>,
        entity_timeout: Duration,
        reconnect_interval: Duration,
        max_reconnect_attempts: u32,
    ) -> Arc<Self> {
        let hub = Arc::new(EventHub::new());
        let store = LiveStore::new(Arc::clone(&hub), entity_timeout);
        Arc::new_cyclic(|weak| Self {
            endpoint: endpoint.into(),
            reconnect_interval,
            max_reconnect_attempts,
            hub,
            store,
            state: Mutex::new(ConnectionState::Disconnected),
            reconnect_attempts: AtomicU32::new(0),
            transport_task: Mutex::new(None),
            reconnect_task: Mutex::new(None),
            weak_self: weak.clone(),
        })
    }

    /// Open the transport. Idempotent: a client that is already
    /// `Connecting` or `Connected` is left alone.
    pub fn connect(&self) {
        {
            let state = self.state.lock();
            if matches!(
                *state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                debug!(endpoint = %self.endpoint, "Already connected or connecting");
                return;
            }
        }

        self.set_state(ConnectionState::Connecting);

        let Some(client) = self.weak_self.upgrade() else {
            return;
        };
        let task = tokio::spawn(async move { client.run_transport().await });
        if let Some(previous) = self.transport_task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Close the transport and tear down all owned timers.
    ///
    /// Clears both the live records and their expiry timers, so a
    /// subsequent `connect()` starts from an empty collection and a fresh
    /// reconnect budget.
    pub fn disconnect(&self) {
        if let Some(task) = self.transport_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.reconnect_task.lock().take() {
            task.abort();
        }
        self.reconnect_attempts.store(0, Ordering::SeqCst);
        self.store.clear();
        self.set_state(ConnectionState::Disconnected);
        info!(endpoint = %self.endpoint, "Feed disconnected");
    }

    pub fn status(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Snapshot of one live record
    pub fn get_by_id(&self, id: &str) -> Option<EntityRecord> {
        self.store.get(id)
    }

    /// Snapshot of all live records; order is not guaranteed
    pub fn get_all(&self) -> Vec<EntityRecord> {
        self.store.get_all()
    }

    pub fn subscribe(&self, kind: FeedEventKind, handler: EventHandler) {
        self.hub.subscribe(kind, handler);
    }

    pub fn unsubscribe(&self, kind: FeedEventKind, handler: &EventHandler) {
        self.hub.unsubscribe(kind, handler);
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    async fn run_transport(self: Arc<Self>) {
        match connect_async(&self.endpoint).await {
            Ok((stream, _response)) => {
                info!(endpoint = %self.endpoint, "Feed connected");
                self.reconnect_attempts.store(0, Ordering::SeqCst);
                self.set_state(ConnectionState::Connected);

                // Read-only consumer; the write half is unused
                let (_write, mut read) = stream.split();
                while let Some(message) = read.next().await {
                    match message {
                        Ok(Message::Text(text)) => self.store.ingest_frame(&text),
                        Ok(Message::Close(frame)) => {
                            info!(?frame, "Feed closed by remote");
                            break;
                        }
                        Ok(_) => {
                            // Ping/pong/binary carry no records
                        }
                        Err(e) => {
                            warn!(error = %e, "Feed transport error");
                            self.set_state(ConnectionState::Failed);
                            self.schedule_reconnect();
                            return;
                        }
                    }
                }

                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect();
            }
            Err(e) => {
                error!(endpoint = %self.endpoint, error = %e, "Feed handshake failed");
                self.set_state(ConnectionState::Failed);
                self.schedule_reconnect();
            }
        }
    }

    /// Arm the single pending reconnect timer, or give up once the
    /// attempt budget is spent.
    fn schedule_reconnect(&self) {
        let attempt = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt > self.max_reconnect_attempts {
            warn!(
                endpoint = %self.endpoint,
                attempts = self.max_reconnect_attempts,
                "Reconnect attempts exhausted"
            );
            self.set_state(ConnectionState::ReconnectExhausted);
            return;
        }

        info!(
            attempt,
            max = self.max_reconnect_attempts,
            delay_ms = self.reconnect_interval.as_millis() as u64,
            "Scheduling reconnect"
        );

        let Some(client) = self.weak_self.upgrade() else {
            return;
        };
        let task = tokio::spawn(async move {
            tokio::time::sleep(client.reconnect_interval).await;
            client.connect();
        });
        if let Some(previous) = self.reconnect_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn set_state(&self, next: ConnectionState) {
        *self.state.lock() = next;
        self.hub.dispatch(&FeedEvent::StatusChange(next));
    }
}
