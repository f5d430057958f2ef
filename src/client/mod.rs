//! Realtime Channel Client
//!
//! A reconnecting client for the `/socket` endpoint. Handlers are registered
//! per event name; the last `join` identity is re-sent after every
//! reconnection.
//!
//! ```rust,no_run
//! # use crm_server::client::{ActivityClient, ClientConfig};
//! # async fn example() {
//! let client = ActivityClient::new(ClientConfig::new("ws://localhost:5000/socket"));
//! client.on("activity_update", |data| println!("{data}"));
//! client.connect();
//! # }
//! ```

mod config;
mod error;

pub use config::{ClientConfig, ReconnectPolicy};
pub use error::ClientError;

use std::collections::HashMap;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::presentation::realtime::{Frame, Identity};

/// Pseudo event dispatched after every successful (re)connection
pub const CONNECT_EVENT: &str = "connect";
/// Pseudo event dispatched when a live connection is lost or closed
pub const DISCONNECT_EVENT: &str = "disconnect";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// `disconnect()` was called
    Closed,
}

enum SessionEnd {
    Shutdown,
    Lost,
}

/// Connection state tagged with the epoch of the task allowed to change it.
/// Every `connect()` and `disconnect()` starts a new epoch.
struct Status {
    epoch: u64,
    state: ConnectionState,
}

/// A spawned connection task and its private shutdown flag
struct Worker {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl Worker {
    fn is_running(&self) -> bool {
        !self.handle.is_finished() && !*self.shutdown.borrow()
    }
}

struct Shared {
    config: ClientConfig,
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
    identity: RwLock<Option<Identity>>,
    status: RwLock<Status>,
    outbound: Mutex<Option<(u64, mpsc::UnboundedSender<Message>)>>,
    worker: Mutex<Option<Worker>>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        self.status.read().state
    }

    /// Start a new epoch in `state`. Tasks of earlier epochs lose write access.
    fn advance(&self, state: ConnectionState) -> u64 {
        let mut status = self.status.write();
        status.epoch += 1;
        status.state = state;
        status.epoch
    }

    fn set_state(&self, epoch: u64, state: ConnectionState) {
        let mut status = self.status.write();
        if status.epoch == epoch {
            status.state = state;
        }
    }

    fn attach(&self, epoch: u64, sender: mpsc::UnboundedSender<Message>) {
        let mut outbound = self.outbound.lock();
        if self.status.read().epoch == epoch {
            *outbound = Some((epoch, sender));
        }
    }

    fn detach(&self, epoch: u64) {
        let mut outbound = self.outbound.lock();
        if outbound.as_ref().is_some_and(|(owner, _)| *owner == epoch) {
            *outbound = None;
        }
    }

    fn send(&self, text: String) -> Result<(), ClientError> {
        let outbound = self.outbound.lock();
        let (_, sender) = outbound.as_ref().ok_or(ClientError::NotConnected)?;
        sender
            .send(Message::text(text))
            .map_err(|_| ClientError::NotConnected)
    }

    fn dispatch(&self, event: &str, data: &Value) {
        // Handlers run outside the lock so they may call on/off
        let handlers = self.handlers.read().get(event).cloned().unwrap_or_default();
        for handler in handlers {
            handler(data);
        }
    }

    fn handle_text(&self, text: &str) {
        match Frame::parse(text) {
            Ok(frame) => self.dispatch(&frame.event, &frame.data),
            Err(e) => tracing::warn!(error = %e, "Dropping unreadable frame"),
        }
    }
}

/// Reconnecting client for the realtime activity channel
#[derive(Clone)]
pub struct ActivityClient {
    shared: Arc<Shared>,
}

impl ActivityClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                handlers: RwLock::new(HashMap::new()),
                identity: RwLock::new(None),
                status: RwLock::new(Status {
                    epoch: 0,
                    state: ConnectionState::Disconnected,
                }),
                outbound: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Register a handler for `event`. Several handlers may share an event.
    pub fn on<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared
            .handlers
            .write()
            .entry(event.into())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Remove every handler for `event`
    pub fn off(&self, event: &str) {
        self.shared.handlers.write().remove(event);
    }

    /// Remember `identity` and announce it. While disconnected it is sent on
    /// the next connection.
    pub fn join(&self, identity: Identity) -> Result<(), ClientError> {
        let text = join_frame(&identity).to_text();
        *self.shared.identity.write() = Some(identity);
        match self.shared.send(text) {
            Ok(()) | Err(ClientError::NotConnected) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Send `{event, data}` on the live connection
    pub fn emit(&self, event: &str, data: Value) -> Result<(), ClientError> {
        let text = serde_json::to_string(&Frame::new(event, data))?;
        self.shared.send(text)
    }

    /// Start the connection task. No-op while one is already running; a
    /// task still winding down after `disconnect()` is left to finish.
    pub fn connect(&self) {
        let mut worker = self.shared.worker.lock();
        if worker.as_ref().is_some_and(Worker::is_running) {
            return;
        }

        let (shutdown, stop) = watch::channel(false);
        let epoch = self.shared.advance(ConnectionState::Connecting);
        let handle = tokio::spawn(run(self.shared.clone(), stop, epoch));
        *worker = Some(Worker { handle, shutdown });
    }

    /// Close the connection and stop reconnecting
    pub fn disconnect(&self) {
        if let Some(worker) = self.shared.worker.lock().as_ref() {
            worker.shutdown.send_replace(true);
        }
        self.shared.advance(ConnectionState::Closed);
        self.shared.outbound.lock().take();
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

fn join_frame(identity: &Identity) -> Frame {
    Frame::new(
        "join",
        json!({
            "userId": identity.user_id.map(|id| id.to_string()),
            "userName": identity.user_name,
            "userType": identity.user_type,
        }),
    )
}

/// Resolves once shutdown is requested or the worker handle is gone
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn open(url: &str) -> Result<WsStream, ClientError> {
    let (stream, _) = connect_async(url).await?;
    Ok(stream)
}

/// Connect, serve, and reconnect with backoff until shut down or out of attempts
async fn run(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>, epoch: u64) {
    let policy = shared.config.reconnect.clone();
    let mut attempt: u32 = 0;

    let closed = loop {
        let result = tokio::select! {
            result = open(&shared.config.url) => result,
            _ = stopped(&mut shutdown) => break true,
        };

        match result {
            Ok(stream) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt, "Reconnected");
                }
                attempt = 0;
                if let SessionEnd::Shutdown = serve(&shared, stream, &mut shutdown, epoch).await {
                    break true;
                }
            }
            Err(e) => tracing::warn!(url = %shared.config.url, error = %e, "Connection failed"),
        }

        attempt += 1;
        if !policy.allows(attempt) {
            tracing::warn!(max_attempts = policy.max_attempts, "Giving up reconnecting");
            break false;
        }

        shared.set_state(epoch, ConnectionState::Reconnecting);
        let delay = policy.delay(attempt);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stopped(&mut shutdown) => break true,
        }
    };

    shared.detach(epoch);
    shared.set_state(
        epoch,
        if closed {
            ConnectionState::Closed
        } else {
            ConnectionState::Disconnected
        },
    );
}

/// Drive one live connection until it drops or shutdown is requested
async fn serve(
    shared: &Shared,
    stream: WsStream,
    shutdown: &mut watch::Receiver<bool>,
    epoch: u64,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    if let Some(identity) = shared.identity.read().as_ref() {
        let _ = tx.send(Message::text(join_frame(identity).to_text()));
    }
    shared.attach(epoch, tx);
    shared.set_state(epoch, ConnectionState::Connected);
    shared.dispatch(CONNECT_EVENT, &Value::Null);

    let period = shared.config.ping_interval;
    let mut ping = interval_at(Instant::now() + period, period);
    let ping_text = Frame::new("ping", Value::Null).to_text();

    let end = loop {
        tokio::select! {
            _ = stopped(shutdown) => {
                let _ = write.send(Message::Close(None)).await;
                break SessionEnd::Shutdown;
            }
            Some(message) = rx.recv() => {
                if let Err(e) = write.send(message).await {
                    tracing::debug!(error = %e, "Send failed");
                    break SessionEnd::Lost;
                }
            }
            _ = ping.tick() => {
                if let Err(e) = write.send(Message::text(ping_text.clone())).await {
                    tracing::debug!(error = %e, "Ping failed");
                    break SessionEnd::Lost;
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => shared.handle_text(text.as_str()),
                Some(Ok(Message::Close(_))) | None => break SessionEnd::Lost,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Connection error");
                    break SessionEnd::Lost;
                }
            },
        }
    };

    shared.detach(epoch);
    if let SessionEnd::Lost = end {
        shared.set_state(epoch, ConnectionState::Disconnected);
    }
    shared.dispatch(DISCONNECT_EVENT, &Value::Null);
    end
}
