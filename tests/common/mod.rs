//! Common Test Utilities
//!
//! Spawns the realtime router on an ephemeral port and wraps raw
//! `tokio-tungstenite` connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crm_server::config::WebSocketSettings;
use crm_server::presentation::realtime::{self, Frame, Hub, RealtimeState};
use crm_server::shared::snowflake::SnowflakeGenerator;

pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// A running realtime endpoint
pub struct TestRealtime {
    pub addr: SocketAddr,
    pub hub: Arc<Hub>,
}

impl TestRealtime {
    pub async fn spawn() -> Self {
        Self::spawn_with(WebSocketSettings::default()).await
    }

    pub async fn spawn_with(settings: WebSocketSettings) -> Self {
        let hub = Arc::new(Hub::new(&settings));
        let state = RealtimeState {
            hub: hub.clone(),
            ids: Arc::new(SnowflakeGenerator::new(1, 0)),
        };
        let app = realtime::router::<RealtimeState>().with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, hub }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/socket", self.addr)
    }

    /// Connect and consume the `connected` greeting
    pub async fn connect(&self) -> TestSocket {
        let (stream, _) = connect_async(self.url()).await.unwrap();
        let mut socket = TestSocket { stream };
        let hello = socket.expect("connected").await;
        assert!(hello.data["socketId"].is_string());
        socket
    }
}

/// Raw client connection
pub struct TestSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestSocket {
    pub async fn send(&mut self, event: &str, data: Value) {
        let text = Frame::new(event, data).to_text();
        self.stream.send(Message::text(text)).await.unwrap();
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream.send(Message::text(text.to_owned())).await.unwrap();
    }

    /// Next text frame, failing after [`FRAME_TIMEOUT`]
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let message = tokio::time::timeout(FRAME_TIMEOUT, self.stream.next())
                .await
                .expect("timed out waiting for a frame")?;
            match message {
                Ok(Message::Text(text)) => return Some(Frame::parse(text.as_str()).unwrap()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Skip frames until one named `event` arrives
    pub async fn expect(&mut self, event: &str) -> Frame {
        loop {
            let frame = self
                .next_frame()
                .await
                .unwrap_or_else(|| panic!("socket closed while waiting for '{event}'"));
            if frame.event == event {
                return frame;
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
