//! ActivityClient against a live endpoint

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crm_server::client::{ActivityClient, ClientConfig, ConnectionState, ReconnectPolicy};
use crm_server::domain::ActorType;
use crm_server::presentation::realtime::Identity;

use crate::common::{TestRealtime, FRAME_TIMEOUT};

fn fast_reconnect() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        multiplier: 2.0,
        max_attempts: 0,
        jitter: 0.0,
    }
}

/// Forward every `event` payload into a channel
fn capture(client: &ActivityClient, event: &str) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.on(event, move |data| {
        let _ = tx.send(data.clone());
    });
    rx
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(FRAME_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("handler dropped")
}

#[tokio::test]
async fn receives_activity_updates_from_other_sockets() {
    let server = TestRealtime::spawn().await;
    let client = ActivityClient::new(ClientConfig::new(server.url()).with_reconnect(fast_reconnect()));
    let mut connected = capture(&client, "connect");
    let mut updates = capture(&client, "activity_update");

    client.connect();
    recv(&mut connected).await;
    assert_eq!(client.state(), ConnectionState::Connected);

    let mut dashboard = server.connect().await;
    dashboard
        .send("leads_uploaded", json!({ "count": 3, "uploadedBy": "Meera" }))
        .await;

    let update = recv(&mut updates).await;
    assert_eq!(update["type"], "leads_uploaded");
    assert_eq!(update["message"], "Meera uploaded 3 leads");

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn emit_round_trips_through_the_server() {
    let server = TestRealtime::spawn().await;
    let client = ActivityClient::new(ClientConfig::new(server.url()));
    let mut connected = capture(&client, "connect");
    let mut pongs = capture(&client, "pong");

    client.connect();
    recv(&mut connected).await;

    client.emit("ping", json!({ "n": 1 })).unwrap();
    assert_eq!(recv(&mut pongs).await, json!({ "n": 1 }));

    client.disconnect();
}

#[tokio::test]
async fn connect_right_after_disconnect_reconnects() {
    let server = TestRealtime::spawn().await;
    let client = ActivityClient::new(ClientConfig::new(server.url()).with_reconnect(fast_reconnect()));
    let mut connected = capture(&client, "connect");
    let mut pongs = capture(&client, "pong");

    client.connect();
    recv(&mut connected).await;

    client.disconnect();
    client.connect();
    recv(&mut connected).await;

    // Give the previous task time to wind down
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(client.state(), ConnectionState::Connected);
    client.emit("ping", json!("still here")).unwrap();
    assert_eq!(recv(&mut pongs).await, json!("still here"));

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn join_is_sent_and_replayed_after_reconnect() {
    let server = TestRealtime::spawn_with(crm_server::config::WebSocketSettings {
        heartbeat_interval_ms: 150,
        idle_grace_ms: 50,
        ..Default::default()
    })
    .await;

    // Ping rarely so the server's idle timeout drops the connection
    let config = ClientConfig::new(server.url())
        .with_reconnect(fast_reconnect())
        .with_ping_interval(Duration::from_secs(60));
    let client = ActivityClient::new(config);
    let mut joined = capture(&client, "joined");
    let mut disconnected = capture(&client, "disconnect");
    let mut connected = capture(&client, "connect");

    client.connect();
    recv(&mut connected).await;
    client
        .join(Identity {
            user_id: Some(11),
            user_name: Some("Asha".into()),
            user_type: ActorType::Employee,
        })
        .unwrap();
    recv(&mut joined).await;
    assert!(server.hub.is_user_online(11));

    recv(&mut disconnected).await;
    recv(&mut connected).await;
    recv(&mut joined).await;
    assert!(server.hub.is_user_online(11));

    client.disconnect();
}
