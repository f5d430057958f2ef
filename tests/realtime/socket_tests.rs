//! Socket protocol tests

use std::time::Duration;

use fake::faker::name::en::Name;
use fake::Fake;
use pretty_assertions::assert_eq;
use serde_json::json;

use crm_server::config::WebSocketSettings;

use crate::common::TestRealtime;

#[tokio::test]
async fn activity_is_relayed_to_every_socket_including_sender() {
    let server = TestRealtime::spawn().await;
    let mut sender = server.connect().await;
    let mut other = server.connect().await;

    let employee: String = Name().fake();
    let payload = json!({ "employeeName": employee, "addedBy": "Meera" });
    sender.send("employee_added", payload.clone()).await;

    for socket in [&mut sender, &mut other] {
        let frame = socket.expect("activity_update").await;
        assert_eq!(frame.data["type"], "employee_added");
        assert_eq!(frame.data["data"], payload);
        assert_eq!(
            frame.data["message"],
            format!("Meera added new employee {}", employee)
        );
        assert!(frame.data["id"].is_string());
    }
}

#[tokio::test]
async fn relayed_activity_carries_joined_identity() {
    let server = TestRealtime::spawn().await;
    let mut socket = server.connect().await;

    socket
        .send(
            "join",
            json!({ "userId": "42", "userName": "Asha", "userType": "employee" }),
        )
        .await;
    let joined = socket.expect("joined").await;
    assert_eq!(joined.data["onlineCount"], 1);

    socket
        .send("lead_created", json!({ "leadName": "Acme" }))
        .await;
    let frame = socket.expect("activity_update").await;
    assert_eq!(frame.data["actorId"], "42");
    assert_eq!(frame.data["actorName"], "Asha");
    assert_eq!(frame.data["actorType"], "employee");
}

#[tokio::test]
async fn join_and_leave_broadcast_presence() {
    let server = TestRealtime::spawn().await;
    let mut watcher = server.connect().await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;

    a.send("join", json!({ "userId": 7, "userName": "Ravi", "userType": "employee" }))
        .await;
    b.send("join", json!({ "userId": 7, "userName": "Ravi", "userType": "employee" }))
        .await;
    a.expect("joined").await;
    b.expect("joined").await;

    // Two presence updates; the second reflects both joins
    watcher.expect("presence_update").await;
    let presence = watcher.expect("presence_update").await;
    assert_eq!(presence.data["count"], 3);
    assert_eq!(presence.data["distinctUsers"], 1);

    b.send("leave", json!(null)).await;
    let presence = watcher.expect("presence_update").await;
    assert_eq!(presence.data["count"], 3);
    assert!(server.hub.is_user_online(7));
}

#[tokio::test]
async fn closing_a_socket_updates_presence() {
    let server = TestRealtime::spawn().await;
    let mut watcher = server.connect().await;
    let leaving = server.connect().await;
    assert_eq!(server.hub.socket_count(), 2);

    leaving.close().await;
    let presence = watcher.expect("presence_update").await;
    assert_eq!(presence.data["count"], 1);
}

#[tokio::test]
async fn ping_echoes_data() {
    let server = TestRealtime::spawn().await;
    let mut socket = server.connect().await;

    socket.send("ping", json!({ "t": 123 })).await;
    let pong = socket.expect("pong").await;
    assert_eq!(pong.data, json!({ "t": 123 }));
}

#[tokio::test]
async fn bad_frames_get_an_error_and_keep_the_socket_open() {
    let server = TestRealtime::spawn().await;
    let mut socket = server.connect().await;

    socket.send_raw("{not json").await;
    let error = socket.expect("error").await;
    assert!(error.data["message"].is_string());

    socket.send("teleport", json!({})).await;
    let error = socket.expect("error").await;
    assert!(error.data["message"]
        .as_str()
        .unwrap()
        .contains("teleport"));

    // Missing required leadName
    socket.send("lead_created", json!({ "createdBy": "Meera" })).await;
    socket.expect("error").await;

    socket.send("ping", json!(1)).await;
    assert_eq!(socket.expect("pong").await.data, json!(1));
}

#[tokio::test]
async fn silent_socket_is_closed_after_idle_timeout() {
    let server = TestRealtime::spawn_with(WebSocketSettings {
        heartbeat_interval_ms: 100,
        idle_grace_ms: 100,
        ..WebSocketSettings::default()
    })
    .await;
    let mut socket = server.connect().await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    // Drain until the server closes the connection
    while socket.next_frame().await.is_some() {}
    assert_eq!(server.hub.socket_count(), 0);
}
