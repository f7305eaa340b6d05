//! End-to-end tests against a relay bound to loopback ports

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bus_relay::client::Waypoint;
use bus_relay::{ChannelMultiplexer, EmulatorConfig, Position, RelayConfig, RelayServer, Route};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Relay {
    server: Arc<RelayServer>,
    ingest: SocketAddr,
    browse: SocketAddr,
}

async fn start_relay() -> Relay {
    let ingest_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let browse_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ingest = ingest_listener.local_addr().unwrap();
    let browse = browse_listener.local_addr().unwrap();

    let config = RelayConfig::default().publish_interval(Duration::from_millis(50));
    let server = Arc::new(RelayServer::new(config));
    let running = Arc::clone(&server);
    tokio::spawn(async move {
        running
            .serve(ingest_listener, browse_listener, std::future::pending())
            .await
    });

    Relay {
        server,
        ingest,
        browse,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

async fn next_of(client: &mut Client, msg_type: &str) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(3), client.next())
            .await
            .expect("no message within deadline")
            .expect("stream ended")
            .expect("transport error");
        let value: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        if value["msgType"] == msg_type {
            return value;
        }
    }
}

async fn send_bounds(browser: &mut Client, south: f64, north: f64, west: f64, east: f64) {
    let bounds = json!({
        "msgType": "newBounds",
        "data": {"south_lat": south, "north_lat": north, "west_lng": west, "east_lng": east},
    });
    browser.send(Message::text(bounds.to_string())).await.unwrap();
}

/// Read `Buses` messages until one satisfies `pred`
async fn wait_for_buses(browser: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..60 {
        let message = next_of(browser, "Buses").await;
        if pred(&message["buses"]) {
            return message;
        }
    }
    panic!("expected buses never published");
}

#[tokio::test]
async fn test_bus_to_browser() {
    let relay = start_relay().await;
    let mut bus = connect(relay.ingest).await;
    let mut browser = connect(relay.browse).await;

    bus.send(Message::text(
        r#"{"busId":"120-0","lat":55.75,"lng":37.6,"route":"120"}"#,
    ))
    .await
    .unwrap();
    bus.send(Message::text(
        r#"{"busId":"far-0","lat":59.93,"lng":30.31,"route":"7"}"#,
    ))
    .await
    .unwrap();

    send_bounds(&mut browser, 55.7, 55.8, 37.5, 37.7).await;

    let message = wait_for_buses(&mut browser, |buses| buses.as_array().is_some_and(|b| !b.is_empty())).await;
    assert_eq!(
        message["buses"],
        json!([{"busId": "120-0", "lat": 55.75, "lng": 37.6, "route": "120"}])
    );
}

#[tokio::test]
async fn test_browse_error_sequence() {
    let relay = start_relay().await;
    relay
        .server
        .store()
        .upsert(Position::new("a", 55.75, 37.6, "120"))
        .await;
    let mut browser = connect(relay.browse).await;

    browser.send(Message::text("not json")).await.unwrap();
    assert!(next_of(&mut browser, "Errors").await["errors"][0]
        .as_str()
        .unwrap()
        .contains("valid JSON"));

    browser.send(Message::text("{}")).await.unwrap();
    assert!(next_of(&mut browser, "Errors").await["errors"][0]
        .as_str()
        .unwrap()
        .contains("msgType"));

    browser.send(Message::text(r#"{"msgType":"Ping"}"#)).await.unwrap();
    assert!(next_of(&mut browser, "Errors").await["errors"][0]
        .as_str()
        .unwrap()
        .contains("Unsupported"));

    send_bounds(&mut browser, 55.7, 55.8, 37.5, 37.7).await;
    wait_for_buses(&mut browser, |buses| buses[0]["busId"] == "a").await;
}

#[tokio::test]
async fn test_garbage_ingest_does_not_break_relay() {
    let relay = start_relay().await;
    let mut bus = connect(relay.ingest).await;
    let mut browser = connect(relay.browse).await;
    send_bounds(&mut browser, -90.0, 90.0, -180.0, 180.0).await;

    bus.send(Message::text("not a json")).await.unwrap();
    bus.send(Message::text(r#"{"lat":55.75,"lng":37.61,"route":"132"}"#))
        .await
        .unwrap();
    bus.send(Message::text(
        r#"{"busId":"test-good","lat":55.751244,"lng":37.618423,"route":"132"}"#,
    ))
    .await
    .unwrap();

    let message = wait_for_buses(&mut browser, |buses| buses.as_array().is_some_and(|b| !b.is_empty())).await;
    assert_eq!(message["buses"].as_array().unwrap().len(), 1);
    assert_eq!(message["buses"][0]["busId"], "test-good");

    let stats = relay.server.stats().snapshot();
    assert_eq!(stats.updates_rejected, 2);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let relay = start_relay().await;
    let mut near = connect(relay.browse).await;
    let mut elsewhere = connect(relay.browse).await;
    relay
        .server
        .store()
        .upsert(Position::new("a", 55.75, 37.6, "120"))
        .await;

    send_bounds(&mut near, 55.7, 55.8, 37.5, 37.7).await;
    send_bounds(&mut elsewhere, 59.0, 60.0, 30.0, 31.0).await;

    wait_for_buses(&mut near, |buses| buses[0]["busId"] == "a").await;

    // A browser vanishing mid-session leaves the others running
    drop(near);
    next_of(&mut elsewhere, "Buses").await;
    let later = next_of(&mut elsewhere, "Buses").await;
    assert_eq!(later["buses"], json!([]));
}

#[tokio::test]
async fn test_fleet_through_relay() {
    let relay = start_relay().await;
    let mut browser = connect(relay.browse).await;
    send_bounds(&mut browser, 55.0, 56.0, 37.0, 38.0).await;

    let route = Route::new(
        "156",
        vec![
            Waypoint { lat: 55.70, lng: 37.50 },
            Waypoint { lat: 55.71, lng: 37.51 },
            Waypoint { lat: 55.72, lng: 37.52 },
            Waypoint { lat: 55.73, lng: 37.53 },
        ],
    );
    let config = EmulatorConfig::new(format!("ws://{}", relay.ingest))
        .websockets_number(2)
        .channel_capacity(2)
        .buses_per_route(3)
        .refresh_timeout(Duration::from_millis(20))
        .start_jitter(Duration::from_millis(20));
    let fleet = ChannelMultiplexer::start(&config, vec![route]).unwrap();

    wait_for_buses(&mut browser, |buses| buses.as_array().is_some_and(|b| b.len() == 3)).await;

    let ids: Vec<String> = relay
        .server
        .store()
        .snapshot()
        .await
        .into_iter()
        .map(|p| p.bus_id)
        .collect();
    assert_eq!(ids, vec!["156-0", "156-1", "156-2"]);

    fleet.shutdown().await;
}
