//! Common utilities for integration tests
//!
//! Starts a relay and fake devices in-process on ephemeral ports.

#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use device_relay::config::RelayConfig;
use device_relay::relay::server::{create_router, AppState};
use futures_util::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay running in the test's runtime
pub struct TestRelay {
    pub base_url: String,
    pub ws_url: String,
    pub state: AppState,
}

pub fn test_config() -> RelayConfig {
    RelayConfig {
        host: "127.0.0.1".to_string(),
        poll_interval: POLL_INTERVAL,
        poll_timeout: Duration::from_millis(300),
        ..RelayConfig::default()
    }
}

pub async fn start_relay(config: RelayConfig) -> TestRelay {
    let state = AppState::new(&config).unwrap();
    let app = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestRelay {
        base_url: format!("http://{}", addr),
        ws_url: format!("ws://{}/ws", addr),
        state,
    }
}

impl TestRelay {
    pub async fn register(&self, id: &str, device: &FakeDevice) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/devices", self.base_url))
            .json(&serde_json::json!({
                "id": id,
                "type": "switch",
                "ip": "127.0.0.1",
                "port": device.port,
            }))
            .send()
            .await
            .unwrap()
    }

    pub async fn list(&self) -> Vec<Value> {
        reqwest::get(format!("{}/devices", self.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    pub async fn remove(&self, id: &str) -> Value {
        reqwest::Client::new()
            .delete(format!("{}/devices/{}", self.base_url, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Connect a WebSocket subscriber and wait until the relay has it
    pub async fn subscribe(&self) -> WsClient {
        let before = self.state.broadcaster.subscriber_count().await;
        let (ws, _) = connect_async(&self.ws_url).await.unwrap();
        wait_until(|| async { self.state.broadcaster.subscriber_count().await > before }).await;
        ws
    }
}

/// Device whose `/status` answer can be changed during a test.
/// `None` makes it answer 503.
#[derive(Clone)]
pub struct FakeDevice {
    pub port: u16,
    status: Arc<Mutex<Option<Value>>>,
    hits: Arc<AtomicUsize>,
}

impl FakeDevice {
    pub async fn start(initial: Option<Value>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let device = FakeDevice {
            port: listener.local_addr().unwrap().port(),
            status: Arc::new(Mutex::new(initial)),
            hits: Arc::new(AtomicUsize::new(0)),
        };
        let app = Router::new()
            .route("/status", get(fake_status))
            .with_state(device.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        device
    }

    pub fn set_status(&self, status: Option<Value>) {
        *self.status.lock().unwrap() = status;
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn wait_for_hits(&self, count: usize) {
        wait_until(|| async { self.hits() >= count }).await;
    }
}

async fn fake_status(State(device): State<FakeDevice>) -> impl IntoResponse {
    device.hits.fetch_add(1, Ordering::SeqCst);
    match device.status.lock().unwrap().clone() {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Poll `condition` every 10ms for up to 5 seconds
pub async fn wait_until<F, Fut>(condition: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 5 seconds");
}

/// Next text frame as JSON, or None if nothing arrives within `wait`
pub async fn next_event(ws: &mut WsClient, wait: Duration) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}
