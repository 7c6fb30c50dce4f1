//! End-to-end tests against a live listener

use api::{create_router, serve, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use storage::ReadingRepository;
use tokio::sync::oneshot;

struct TestServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let repository = ReadingRepository::in_memory().await.unwrap();
        let app = create_router(Arc::new(AppState::new(repository, 20)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, app, async move {
            let _ = rx.await;
        }));

        Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_sensor_node_push_then_dashboard_poll() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/data"))
        .json(&json!({"temperature": 23.5, "humidity": 60.1, "gas": 412}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"message": "Data received successfully!"}));

    let response = client.get(server.url("/data")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let readings: Vec<Value> = response.json().await.unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0]["temperature"], json!(23.5));
    assert_eq!(readings[0]["humidity"], json!(60.1));
    assert_eq!(readings[0]["gas_level"], json!(412));
    assert!(!readings[0]["id"].is_null());
    assert!(!readings[0]["timestamp"].is_null());

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_invalid_body_over_the_wire() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/data"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Invalid data"}));

    let readings: Vec<Value> = client
        .get(server.url("/data"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(readings.is_empty());

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_cors_headers_present() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("/data"))
        .header("Origin", "http://dashboard.local")
        .send()
        .await
        .unwrap();
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));

    drop(client);
    server.stop().await;
}
