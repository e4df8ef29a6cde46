//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use hireme_auth::config::AppConfig;
use hireme_auth::http::HttpServer;
use hireme_auth::lifecycle::{build_state, AppServices, Shutdown};

/// In-process stand-in for the remote document API.
#[derive(Default)]
pub struct MockDocumentStore {
    docs: Mutex<Vec<Value>>,
    /// Answer every request with 503 while set.
    pub down: AtomicBool,
    /// Fail this many upcoming actions with 500.
    pub fail_next: AtomicU32,
    /// Answer every action with this status while non-zero.
    pub fail_status: AtomicU16,
    pub action_calls: AtomicU32,
    pub last_api_key: Mutex<Option<String>>,
    pub last_envelope: Mutex<Option<Value>>,
}

impl MockDocumentStore {
    pub fn documents(&self) -> Vec<Value> {
        self.docs.lock().unwrap().clone()
    }

    pub fn insert(&self, doc: Value) {
        self.docs.lock().unwrap().push(doc);
    }

    fn record(&self, headers: &HeaderMap, body: &Value) -> Result<(), StatusCode> {
        *self.last_api_key.lock().unwrap() = headers
            .get("api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *self.last_envelope.lock().unwrap() = Some(body.clone());
        self.action_calls.fetch_add(1, Ordering::SeqCst);

        if self.down.load(Ordering::SeqCst) {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        let forced = self.fail_status.load(Ordering::SeqCst);
        if forced != 0 {
            return Err(StatusCode::from_u16(forced).unwrap());
        }
        let pending = self.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Ok(())
    }
}

fn matches(doc: &Value, filter: &Value) -> bool {
    filter
        .as_object()
        .map(|f| f.iter().all(|(k, v)| doc.get(k) == Some(v)))
        .unwrap_or(false)
}

async fn ping(State(mock): State<Arc<MockDocumentStore>>) -> StatusCode {
    if mock.down.load(Ordering::SeqCst) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn find_one(
    State(mock): State<Arc<MockDocumentStore>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    mock.record(&headers, &body)?;
    let docs = mock.docs.lock().unwrap();
    let found = docs.iter().find(|d| matches(d, &body["filter"])).cloned();
    Ok(Json(json!({ "document": found })))
}

async fn insert_one(
    State(mock): State<Arc<MockDocumentStore>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    mock.record(&headers, &body)?;
    let doc = body["document"].clone();
    let id = doc["id"].clone();
    mock.docs.lock().unwrap().push(doc);
    Ok((StatusCode::CREATED, Json(json!({ "insertedId": id }))))
}

/// Start the mock document API on an ephemeral port.
pub async fn start_mock_document_store() -> (String, Arc<MockDocumentStore>) {
    let mock = Arc::new(MockDocumentStore::default());
    let app = Router::new()
        .route("/ping", get(ping))
        .route("/action/findOne", post(find_one))
        .route("/action/insertOne", post(insert_one))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}", addr), mock)
}

/// Test defaults: cheap hashing, fast retries, users file under `dir`.
pub fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.hashing.cost = 4;
    config.store.data_path = Some(dir.join("users.json").display().to_string());
    config.retries.initial_delay_ms = 1;
    config.retries.max_delay_ms = 5;
    config.store.remote.timeout_ms = 1_000;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.rate_limit.enabled = false;
    config
}

/// A running service instance.
pub struct TestApp {
    pub addr: SocketAddr,
    pub services: AppServices,
    pub shutdown: Shutdown,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build the services from `config` and serve them on an ephemeral port.
pub async fn spawn_app(config: AppConfig) -> TestApp {
    let services = build_state(&config).await.unwrap();
    let shutdown = Shutdown::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, services.store.clone());
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    TestApp {
        addr,
        services,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
