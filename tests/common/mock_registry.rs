//! Mock Consul health API for testing registry discovery.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, Response, StatusCode};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A captured health lookup.
#[derive(Debug, Clone)]
pub struct CapturedLookup {
    pub service: String,
    pub query: String,
}

/// What the registry answers with.
#[derive(Debug, Clone)]
pub struct RegistryAnswer {
    pub status: u16,
    pub body: String,
}

impl RegistryAnswer {
    /// A 200 health payload with one passing entry per `(node, service, port)`.
    /// An empty service address makes the node address the one to use.
    pub fn instances(instances: &[(&str, &str, u16)]) -> Self {
        let entries: Vec<serde_json::Value> = instances
            .iter()
            .map(|(node, service, port)| {
                serde_json::json!({
                    "Node": { "Node": "node", "Address": node },
                    "Service": { "ID": "varnish-1", "Address": service, "Port": port },
                    "Checks": []
                })
            })
            .collect();
        Self {
            status: 200,
            body: serde_json::Value::Array(entries).to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn raw(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }
}

#[derive(Clone)]
struct RegistryState {
    lookups: Arc<Mutex<Vec<CapturedLookup>>>,
    answer: Arc<Mutex<RegistryAnswer>>,
}

/// Mock registry serving `/v1/health/service/{service}`.
pub struct MockRegistry {
    pub addr: SocketAddr,
    state: RegistryState,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl MockRegistry {
    pub async fn start(answer: RegistryAnswer) -> Self {
        let state = RegistryState {
            lookups: Arc::new(Mutex::new(Vec::new())),
            answer: Arc::new(Mutex::new(answer)),
        };

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

        let app = Router::new()
            .route("/v1/health/service/{service}", get(handle_lookup))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock registry");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .ok();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr,
            state,
            shutdown: shutdown_tx,
        }
    }

    /// Replace the answer for subsequent lookups.
    pub async fn answer_with(&self, answer: RegistryAnswer) {
        *self.state.answer.lock().await = answer;
    }

    pub async fn lookups(&self) -> Vec<CapturedLookup> {
        self.state.lookups.lock().await.clone()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockRegistry {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn handle_lookup(
    State(state): State<RegistryState>,
    Path(service): Path<String>,
    req: Request<Body>,
) -> Response<Body> {
    let query = req.uri().query().unwrap_or("").to_string();
    state
        .lookups
        .lock()
        .await
        .push(CapturedLookup { service, query });

    let answer = state.answer.lock().await.clone();
    Response::builder()
        .status(StatusCode::from_u16(answer.status).unwrap())
        .header("content-type", "application/json")
        .body(Body::from(answer.body))
        .unwrap()
}
