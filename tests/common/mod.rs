//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_backend;
pub mod mock_registry;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use varnish_fwd::backend::{BackendDirectory, DirectoryError};
use varnish_fwd::config::{
    ClientConfig, Config, ListenConfig, ProviderConfig, PurgeConfig,
};
use varnish_fwd::proxy::{ForwardHandle, ForwardServer};
use varnish_fwd::refresh::RefreshCoordinator;

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// Base URL of a port nothing listens on, so connections are refused.
pub fn unreachable_url() -> String {
    format!("http://127.0.0.1:{}", free_port())
}

/// Configuration for a forwarder on an ephemeral local port with short
/// outbound timeouts.
pub fn test_config(backends: Vec<String>) -> Config {
    Config {
        listen: ListenConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
        },
        provider: ProviderConfig::Static { backends },
        refresh_interval: Duration::ZERO,
        client: ClientConfig {
            request_timeout: Duration::from_millis(500),
            connect_timeout: Duration::from_millis(250),
            ..ClientConfig::default()
        },
        purge: PurgeConfig::default(),
        max_body_bytes: 64 * 1024,
    }
}

/// Directory whose contents tests can change at runtime. Counts forced
/// refreshes.
pub struct TestDirectory {
    backends: Mutex<Vec<String>>,
    forced_refreshes: AtomicUsize,
}

impl TestDirectory {
    pub fn new(backends: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            backends: Mutex::new(backends),
            forced_refreshes: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, backends: Vec<String>) {
        *self.backends.lock() = backends;
    }

    pub fn forced_refreshes(&self) -> usize {
        self.forced_refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendDirectory for TestDirectory {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn backend_addresses(&self, force_refresh: bool) -> Result<Vec<String>, DirectoryError> {
        if force_refresh {
            self.forced_refreshes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(self.backends.lock().clone())
    }
}

/// Directory that gains one backend from `pending` on every forced
/// refresh until `pending` runs out.
pub struct GrowingDirectory {
    current: Mutex<Vec<String>>,
    pending: Mutex<VecDeque<String>>,
    forced_refreshes: AtomicUsize,
    growths: AtomicUsize,
}

impl GrowingDirectory {
    pub fn new(initial: Vec<String>, pending: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(initial),
            pending: Mutex::new(pending.into()),
            forced_refreshes: AtomicUsize::new(0),
            growths: AtomicUsize::new(0),
        })
    }

    pub fn forced_refreshes(&self) -> usize {
        self.forced_refreshes.load(Ordering::SeqCst)
    }

    /// Forced refreshes that returned a larger set than the one before.
    pub fn growths(&self) -> usize {
        self.growths.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendDirectory for GrowingDirectory {
    fn name(&self) -> &'static str {
        "growing"
    }

    async fn backend_addresses(&self, force_refresh: bool) -> Result<Vec<String>, DirectoryError> {
        let mut current = self.current.lock();
        if force_refresh {
            self.forced_refreshes.fetch_add(1, Ordering::SeqCst);
            if let Some(next) = self.pending.lock().pop_front() {
                current.push(next);
                self.growths.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(current.clone())
    }
}

/// A forwarder running in the background.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub handle: ForwardHandle,
    pub coordinator: Arc<RefreshCoordinator>,
    pub task: tokio::task::JoinHandle<()>,
}

impl RunningServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Signal shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.handle.shutdown();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}

/// Bind and run a forwarder over `directory`.
pub async fn start_server(config: Config, directory: Arc<dyn BackendDirectory>) -> RunningServer {
    let mut server = ForwardServer::new(config, directory).await.unwrap();

    // Bind before spawning so requests never race the listener
    let addr = server.try_bind().await.unwrap();
    let handle = server.handle();
    let coordinator = server.coordinator();

    let task = tokio::spawn(async move {
        server.run().await.unwrap();
    });

    RunningServer {
        addr,
        handle,
        coordinator,
        task,
    }
}

/// Poll `condition` until it holds or `timeout` expires.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
