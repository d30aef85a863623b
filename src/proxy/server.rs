use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::backend::{BackendDirectory, BackendSet};
use crate::config::Config;
use crate::proxy::dispatcher::Dispatcher;
use crate::proxy::error::ServerError;
use crate::proxy::router::{build_router, RouterEngine};
use crate::proxy::upstream::UpstreamClient;
use crate::refresh::{spawn_refresh_worker, PurgeBroadcaster, RefreshCoordinator, TopologyWatcher};
use crate::shutdown::{cancelled, ShutdownManager};

/// The broadcasting forwarder: inbound listener plus its background tasks.
pub struct ForwardServer {
    pub addr: SocketAddr,
    /// The bound listener, populated by try_bind(), consumed by run().
    listener: Option<TcpListener>,
    config: Config,
    coordinator: Arc<RefreshCoordinator>,
    upstream: Arc<UpstreamClient>,
    purger: Arc<PurgeBroadcaster>,
    shutdown: Arc<ShutdownManager>,
}

impl ForwardServer {
    /// Build the forwarder and populate the first backend snapshot.
    ///
    /// # Errors
    /// Fails when the directory cannot produce a valid, non-empty backend
    /// set, or when the outbound client cannot be built. Both are fatal.
    pub async fn new(
        config: Config,
        directory: Arc<dyn BackendDirectory>,
    ) -> Result<Self, ServerError> {
        let coordinator = Arc::new(RefreshCoordinator::initialize(directory).await?);
        let upstream = Arc::new(UpstreamClient::new(&config.client).map_err(ServerError::Client)?);
        let purger = Arc::new(
            PurgeBroadcaster::new(upstream.clone(), &config.purge).map_err(ServerError::PurgeTags)?,
        );

        Ok(Self {
            addr: config.listen.socket_addr(),
            listener: None,
            config,
            coordinator,
            upstream,
            purger,
            shutdown: Arc::new(ShutdownManager::new()),
        })
    }

    pub fn backends(&self) -> BackendSet {
        self.coordinator.snapshot()
    }

    pub fn coordinator(&self) -> Arc<RefreshCoordinator> {
        self.coordinator.clone()
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownManager> {
        self.shutdown.clone()
    }

    pub fn handle(&self) -> ForwardHandle {
        ForwardHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Bind the configured listen address. Port 0 picks a free port, and
    /// `addr` is updated with the bound address.
    pub async fn try_bind(&mut self) -> Result<SocketAddr, ServerError> {
        let addr = self.config.listen.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind { addr, source: e })?;
        let bound = listener
            .local_addr()
            .map_err(|e| ServerError::Bind { addr, source: e })?;

        self.addr = bound;
        self.listener = Some(listener);
        tracing::info!("Forwarder bound to {}", bound);
        Ok(bound)
    }

    /// Serve until shutdown, then stop the background tasks.
    ///
    /// Consumes self to take ownership of the pre-bound listener.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.listener.ok_or(ServerError::NotBound)?;

        let (refresh, refresh_worker) =
            spawn_refresh_worker(self.coordinator.clone(), self.shutdown.subscribe());
        let watcher = TopologyWatcher::new(
            self.coordinator.clone(),
            self.purger.clone(),
            self.config.refresh_interval,
        )
        .spawn(self.shutdown.subscribe());

        let dispatcher = Arc::new(Dispatcher::new(
            self.upstream.clone(),
            self.coordinator.clone(),
            refresh,
        ));
        let app = build_router(RouterEngine::new(dispatcher, self.config.max_body_bytes));

        tracing::info!("Starting server on {}", self.addr);

        let shutdown = self.shutdown.clone();
        let serve = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                if let Err(e) = shutdown.wait_for_shutdown().await {
                    tracing::error!(error = %e, "Failed to install signal handlers");
                    cancelled(&mut shutdown.subscribe()).await;
                }
            })
            .into_future();
        tokio::pin!(serve);

        let mut stop = self.shutdown.subscribe();
        let drain_timeout = self.shutdown.drain_timeout();
        let forced_stop = async {
            cancelled(&mut stop).await;
            tokio::time::sleep(drain_timeout).await;
        };

        let result = tokio::select! {
            result = &mut serve => result.map_err(ServerError::Serve),
            _ = forced_stop => {
                tracing::warn!("Forced shutdown after {:?} drain timeout", drain_timeout);
                Ok(())
            }
        };

        // Background tasks follow the server down whichever way it stopped
        self.shutdown.signal_shutdown();
        if let Err(e) = refresh_worker.await {
            tracing::error!(error = %e, "Refresh worker task failed");
        }
        if let Some(watcher) = watcher {
            watcher.join().await;
        }

        tracing::info!("Shutting down gracefully");
        result
    }
}

#[derive(Clone)]
pub struct ForwardHandle {
    shutdown: Arc<ShutdownManager>,
}

impl ForwardHandle {
    pub fn shutdown(&self) {
        self.shutdown.signal_shutdown();
    }
}
