//! Relay server listener
//!
//! Handles both TCP accept loops and spawns session handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{accept_async, accept_hdr_async, WebSocketStream};

use crate::error::Result;
use crate::positions::PositionStore;
use crate::server::config::RelayConfig;
use crate::session::{BrowseSession, IngestSession, Role, SessionContext};
use crate::stats::RelayStats;

/// Bus position relay
pub struct RelayServer {
    config: RelayConfig,
    store: Arc<PositionStore>,
    stats: Arc<RelayStats>,
    next_session_id: AtomicU64,
    ingest_slots: Option<Arc<Semaphore>>,
    browse_slots: Option<Arc<Semaphore>>,
}

impl RelayServer {
    /// Create a new relay with its own empty position store
    pub fn new(config: RelayConfig) -> Self {
        let slots = || {
            (config.max_connections > 0).then(|| Arc::new(Semaphore::new(config.max_connections)))
        };

        Self {
            store: Arc::new(PositionStore::with_config(config.store.clone())),
            stats: Arc::new(RelayStats::new()),
            next_session_id: AtomicU64::new(1),
            ingest_slots: slots(),
            browse_slots: slots(),
            config,
        }
    }

    /// Get a reference to the position store
    pub fn store(&self) -> &Arc<PositionStore> {
        &self.store
    }

    /// Get a reference to the relay statistics
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Run the relay
    ///
    /// This method blocks until an accept loop fails to bind.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the relay with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.config.validate()?;
        let ingest = TcpListener::bind(self.config.ingest_addr).await?;
        let browse = TcpListener::bind(self.config.browse_addr).await?;
        self.serve(ingest, browse, shutdown).await
    }

    /// Serve on already-bound listeners until `shutdown` resolves
    ///
    /// Sessions already running are not interrupted by shutdown; they end
    /// with their connections.
    pub async fn serve<F>(&self, ingest: TcpListener, browse: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.config.validate()?;

        tracing::info!(
            ingest = %ingest.local_addr()?,
            browse = %browse.local_addr()?,
            browse_path = self.config.browse_path.as_deref().unwrap_or("*"),
            "Bus relay listening"
        );

        let retention_handle = self.store.spawn_retention_task();
        let stats_handle = self.spawn_stats_task();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&ingest, Role::Ingest) => result,
            result = self.accept_loop(&browse, Role::Browse) => result,
        };

        if let Some(handle) = retention_handle {
            handle.abort();
        }
        stats_handle.abort();

        result
    }

    async fn accept_loop(&self, listener: &TcpListener, role: Role) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr, role);
                }
                Err(e) => {
                    tracing::error!(role = %role, error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr, role: Role) {
        let slots = match role {
            Role::Ingest => &self.ingest_slots,
            Role::Browse => &self.browse_slots,
        };

        // Check connection limit
        let permit = if let Some(sem) = slots {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, role = %role, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            role = %role,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let ctx = SessionContext::new(session_id, peer_addr, role);
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let browse_path = self.config.browse_path.clone();
        let publish_interval = self.config.publish_interval;

        tokio::spawn(async move {
            let _permit = permit;
            let _active = stats.session_opened(role);

            let result = match role {
                Role::Ingest => match handshake(socket, None).await {
                    Ok(ws) => {
                        IngestSession::new(ctx, ws, store, Arc::clone(&stats))
                            .run()
                            .await
                    }
                    Err(e) => Err(e),
                },
                Role::Browse => match handshake(socket, browse_path.as_deref()).await {
                    Ok(ws) => {
                        BrowseSession::new(ctx, ws, store, Arc::clone(&stats), publish_interval)
                            .run()
                            .await
                    }
                    Err(e) => Err(e),
                },
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_disconnect() => {
                    tracing::debug!(session_id = session_id, "Peer went away");
                }
                Err(e) => {
                    tracing::warn!(session_id = session_id, error = %e, "Connection error");
                }
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }

    fn spawn_stats_task(&self) -> tokio::task::JoinHandle<()> {
        let stats = Arc::clone(&self.stats);
        let store = Arc::clone(&self.store);
        let interval = self.config.stats_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let buses = store.len().await;
                let snapshot = stats.snapshot();
                tracing::info!(
                    buses = buses,
                    ingest_sessions = snapshot.active_ingest,
                    browse_sessions = snapshot.active_browse,
                    updates_accepted = snapshot.updates_accepted,
                    updates_rejected = snapshot.updates_rejected,
                    snapshots_sent = snapshot.snapshots_sent,
                    uptime_secs = snapshot.uptime.as_secs(),
                    "Relay stats"
                );
            }
        })
    }
}

/// Complete the websocket handshake, optionally requiring a request path
async fn handshake(socket: TcpStream, path: Option<&str>) -> Result<WebSocketStream<TcpStream>> {
    let Some(expected) = path else {
        return Ok(accept_async(socket).await?);
    };

    let ws = accept_hdr_async(socket, |request: &Request, response: Response| {
        if request.uri().path() == expected {
            Ok(response)
        } else {
            tracing::debug!(path = request.uri().path(), "Handshake rejected: unknown path");
            let mut rejection = ErrorResponse::new(Some("Not Found".to_owned()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    })
    .await?;

    Ok(ws)
}
