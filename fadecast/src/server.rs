//! Server lifecycle management
//!
//! Manages the startup and shutdown of:
//! - HTTP server (sync endpoint and presence)
//! - presence sweeper

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fadecast_api::{create_router, AppState};
use fadecast_core::{
    service::{ChannelStateStore, PresenceTracker},
    Config,
};

pub struct FadecastServer {
    config: Config,
    store: ChannelStateStore,
    presence: PresenceTracker,
    cancel_token: CancellationToken,
}

impl FadecastServer {
    pub fn new(config: Config) -> Self {
        let presence = PresenceTracker::new(config.presence.ttl());
        Self {
            config,
            store: ChannelStateStore::new(),
            presence,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Start all components and wait for a shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = self
            .presence
            .spawn_sweeper(self.config.presence.sweep_interval(), self.cancel_token.clone());
        info!(
            ttl_secs = self.config.presence.ttl_secs,
            sweep_interval_secs = self.config.presence.sweep_interval_secs,
            "Presence sweeper started"
        );

        let mut http_handle = self.start_http_server(shutdown_rx).await?;
        info!("All servers started successfully");

        tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        // Signal all components to shut down
        let _ = shutdown_tx.send(true);
        self.cancel_token.cancel();

        let grace = Duration::from_secs(self.config.server.shutdown_grace_secs);
        if !http_handle.is_finished() && tokio::time::timeout(grace, &mut http_handle).await.is_err() {
            warn!(grace_secs = grace.as_secs(), "HTTP server did not drain in time, aborting");
            http_handle.abort();
        }
        if let Err(e) = sweeper.await {
            warn!("Presence sweeper task failed: {}", e);
        }

        info!(channels = self.store.len(), "fadecast server stopped");
        Ok(())
    }

    /// Bind and serve HTTP with graceful shutdown support
    async fn start_http_server(&self, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<JoinHandle<()>> {
        let http_address = self.config.http_address();
        let http_addr: std::net::SocketAddr = http_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HTTP address '{http_address}': {e}"))?;
        let listener = tokio::net::TcpListener::bind(http_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_addr}: {e}"))?;

        let router = create_router(AppState::new(self.store.clone(), self.presence.clone()));

        let handle = tokio::spawn(async move {
            info!("HTTP server listening on {}", http_addr);

            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        Ok(handle)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
