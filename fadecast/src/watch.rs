//! `fadecast watch`: follow a channel with two headless players

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use fadecast_client::{
    HeadlessPlayer, ReconcilerConfig, SessionTiming, SyncClient, ViewerIdentity, ViewerReconciler,
    ViewerSession,
};
use fadecast_core::models::{BroadcastCode, ChannelId, Slot};
use fadecast_core::Config;

use crate::server::shutdown_signal;

const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// A 4-digit argument is a broadcast code; anything else is a channel hash
async fn resolve_channel(client: &SyncClient, channel: &str) -> Result<ChannelId> {
    let Some(code) = BroadcastCode::parse(channel) else {
        return Ok(ChannelId::from(channel));
    };
    client
        .lookup_code(code)
        .await?
        .with_context(|| format!("No live channel with code {code}"))
}

pub async fn run(config: &Config, channel: &str, server: Option<String>) -> Result<()> {
    let server_url = server.unwrap_or_else(|| config.viewer.server_url.clone());
    let client = SyncClient::new(server_url)?;
    let channel_id = resolve_channel(&client, channel).await?;
    let viewer_id = ViewerIdentity::load_or_create(&config.viewer.viewer_id_path)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let reconciler = ViewerReconciler::new(
        ReconcilerConfig::from(&config.viewer),
        HeadlessPlayer::new(Slot::A, tx.clone()),
        HeadlessPlayer::new(Slot::B, tx),
    );
    let mut session = ViewerSession::start(
        client,
        channel_id,
        viewer_id,
        reconciler,
        rx,
        SessionTiming::from(&config.viewer),
    );

    let mut status = tokio::time::interval(STATUS_INTERVAL);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = status.tick() => {
                let view = session.view();
                info!(
                    channel_id = %session.channel_id(),
                    state = %view.connection,
                    crossfade = view.crossfade,
                    idle = view.show_idle,
                    elapsed_secs = view.elapsed_ms.map(|ms| ms / 1000),
                    playlist = view.playlist_name.as_deref().unwrap_or(""),
                    "Status"
                );
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
