//! Framebridge demo - drives a bridge against the in-process loopback surface.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use framebridge::infrastructure::{
    spawn_inbound_loop, ChannelTransport, FileStorage, LoopbackSurface, UnavailableSigner,
};
use framebridge::ports::{storage_keys, Storage};
use framebridge::protocol::{IncomingMessage, RequestPayload};
use framebridge::{Bridge, BridgeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framebridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        instance = %config.instance(),
        environment = ?config.environment(),
        "Starting Framebridge demo"
    );

    let storage = Arc::new(FileStorage::open(config.storage_path()).await);
    tracing::info!("Using storage at {:?}", storage.path());

    // Wire host and loopback surface together
    let (transport, envelopes) = ChannelTransport::channel(32);
    let (inbound_tx, inbound_rx) = mpsc::channel(32);

    let bridge = Bridge::connect(
        &config,
        Arc::new(transport),
        storage.clone(),
        Arc::new(UnavailableSigner),
    )
    .await?;

    let _events = bridge.on(IncomingMessage::HandleEvent, |message| {
        tracing::info!(channel_key = %message.channel_key, "Surface event");
    });

    let surface = LoopbackSurface::new(config.instance(), inbound_tx).spawn(envelopes);
    let inbound = spawn_inbound_loop(bridge.clone(), inbound_rx);

    let account = bridge
        .request(RequestPayload::new("1", "getAccount"))
        .await?
        .into_result()?;
    tracing::info!(result = %account, "Single request answered");

    let batch = bridge
        .request_batch(vec![
            RequestPayload::new("2", "getBalance").with_params(json!(["0xabc"])),
            RequestPayload::new("3", "getChainId"),
        ])
        .await?;
    for response in &batch {
        match response.error() {
            Some(error) => tracing::warn!(request_id = %response.id, %error, "Batch member failed"),
            None => tracing::info!(request_id = %response.id, result = ?response.result(), "Batch member answered"),
        }
    }

    let refresh_token = storage.get(storage_keys::REFRESH_TOKEN).await?;
    tracing::info!(refresh_token = ?refresh_token, "Stored refresh token");

    bridge.close();
    drop(bridge);
    inbound.abort();
    surface.abort();

    tracing::info!("Framebridge demo finished");
    Ok(())
}
