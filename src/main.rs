use anyhow::Result;
use seatrack::config;
use seatrack::connection::FeedClient;
use seatrack::hub::{FeedEvent, FeedEventKind};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatrack=info".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "seatrack.toml".to_string());
    let config = match config::load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            info!(path = %path, error = %e, "No config file loaded, using defaults");
            config::SeatrackConfig::default()
        }
    };

    let client = FeedClient::with_policy(
        &config.feed.endpoint,
        config.feed.entity_timeout(),
        config.feed.reconnect_interval(),
        config.feed.max_reconnect_attempts,
    );

    client.subscribe(
        FeedEventKind::StatusChange,
        Arc::new(|event| {
            if let FeedEvent::StatusChange(status) = event {
                info!(?status, "Feed status changed");
            }
        }),
    );
    client.subscribe(
        FeedEventKind::EntityUpdate,
        Arc::new(|event| {
            if let FeedEvent::EntityUpdate(record) = event {
                info!(
                    entity_id = %record.id,
                    lon = record.longitude,
                    lat = record.latitude,
                    "Entity updated"
                );
            }
        }),
    );
    client.subscribe(
        FeedEventKind::EntityRemove,
        Arc::new(|event| {
            if let FeedEvent::EntityRemove(record) = event {
                info!(entity_id = %record.id, "Entity expired");
            }
        }),
    );

    info!(endpoint = %config.feed.endpoint, "Seatrack starting");
    client.connect();

    tokio::signal::ctrl_c().await?;
    client.disconnect();
    info!("Seatrack stopped");

    Ok(())
}
