use anyhow::Result;
use seatrack::config;
use seatrack::simulator;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatrack=info,feed_simulator=info".into()),
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

    simulator::serve(config.simulator).await
}
