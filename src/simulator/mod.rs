use crate::config::SimulatorConfig;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One simulated track, serialized with the exact wire field names the
/// feed contract requires.
#[derive(Clone, Debug, Serialize)]
struct Track {
    id: String,
    #[serde(rename = "shipName")]
    ship_name: String,
    #[serde(rename = "shipNumber")]
    ship_number: String,
    longitude: f64,
    latitude: f64,
    height: f64,
    heading: f64,
    country: String,
    #[serde(rename = "type")]
    kind: String,
    attr: i64,
    time: i64,
}

const COUNTRIES: [&str; 3] = ["CN", "US", "JP"];
const KINDS: [&str; 3] = ["cargo", "tanker", "warship"];

fn seed_tracks(count: usize) -> Vec<Track> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| Track {
            id: format!("entity-{}", i + 1),
            ship_name: format!("Vessel {}", i + 1),
            ship_number: format!("TSH{:03}", i + 1),
            longitude: 116.397 + (rng.gen::<f64>() - 0.5) * 0.1,
            latitude: 39.909 + (rng.gen::<f64>() - 0.5) * 0.1,
            height: 50.0 + rng.gen::<f64>() * 50.0,
            heading: rng.gen::<f64>() * 360.0,
            country: COUNTRIES[i % COUNTRIES.len()].to_string(),
            kind: KINDS[i % KINDS.len()].to_string(),
            attr: (i % 2) as i64,
            time: Utc::now().timestamp_millis(),
        })
        .collect()
}

fn drift(tracks: &mut [Track]) {
    let mut rng = rand::thread_rng();
    for track in tracks {
        track.longitude += (rng.gen::<f64>() - 0.5) * 0.001;
        track.latitude += (rng.gen::<f64>() - 0.5) * 0.001;
        track.heading = rng.gen::<f64>() * 360.0;
        track.time = Utc::now().timestamp_millis();
    }
}

/// WebSocket router serving the mock feed at `/feed`.
pub fn router(config: SimulatorConfig) -> Router {
    Router::new()
        .route("/feed", get(ws_handler))
        .with_state(Arc::new(config))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(config): State<Arc<SimulatorConfig>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_feed(socket, config))
}

/// Push a full batch immediately, then drift and resend on every tick.
async fn serve_feed(mut socket: WebSocket, config: Arc<SimulatorConfig>) {
    info!("Simulator client connected");

    let mut tracks = seed_tracks(config.entity_count);
    let Ok(initial) = serde_json::to_string(&tracks) else {
        return;
    };
    if socket.send(Message::Text(initial)).await.is_err() {
        return;
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(config.update_interval_ms));
    ticker.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                drift(&mut tracks);
                let Ok(frame) = serde_json::to_string(&tracks) else { break };
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Clients only listen; ignore anything they send
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Simulator socket error");
                        break;
                    }
                }
            }
        }
    }

    info!("Simulator client disconnected");
}

/// Bind the configured address and serve the mock feed until shutdown.
pub async fn serve(config: SimulatorConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Feed simulator listening");
    axum::serve(listener, router(config)).await?;
    Ok(())
}
