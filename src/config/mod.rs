use serde::Deserialize;
use std::time::Duration;

/// Complete seatrack configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SeatrackConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Feed client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Window after which an unrefreshed entity is dropped (milliseconds)
    #[serde(default = "default_entity_timeout_ms")]
    pub entity_timeout_ms: u64,
    /// Fixed delay between reconnect attempts (milliseconds)
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_endpoint() -> String {
    "ws://127.0.0.1:3001/feed".to_string()
}

fn default_entity_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_interval_ms() -> u64 {
    3_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

impl FeedConfig {
    pub fn entity_timeout(&self) -> Duration {
        Duration::from_millis(self.entity_timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            entity_timeout_ms: default_entity_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

/// Mock feed simulator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_entity_count")]
    pub entity_count: usize,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_entity_count() -> usize {
    10
}

fn default_update_interval_ms() -> u64 {
    500
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            entity_count: default_entity_count(),
            update_interval_ms: default_update_interval_ms(),
        }
    }
}

impl Default for SeatrackConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<SeatrackConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: SeatrackConfig = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SeatrackConfig::default();
        assert_eq!(config.feed.endpoint, "ws://127.0.0.1:3001/feed");
        assert_eq!(config.feed.entity_timeout_ms, 10_000);
        assert_eq!(config.feed.reconnect_interval_ms, 3_000);
        assert_eq!(config.feed.max_reconnect_attempts, 5);
        assert_eq!(config.simulator.bind_addr, "127.0.0.1:3001");
        assert_eq!(config.simulator.entity_count, 10);
        assert_eq!(config.simulator.update_interval_ms, 500);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [feed]
            endpoint = "ws://tracker.example.com:9000/feed"
            entity_timeout_ms = 5000
            reconnect_interval_ms = 1000
            max_reconnect_attempts = 3

            [simulator]
            bind_addr = "0.0.0.0:3002"
            entity_count = 25
            update_interval_ms = 250
        "#;

        let config: SeatrackConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.feed.endpoint, "ws://tracker.example.com:9000/feed");
        assert_eq!(config.feed.entity_timeout_ms, 5000);
        assert_eq!(config.feed.max_reconnect_attempts, 3);
        assert_eq!(config.simulator.entity_count, 25);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections and fields fall back to defaults
        let toml = r#"
            [feed]
            entity_timeout_ms = 2000
        "#;

        let config: SeatrackConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.feed.entity_timeout_ms, 2000);
        assert_eq!(config.feed.endpoint, "ws://127.0.0.1:3001/feed"); // Default
        assert_eq!(config.simulator.entity_count, 10); // Default
    }

    #[test]
    fn test_duration_accessors() {
        let config = FeedConfig::default();
        assert_eq!(config.entity_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.reconnect_interval(), Duration::from_millis(3_000));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[feed]\nendpoint = \"ws://localhost:4000/feed\"\nmax_reconnect_attempts = 1"
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.feed.endpoint, "ws://localhost:4000/feed");
        assert_eq!(config.feed.max_reconnect_attempts, 1);
        assert_eq!(config.feed.entity_timeout_ms, 10_000);
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("/nonexistent/seatrack.toml").is_err());
    }
}
