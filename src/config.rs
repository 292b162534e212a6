use std::net::SocketAddr;

use tracing::trace;

use crate::evaluator::ThresholdRule;

/// Sink backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SinkConfig {
    /// No persistence (in-memory only)
    None,

    /// InfluxDB v1 over HTTP
    Influx {
        #[serde(default = "default_influx_url")]
        url: String,

        #[serde(default = "default_influx_database")]
        database: String,

        /// Bound on a single write request
        #[serde(default = "default_sink_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Influx {
            url: default_influx_url(),
            database: default_influx_database(),
            timeout_secs: default_sink_timeout_secs(),
        }
    }
}

fn default_influx_url() -> String {
    String::from("http://localhost:8086")
}

fn default_influx_database() -> String {
    String::from("aquaponics")
}

fn default_sink_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Sink configuration (optional - defaults to influx)
    pub sink: Option<SinkConfig>,

    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_broker_url")]
    pub url: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            client_id: default_client_id(),
        }
    }
}

impl MqttConfig {
    /// Split `mqtt://host:port` (scheme and port optional) into broker
    /// host and port.
    pub fn broker_parts(&self) -> (String, u16) {
        let bare = self
            .url
            .strip_prefix("mqtt://")
            .or_else(|| self.url.strip_prefix("tcp://"))
            .unwrap_or(&self.url);

        match bare.rsplit_once(':') {
            Some((host, port)) => (host.to_string(), port.parse().unwrap_or(1883)),
            None => (bare.to_string(), 1883),
        }
    }
}

fn default_broker_url() -> String {
    String::from("mqtt://localhost:1883")
}

fn default_client_id() -> String {
    String::from("aquaguard-hub")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AlertsConfig {
    /// Minimum interval between two alerts sharing one key
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Threshold overrides; the built-in rules cover the five monitored
    /// metrics
    pub rules: Option<Vec<ThresholdRule>>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            rules: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    300_000
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8081))
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
