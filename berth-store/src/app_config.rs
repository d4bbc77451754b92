use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub kafka: Option<KafkaConfig>,
    #[serde(default)]
    pub seatmaps: Option<SeatMapsConfig>,
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeatMapsConfig {
    /// JSON file mapping event ids to seat maps, loaded once at startup.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_hold_ttl_minutes")]
    pub default_hold_ttl_minutes: i64,
    #[serde(default = "default_max_hold_ttl_minutes")]
    pub max_hold_ttl_minutes: i64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_hold_ttl_minutes() -> i64 {
    15
}

fn default_max_hold_ttl_minutes() -> i64 {
    60
}

fn default_sweep_interval_seconds() -> u64 {
    30
}

fn default_broadcast_capacity() -> usize {
    100
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_mirror_timeout_ms")]
    pub mirror_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mirror_timeout_ms: default_mirror_timeout_ms(),
        }
    }
}

fn default_mirror_timeout_ms() -> u64 {
    2000
}

impl Config {
    /// Layered load: `config/default` then `config/{RUN_MODE}` (optional)
    /// then `config/local` (optional, not checked in) then `BERTH__`
    /// environment variables, e.g. `BERTH__SERVER__PORT=8080`.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("BERTH").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
