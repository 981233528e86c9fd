//! Configuration loading from environment variables and an optional TOML file
//!
//! Precedence (highest first):
//! 1. Environment variables (`MQTT_BROKER_IP`, `NTFY_TOPIC`, ...)
//! 2. TOML file given by `--config <path>` or `CONFIG_FILE`
//! 3. Built-in defaults
//!
//! Empty environment values count as unset.

use crate::services::state_tracker::EvictionPolicy;
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Topic Frigate publishes object events on
pub const EVENTS_TOPIC: &str = "frigate/events";

pub const ENV_CONFIG_FILE: &str = "CONFIG_FILE";
pub const ENV_MQTT_BROKER_IP: &str = "MQTT_BROKER_IP";
pub const ENV_MQTT_BROKER_PORT: &str = "MQTT_BROKER_PORT";
pub const ENV_MQTT_CLIENT_ID: &str = "MQTT_CLIENT_ID";
pub const ENV_MQTT_BROKER_USERNAME: &str = "MQTT_BROKER_USERNAME";
pub const ENV_MQTT_BROKER_PASSWORD: &str = "MQTT_BROKER_PASSWORD";
pub const ENV_NTFY_SERVER_URL: &str = "NTFY_SERVER_URL";
pub const ENV_NTFY_TOPIC: &str = "NTFY_TOPIC";
pub const ENV_NTFY_USERNAME: &str = "NTFY_USERNAME";
pub const ENV_NTFY_PASSWORD: &str = "NTFY_PASSWORD";
pub const ENV_NTFY_MAX_RETRIES: &str = "NTFY_MAX_RETRIES";
pub const ENV_NOTIFY_QUEUE_SIZE: &str = "NOTIFY_QUEUE_SIZE";
pub const ENV_MESSAGE_TIMEOUT: &str = "MESSAGE_TIMEOUT";
pub const ENV_FRIGATE_BASE_URL: &str = "FRIGATE_BASE_URL";
pub const ENV_STATE_EVICTION: &str = "STATE_EVICTION";
pub const ENV_STATE_TTL_SECS: &str = "STATE_TTL_SECS";
pub const ENV_METRICS_INTERVAL_SECS: &str = "METRICS_INTERVAL_SECS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_MQTT_HOST: &str = "eclipse-mosquitto";
const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_MQTT_CLIENT_ID: &str = "frigate-mqtt-notifier";
const DEFAULT_NTFY_SERVER_URL: &str = "https://ntfy.sh";
const DEFAULT_NTFY_TOPIC: &str = "frigate-events";
const DEFAULT_NTFY_MAX_RETRIES: u32 = 2;
const DEFAULT_NOTIFY_QUEUE_SIZE: usize = 100;
const DEFAULT_MESSAGE_TIMEOUT_SECS: f64 = 1.0;
const DEFAULT_FRIGATE_BASE_URL: &str = "http://frigate:5000";
const DEFAULT_STATE_TTL_SECS: u64 = 3600;
const DEFAULT_METRICS_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MqttConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NtfyConfig {
    pub server_url: Option<String>,
    pub topic: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Retries after a failed send (transport errors, 5xx, 429)
    pub max_retries: Option<u32>,
    /// Capacity of the outbound notification queue
    pub queue_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FrigateConfig {
    /// Base URL used to build snapshot/clip links
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NotifierConfig {
    /// Minimum gap between processed messages, in seconds
    pub message_timeout_secs: Option<f64>,
    /// never | on_end | ttl
    pub state_eviction: Option<String>,
    pub state_ttl_secs: Option<u64>,
    /// Metrics log interval (0 to disable)
    pub metrics_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TomlConfig {
    pub mqtt: MqttConfig,
    pub ntfy: NtfyConfig,
    pub frigate: FrigateConfig,
    pub notifier: NotifierConfig,
    pub log: LogConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    config_file: Option<String>,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_client_id: String,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    ntfy_server_url: String,
    ntfy_topic: String,
    ntfy_username: Option<String>,
    ntfy_password: Option<String>,
    ntfy_max_retries: u32,
    notify_queue_size: usize,
    message_timeout_secs: f64,
    frigate_base_url: String,
    state_eviction: EvictionPolicy,
    metrics_interval_secs: u64,
    log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file: None,
            mqtt_host: DEFAULT_MQTT_HOST.to_string(),
            mqtt_port: DEFAULT_MQTT_PORT,
            mqtt_client_id: DEFAULT_MQTT_CLIENT_ID.to_string(),
            mqtt_username: None,
            mqtt_password: None,
            ntfy_server_url: DEFAULT_NTFY_SERVER_URL.to_string(),
            ntfy_topic: DEFAULT_NTFY_TOPIC.to_string(),
            ntfy_username: None,
            ntfy_password: None,
            ntfy_max_retries: DEFAULT_NTFY_MAX_RETRIES,
            notify_queue_size: DEFAULT_NOTIFY_QUEUE_SIZE,
            message_timeout_secs: DEFAULT_MESSAGE_TIMEOUT_SECS,
            frigate_base_url: DEFAULT_FRIGATE_BASE_URL.to_string(),
            state_eviction: EvictionPolicy::Never,
            metrics_interval_secs: DEFAULT_METRICS_INTERVAL_SECS,
            log_level: Level::INFO,
        }
    }
}

/// Non-empty, trimmed value for `key`
fn lookup_value<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse `key` if set; a value that does not parse is an error naming the key
fn parse_value<F, T>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup_value(lookup, key)
        .map(|raw| raw.parse::<T>().map_err(|e| anyhow!("invalid {}={:?}: {}", key, raw, e)))
        .transpose()
}

/// Map a `LOG_LEVEL` name to a tracing level. Unknown names fall back to INFO.
pub fn parse_log_level(name: &str) -> Level {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARNING" | "WARN" => Level::WARN,
        "ERROR" | "CRITICAL" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn parse_eviction(mode: &str, ttl_secs: u64) -> anyhow::Result<EvictionPolicy> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "never" | "none" => Ok(EvictionPolicy::Never),
        "on_end" | "end" => Ok(EvictionPolicy::OnEnd),
        "ttl" => {
            if ttl_secs == 0 {
                bail!("{} must be greater than 0 when {}=ttl", ENV_STATE_TTL_SECS, ENV_STATE_EVICTION);
            }
            Ok(EvictionPolicy::Ttl(Duration::from_secs(ttl_secs)))
        }
        other => bail!("invalid {}={:?}: expected never, on_end or ttl", ENV_STATE_EVICTION, other),
    }
}

impl Config {
    /// Config file from `--config`, else `CONFIG_FILE`, else none
    pub fn resolve_config_path(cli_path: Option<&str>) -> Option<String> {
        cli_path
            .map(str::to_string)
            .or_else(|| env::var(ENV_CONFIG_FILE).ok().filter(|p| !p.is_empty()))
    }

    /// Read and parse a TOML config file
    pub fn read_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<TomlConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load configuration from a TOML file only (no environment overrides)
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let toml_config = Self::read_toml(&path)?;
        let mut config = Self::from_sources(toml_config, |_| None)?;
        config.config_file = Some(path.as_ref().display().to_string());
        Ok(config)
    }

    /// Merge file values with values from `lookup` (normally the process environment)
    pub fn from_sources<F>(file: TomlConfig, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let TomlConfig { mqtt, ntfy, frigate, notifier, log } = file;

        let message_timeout_secs = parse_value::<_, f64>(&lookup, ENV_MESSAGE_TIMEOUT)?
            .or(notifier.message_timeout_secs)
            .unwrap_or(defaults.message_timeout_secs);
        if !message_timeout_secs.is_finite() || message_timeout_secs < 0.0 {
            bail!("invalid {}={}: must be a non-negative number", ENV_MESSAGE_TIMEOUT, message_timeout_secs);
        }

        let ttl_secs = parse_value::<_, u64>(&lookup, ENV_STATE_TTL_SECS)?
            .or(notifier.state_ttl_secs)
            .unwrap_or(DEFAULT_STATE_TTL_SECS);
        let state_eviction = match lookup_value(&lookup, ENV_STATE_EVICTION).or(notifier.state_eviction) {
            Some(mode) => parse_eviction(&mode, ttl_secs)?,
            None => defaults.state_eviction,
        };

        let notify_queue_size = parse_value::<_, usize>(&lookup, ENV_NOTIFY_QUEUE_SIZE)?
            .or(ntfy.queue_size)
            .unwrap_or(defaults.notify_queue_size);
        if notify_queue_size == 0 {
            bail!("invalid {}=0: queue needs room for at least one notification", ENV_NOTIFY_QUEUE_SIZE);
        }

        let log_level = lookup_value(&lookup, ENV_LOG_LEVEL)
            .or(log.level)
            .map(|name| parse_log_level(&name))
            .unwrap_or(defaults.log_level);

        Ok(Self {
            config_file: None,
            mqtt_host: lookup_value(&lookup, ENV_MQTT_BROKER_IP)
                .or(mqtt.host)
                .unwrap_or(defaults.mqtt_host),
            mqtt_port: parse_value::<_, u16>(&lookup, ENV_MQTT_BROKER_PORT)?
                .or(mqtt.port)
                .unwrap_or(defaults.mqtt_port),
            mqtt_client_id: lookup_value(&lookup, ENV_MQTT_CLIENT_ID)
                .or(mqtt.client_id)
                .unwrap_or(defaults.mqtt_client_id),
            mqtt_username: lookup_value(&lookup, ENV_MQTT_BROKER_USERNAME).or(mqtt.username),
            mqtt_password: lookup_value(&lookup, ENV_MQTT_BROKER_PASSWORD).or(mqtt.password),
            ntfy_server_url: lookup_value(&lookup, ENV_NTFY_SERVER_URL)
                .or(ntfy.server_url)
                .unwrap_or(defaults.ntfy_server_url),
            ntfy_topic: lookup_value(&lookup, ENV_NTFY_TOPIC)
                .or(ntfy.topic)
                .unwrap_or(defaults.ntfy_topic),
            ntfy_username: lookup_value(&lookup, ENV_NTFY_USERNAME).or(ntfy.username),
            ntfy_password: lookup_value(&lookup, ENV_NTFY_PASSWORD).or(ntfy.password),
            ntfy_max_retries: parse_value::<_, u32>(&lookup, ENV_NTFY_MAX_RETRIES)?
                .or(ntfy.max_retries)
                .unwrap_or(defaults.ntfy_max_retries),
            notify_queue_size,
            message_timeout_secs,
            frigate_base_url: lookup_value(&lookup, ENV_FRIGATE_BASE_URL)
                .or(frigate.base_url)
                .unwrap_or(defaults.frigate_base_url),
            state_eviction,
            metrics_interval_secs: parse_value::<_, u64>(&lookup, ENV_METRICS_INTERVAL_SECS)?
                .or(notifier.metrics_interval_secs)
                .unwrap_or(defaults.metrics_interval_secs),
            log_level,
        })
    }

    /// Load configuration from the optional file and the process environment
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let file = match config_path {
            Some(path) => Self::read_toml(path)?,
            None => TomlConfig::default(),
        };
        let mut config = Self::from_sources(file, |key| env::var(key).ok())?;
        config.config_file = config_path.map(str::to_string);
        Ok(config)
    }

    // Getters for all config fields
    pub fn config_file(&self) -> Option<&str> {
        self.config_file.as_deref()
    }

    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_client_id(&self) -> &str {
        &self.mqtt_client_id
    }

    pub fn mqtt_topic(&self) -> &str {
        EVENTS_TOPIC
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn ntfy_server_url(&self) -> &str {
        &self.ntfy_server_url
    }

    pub fn ntfy_topic(&self) -> &str {
        &self.ntfy_topic
    }

    pub fn ntfy_username(&self) -> Option<&str> {
        self.ntfy_username.as_deref()
    }

    pub fn ntfy_password(&self) -> Option<&str> {
        self.ntfy_password.as_deref()
    }

    pub fn ntfy_max_retries(&self) -> u32 {
        self.ntfy_max_retries
    }

    pub fn notify_queue_size(&self) -> usize {
        self.notify_queue_size
    }

    pub fn message_timeout_secs(&self) -> f64 {
        self.message_timeout_secs
    }

    pub fn frigate_base_url(&self) -> &str {
        &self.frigate_base_url
    }

    pub fn state_eviction(&self) -> EvictionPolicy {
        self.state_eviction
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }
}
