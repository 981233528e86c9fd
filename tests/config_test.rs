//! Integration tests for configuration loading

use frigate_notifier::infra::config::TomlConfig;
use frigate_notifier::infra::Config;
use frigate_notifier::services::EvictionPolicy;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::Level;

const CONFIG_CONTENT: &str = r#"
[mqtt]
host = "test-host"
port = 1884
client_id = "notifier-test"
username = "frigate"
password = "secret"

[ntfy]
server_url = "https://ntfy.example.com"
topic = "driveway"
max_retries = 4
queue_size = 16

[frigate]
base_url = "http://nvr.local:5000"

[notifier]
message_timeout_secs = 0.25
state_eviction = "ttl"
state_ttl_secs = 600
metrics_interval_secs = 0

[log]
level = "debug"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_load_config_from_file() {
    let temp_file = write_config(CONFIG_CONTENT);

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.mqtt_host(), "test-host");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.mqtt_client_id(), "notifier-test");
    assert_eq!(config.mqtt_topic(), "frigate/events");
    assert_eq!(config.mqtt_username(), Some("frigate"));
    assert_eq!(config.mqtt_password(), Some("secret"));
    assert_eq!(config.ntfy_server_url(), "https://ntfy.example.com");
    assert_eq!(config.ntfy_topic(), "driveway");
    assert_eq!(config.ntfy_max_retries(), 4);
    assert_eq!(config.notify_queue_size(), 16);
    assert_eq!(config.frigate_base_url(), "http://nvr.local:5000");
    assert_eq!(config.message_timeout_secs(), 0.25);
    assert_eq!(config.state_eviction(), EvictionPolicy::Ttl(Duration::from_secs(600)));
    assert_eq!(config.metrics_interval_secs(), 0);
    assert_eq!(config.log_level(), Level::DEBUG);
    assert!(config.config_file().is_some());
}

#[test]
fn test_partial_file_uses_defaults() {
    let temp_file = write_config("[ntfy]\ntopic = \"garage\"\n");

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.ntfy_topic(), "garage");
    assert_eq!(config.mqtt_host(), "eclipse-mosquitto");
    assert_eq!(config.mqtt_port(), 1883);
    assert_eq!(config.message_timeout_secs(), 1.0);
    assert_eq!(config.state_eviction(), EvictionPolicy::Never);
}

#[test]
fn test_env_overrides_file() {
    let temp_file = write_config(CONFIG_CONTENT);
    let file = Config::read_toml(temp_file.path()).unwrap();

    let config = Config::from_sources(file, |key| match key {
        "MQTT_BROKER_IP" => Some("10.0.0.2".to_string()),
        "NTFY_TOPIC" => Some("front-door".to_string()),
        "STATE_EVICTION" => Some("on_end".to_string()),
        // Empty values do not override the file
        "NTFY_SERVER_URL" => Some(String::new()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.mqtt_host(), "10.0.0.2");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.ntfy_topic(), "front-door");
    assert_eq!(config.ntfy_server_url(), "https://ntfy.example.com");
    assert_eq!(config.state_eviction(), EvictionPolicy::OnEnd);
}

#[test]
fn test_missing_file_is_error() {
    assert!(Config::from_file("/nonexistent/frigate-notifier.toml").is_err());
    assert!(Config::load(Some("/nonexistent/frigate-notifier.toml")).is_err());
}

#[test]
fn test_malformed_file_is_error() {
    let temp_file = write_config("[mqtt]\nport = \"not a port\"\n");
    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_empty_toml_matches_defaults() {
    let config = Config::from_sources(TomlConfig::default(), |_| None).unwrap();
    assert_eq!(config.ntfy_topic(), "frigate-events");
    assert_eq!(config.frigate_base_url(), "http://frigate:5000");
    assert_eq!(config.metrics_interval_secs(), 60);
}
