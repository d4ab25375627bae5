use domain::VendorId;
use std::collections::HashMap;
use trk_config::{AppConfig, ConfigError, SinkKind};

fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    AppConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn defaults_follow_listener_address() {
    let config = load(&[("TRK_LISTEN_ADDR", "10.0.0.5:21300")]).expect("config");
    assert_eq!(config.vendor, VendorId::Naviset);
    assert_eq!(config.public_host, "10.0.0.5");
    assert_eq!(config.public_port, 21300);
    assert_eq!(config.http_addr, "127.0.0.1:8080");
    assert_eq!(config.sink, SinkKind::Noop);
    assert_eq!(config.report_timeout_ms, 5000);
    assert_eq!(config.report_max_retries, 2);
    assert!(config.finish_url.is_none());
    assert_eq!(config.idle_timeout_secs, 300);
    assert_eq!(config.task_capacity, 10_000);
}

#[test]
fn explicit_values_override_defaults() {
    let config = load(&[
        ("TRK_VENDOR", "globalsat.tr600"),
        ("TRK_PUBLIC_HOST", "trx.example.net"),
        ("TRK_FINISH_URL", "http://observer.local/finish"),
        ("TRK_SINK", "mqtt"),
        ("TRK_MQTT_QOS", "0"),
        ("TRK_TASK_CAPACITY", "500"),
    ])
    .expect("config");
    assert_eq!(config.vendor, VendorId::GlobalsatTr600);
    assert_eq!(config.public_host, "trx.example.net");
    assert_eq!(config.public_port, 21200);
    assert_eq!(config.finish_url.as_deref(), Some("http://observer.local/finish"));
    assert_eq!(config.sink, SinkKind::Mqtt);
    assert_eq!(config.mqtt_qos, 0);
    assert_eq!(config.task_capacity, 500);
}

#[test]
fn invalid_values_name_the_key() {
    let err = load(&[("TRK_VENDOR", "teltonika")]).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "TRK_VENDOR"));

    let err = load(&[("TRK_REPORT_TIMEOUT_MS", "soon")]).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(key, value) if key == "TRK_REPORT_TIMEOUT_MS" && value == "soon"));
}

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("TRK_HTTP_ADDR", "127.0.0.1:8081");
    }
    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.http_addr, "127.0.0.1:8081");
}
