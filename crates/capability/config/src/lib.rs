//! 应用运行配置加载。

use domain::VendorId;
use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 下游投递方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Noop,
    Mqtt,
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub vendor: VendorId,
    pub http_addr: String,
    pub public_host: String,
    pub public_port: u16,
    /// 未设置时不回报 format 结果
    pub finish_url: Option<String>,
    pub report_timeout_ms: u64,
    pub report_max_retries: u64,
    pub report_backoff_ms: u64,
    pub dispatch_max_retries: u64,
    pub dispatch_backoff_ms: u64,
    pub sink: SinkKind,
    pub sink_max_retries: u64,
    pub sink_backoff_ms: u64,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_prefix: String,
    pub mqtt_qos: u8,
    pub idle_timeout_secs: u64,
    /// 任务表最多保留的任务数
    pub task_capacity: usize,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（环境变量之外便于测试）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let listen_addr = vars.string_or("TRK_LISTEN_ADDR", "0.0.0.0:21200");
        let (listen_host, listen_port) = split_host_port("TRK_LISTEN_ADDR", &listen_addr)?;
        let vendor = match vars.optional("TRK_VENDOR") {
            Some(value) => value
                .parse::<VendorId>()
                .map_err(|_| ConfigError::Invalid("TRK_VENDOR".to_string(), value))?,
            None => VendorId::Naviset,
        };
        let http_addr = vars.string_or("TRK_HTTP_ADDR", "127.0.0.1:8080");
        let public_host = vars.string_or("TRK_PUBLIC_HOST", &listen_host);
        let public_port = vars.u16_or("TRK_PUBLIC_PORT", listen_port)?;
        let finish_url = vars.optional("TRK_FINISH_URL");
        let report_timeout_ms = vars.u64_or("TRK_REPORT_TIMEOUT_MS", 5000)?;
        let report_max_retries = vars.u64_or("TRK_REPORT_MAX_RETRIES", 2)?;
        let report_backoff_ms = vars.u64_or("TRK_REPORT_BACKOFF_MS", 200)?;
        let dispatch_max_retries = vars.u64_or("TRK_DISPATCH_MAX_RETRIES", 0)?;
        let dispatch_backoff_ms = vars.u64_or("TRK_DISPATCH_BACKOFF_MS", 0)?;
        let sink = match vars.optional("TRK_SINK") {
            None => SinkKind::Noop,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "noop" => SinkKind::Noop,
                "mqtt" => SinkKind::Mqtt,
                _ => return Err(ConfigError::Invalid("TRK_SINK".to_string(), value)),
            },
        };
        let sink_max_retries = vars.u64_or("TRK_SINK_MAX_RETRIES", 2)?;
        let sink_backoff_ms = vars.u64_or("TRK_SINK_BACKOFF_MS", 200)?;
        let mqtt_host = vars.string_or("TRK_MQTT_HOST", "127.0.0.1");
        let mqtt_port = vars.u16_or("TRK_MQTT_PORT", 1883)?;
        let mqtt_username = vars.optional("TRK_MQTT_USERNAME");
        let mqtt_password = vars.optional("TRK_MQTT_PASSWORD");
        let mqtt_topic_prefix = vars.string_or("TRK_MQTT_TOPIC_PREFIX", "trk/events");
        let mqtt_qos = vars.u8_or("TRK_MQTT_QOS", 1)?;
        let idle_timeout_secs = vars.u64_or("TRK_IDLE_TIMEOUT_SECS", 300)?;
        let task_capacity = vars.usize_or("TRK_TASK_CAPACITY", 10_000)?;

        Ok(Self {
            listen_addr,
            vendor,
            http_addr,
            public_host,
            public_port,
            finish_url,
            report_timeout_ms,
            report_max_retries,
            report_backoff_ms,
            dispatch_max_retries,
            dispatch_backoff_ms,
            sink,
            sink_max_retries,
            sink_backoff_ms,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            mqtt_qos,
            idle_timeout_secs,
            task_capacity,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 空串视同未设置。
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn u64_or(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
            None => Ok(default),
        }
    }

    fn usize_or(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse::<usize>()
                .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
            None => Ok(default),
        }
    }

    fn u16_or(&self, key: &str, default: u16) -> Result<u16, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
            None => Ok(default),
        }
    }

    fn u8_or(&self, key: &str, default: u8) -> Result<u8, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse::<u8>()
                .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
            None => Ok(default),
        }
    }
}

/// `host:port` → (host, port)
fn split_host_port(key: &str, addr: &str) -> Result<(String, u16), ConfigError> {
    let invalid = || ConfigError::Invalid(key.to_string(), addr.to_string());
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok((host.to_string(), port))
}
