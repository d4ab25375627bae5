use crate::scalar::deserialize_scalar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 厂商/固件族标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VendorId {
    #[serde(rename = "naviset")]
    Naviset,
    #[serde(rename = "globalsat.tr203")]
    GlobalsatTr203,
    #[serde(rename = "globalsat.tr600")]
    GlobalsatTr600,
    #[serde(rename = "autolink")]
    Autolink,
}

impl VendorId {
    pub const ALL: [VendorId; 4] = [
        VendorId::Naviset,
        VendorId::GlobalsatTr203,
        VendorId::GlobalsatTr600,
        VendorId::Autolink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VendorId::Naviset => "naviset",
            VendorId::GlobalsatTr203 => "globalsat.tr203",
            VendorId::GlobalsatTr600 => "globalsat.tr600",
            VendorId::Autolink => "autolink",
        }
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知厂商标识。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVendorError(pub String);

impl fmt::Display for ParseVendorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown vendor: {}", self.0)
    }
}

impl std::error::Error for ParseVendorError {}

impl FromStr for VendorId {
    type Err = ParseVendorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        VendorId::ALL
            .into_iter()
            .find(|vendor| vendor.as_str() == value)
            .ok_or(ParseVendorError(value))
    }
}

/// 命令意图别名（封闭集合）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandAlias {
    Configure,
    Execute,
    ReadSettings,
    SetOption,
}

impl CommandAlias {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandAlias::Configure => "configure",
            CommandAlias::Execute => "execute",
            CommandAlias::ReadSettings => "read-settings",
            CommandAlias::SetOption => "set-option",
        }
    }
}

impl fmt::Display for CommandAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 命令下行传输方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// 直接经设备 socket 下发
    #[default]
    Tcp,
    /// 短信文本
    Sms,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Sms => "sms",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GPRS 接入参数（均可缺省）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GprsSettings {
    pub apn: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// 外部任务系统下发的规范化配置记录。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigureRequest {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub gprs: GprsSettings,
}

impl ConfigureRequest {
    /// 用网关默认值补齐缺省的 host/port，GPRS 缺省字段渲染为空串。
    pub fn resolve(&self, fallback_host: &str, fallback_port: u16) -> InitiationConfig {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .unwrap_or(fallback_host);
        let port = self.port.filter(|port| *port != 0).unwrap_or(fallback_port);
        InitiationConfig {
            host: host.to_string(),
            port,
            apn: self.gprs.apn.clone().unwrap_or_default(),
            username: self.gprs.username.clone().unwrap_or_default(),
            password: self.gprs.password.clone().unwrap_or_default(),
        }
    }
}

/// 补齐后的设备初始化配置，命令渲染只看这一结构。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiationConfig {
    pub host: String,
    pub port: u16,
    pub apn: String,
    pub username: String,
    pub password: String,
}

/// 规范化设备配置项名称。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigOption {
    FreqMov,
    FreqIdle,
    SendMov,
    VoicePhone1,
    VoicePhone2,
    VoicePhone3,
    VoiceCallOnSos,
    SendByAngle,
}

impl ConfigOption {
    pub const ALL: [ConfigOption; 8] = [
        ConfigOption::FreqMov,
        ConfigOption::FreqIdle,
        ConfigOption::SendMov,
        ConfigOption::VoicePhone1,
        ConfigOption::VoicePhone2,
        ConfigOption::VoicePhone3,
        ConfigOption::VoiceCallOnSos,
        ConfigOption::SendByAngle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigOption::FreqMov => "freq_mov",
            ConfigOption::FreqIdle => "freq_idle",
            ConfigOption::SendMov => "send_mov",
            ConfigOption::VoicePhone1 => "voice_phone_1",
            ConfigOption::VoicePhone2 => "voice_phone_2",
            ConfigOption::VoicePhone3 => "voice_phone_3",
            ConfigOption::VoiceCallOnSos => "voice_call_on_sos",
            ConfigOption::SendByAngle => "send_by_angle",
        }
    }

    /// 按规范名查找；未知名称返回 `None`（调用方静默跳过）。
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        ConfigOption::ALL
            .into_iter()
            .find(|option| option.as_str() == name)
    }
}

impl fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{option, value}` 配置对；option 保留原始字符串，未知名称在构建时跳过。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSetting {
    pub option: String,
    #[serde(deserialize_with = "deserialize_scalar")]
    pub value: String,
}

impl OptionSetting {
    pub fn new(option: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            value: value.into(),
        }
    }
}

/// 外部任务关联 ID。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(#[serde(deserialize_with = "deserialize_scalar")] pub String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
