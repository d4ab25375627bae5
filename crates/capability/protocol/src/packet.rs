//! 报文模型
//!
//! `Packet` 只能由本 crate 的解码器在校验通过后构造，外部只读。

use bytes::Bytes;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// 报文种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// 设备身份帧
    Head,
    /// 定位/遥测数据帧
    Data,
    /// 设备配置回读
    Settings,
}

/// 协议原始参数值（尚未规范化）
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i64),
    Text(String),
}

impl RawValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Int(value) => Some(*value),
            RawValue::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Int(value) => Some(*value as f64),
            RawValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// 单个定位点
#[derive(Debug, Clone, PartialEq)]
pub struct PacketItem {
    /// UTC 时间
    pub time: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    /// km/h
    pub speed: f64,
    /// 度
    pub course: f64,
    /// 厂商参数码 → 原始值
    pub params: BTreeMap<String, RawValue>,
}

/// 身份帧内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHead {
    /// IMEI 等设备标识
    pub device_id: String,
    pub device_number: Option<u16>,
    pub protocol_version: Option<u8>,
}

/// 数据帧内容
#[derive(Debug, Clone, PartialEq)]
pub struct PacketData {
    /// 文本协议每帧自带设备标识；二进制协议依赖 Head 帧
    pub device_id: Option<String>,
    pub items: Vec<PacketItem>,
}

/// 配置回读内容（原始参数码 → 值）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketSettings {
    pub device_id: Option<String>,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PacketBody {
    Head(PacketHead),
    Data(PacketData),
    Settings(PacketSettings),
}

/// 已通过校验的协议帧
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    declared_length: usize,
    checksum: u16,
    raw: Bytes,
    body: PacketBody,
}

impl Packet {
    pub(crate) fn new(declared_length: usize, checksum: u16, raw: Bytes, body: PacketBody) -> Self {
        Self {
            declared_length,
            checksum,
            raw,
            body,
        }
    }

    pub fn kind(&self) -> PacketKind {
        match self.body {
            PacketBody::Head(_) => PacketKind::Head,
            PacketBody::Data(_) => PacketKind::Data,
            PacketBody::Settings(_) => PacketKind::Settings,
        }
    }

    /// 帧头声明的负载长度
    pub fn declared_length(&self) -> usize {
        self.declared_length
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// 该帧消费的完整原始字节（回放/审计用）
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn body(&self) -> &PacketBody {
        &self.body
    }

    pub fn head(&self) -> Option<&PacketHead> {
        match &self.body {
            PacketBody::Head(head) => Some(head),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&PacketData> {
        match &self.body {
            PacketBody::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn settings(&self) -> Option<&PacketSettings> {
        match &self.body {
            PacketBody::Settings(settings) => Some(settings),
            _ => None,
        }
    }

    /// 帧内携带的设备标识（如有）
    pub fn device_id(&self) -> Option<&str> {
        match &self.body {
            PacketBody::Head(head) => Some(head.device_id.as_str()),
            PacketBody::Data(data) => data.device_id.as_deref(),
            PacketBody::Settings(settings) => settings.device_id.as_deref(),
        }
    }
}
