use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 规范化传感器取值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// 传感器名 → 取值。
pub type Sensors = BTreeMap<String, SensorValue>;

/// 规范化定位事件（下游存储流水线消费的统一结构）。
///
/// 只由 Translator 生成，要么完整要么不存在。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverPacket {
    /// 设备标识；`None` 表示在 Head 帧之前收到的数据（未知设备）。
    pub uid: Option<String>,
    /// `YYYY-MM-DDTHH:MM:SS.ffffff`
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// km/h
    pub speed: f64,
    /// 度
    pub course: f64,
    #[serde(default)]
    pub sensors: Sensors,
}

impl ObserverPacket {
    /// 是否为未知设备事件。
    pub fn is_orphan(&self) -> bool {
        self.uid.is_none()
    }
}
