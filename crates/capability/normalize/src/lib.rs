//! 规范化：Data 帧 → `ObserverPacket`。
//!
//! 翻译本身不会失败：非 Data 帧或空 Data 帧得到空列表，
//! 未识别或无法换算的参数码只影响对应传感器，不影响事件本身。

mod sensors;

pub use sensors::{
    BATTERY_EMPTY_MV, BATTERY_FULL_MV, RuleTable, SensorKind, SensorMapper, SensorRule,
    battery_level, battery_voltage,
};

use chrono::NaiveDateTime;
use domain::{ObserverPacket, Sensors, VendorId};
use std::sync::Arc;
use tracing::debug;
use trk_protocol::{Packet, PacketItem};

/// 规范化时间格式（ISO-8601，微秒）
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// 规范化错误。
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("invalid value for sensor code {code}: {value}")]
    InvalidValue { code: String, value: String },
}

/// 报文时间 → 规范化时间串。
pub fn format_time(time: &NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// 厂商报文翻译器。
#[derive(Clone)]
pub struct Translator {
    mapper: Arc<dyn SensorMapper>,
}

impl Translator {
    pub fn new(mapper: Arc<dyn SensorMapper>) -> Self {
        Self { mapper }
    }

    pub fn for_vendor(vendor: VendorId) -> Self {
        Self::new(Arc::new(RuleTable::for_vendor(vendor)))
    }

    /// 每个定位点产出一个事件；`uid` 取自会话。
    pub fn translate(&self, packet: &Packet, uid: Option<&str>) -> Vec<ObserverPacket> {
        let Some(data) = packet.data() else {
            return Vec::new();
        };
        data.items
            .iter()
            .map(|item| self.translate_item(item, uid))
            .collect()
    }

    fn translate_item(&self, item: &PacketItem, uid: Option<&str>) -> ObserverPacket {
        let mut sensors = Sensors::new();
        for (code, raw) in &item.params {
            if let Err(err) = self.mapper.map_param(code, raw, &mut sensors) {
                debug!(target: "trk.normalize", error = %err, "sensor_value_skipped");
            }
        }
        ObserverPacket {
            uid: uid.map(str::to_string),
            time: format_time(&item.time),
            latitude: item.latitude,
            longitude: item.longitude,
            altitude: item.altitude,
            speed: item.speed,
            course: item.course,
            sensors,
        }
    }
}
