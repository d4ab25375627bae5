//! 厂商参数码 → 规范化传感器的声明式规则表。

use crate::NormalizeError;
use domain::{SensorValue, Sensors, VendorId};
use trk_protocol::RawValue;

/// 电池电压下限（mV），对应 0%
pub const BATTERY_EMPTY_MV: i64 = 3400;
/// 电池电压上限（mV），对应 100%
pub const BATTERY_FULL_MV: i64 = 4200;

/// 原始值的换算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Int,
    Float,
    /// 非零即真
    Flag,
    /// 取第 n 位
    Bit(u8),
    /// mV → 电量百分比
    BatteryLevel,
    /// mV → V
    BatteryVoltage,
}

/// 单条映射规则；同一参数码可对应多条规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRule {
    pub code: &'static str,
    pub sensor: &'static str,
    pub kind: SensorKind,
}

impl SensorRule {
    pub const fn new(code: &'static str, sensor: &'static str, kind: SensorKind) -> Self {
        Self { code, sensor, kind }
    }

    pub fn convert(&self, raw: &RawValue) -> Result<SensorValue, NormalizeError> {
        let invalid = || NormalizeError::InvalidValue {
            code: self.code.to_string(),
            value: format!("{:?}", raw),
        };
        let value = match self.kind {
            SensorKind::Int => SensorValue::Int(raw.as_i64().ok_or_else(invalid)?),
            SensorKind::Float => SensorValue::Float(raw.as_f64().ok_or_else(invalid)?),
            SensorKind::Flag => SensorValue::Bool(raw.as_i64().ok_or_else(invalid)? != 0),
            SensorKind::Bit(bit) => {
                SensorValue::Bool((raw.as_i64().ok_or_else(invalid)? >> bit) & 1 == 1)
            }
            SensorKind::BatteryLevel => {
                SensorValue::Int(battery_level(raw.as_i64().ok_or_else(invalid)?))
            }
            SensorKind::BatteryVoltage => {
                SensorValue::Float(battery_voltage(raw.as_i64().ok_or_else(invalid)?))
            }
        };
        Ok(value)
    }
}

/// 线性换算电量：3400 mV → 0%，4200 mV → 100%，两端截断。
pub fn battery_level(millivolts: i64) -> i64 {
    let span = BATTERY_FULL_MV - BATTERY_EMPTY_MV;
    let clamped = millivolts.clamp(BATTERY_EMPTY_MV, BATTERY_FULL_MV);
    (clamped - BATTERY_EMPTY_MV) * 100 / span
}

/// mV → V
pub fn battery_voltage(millivolts: i64) -> f64 {
    millivolts as f64 / 1000.0
}

/// 参数映射抽象；未识别的参数码静默忽略。
pub trait SensorMapper: Send + Sync {
    fn map_param(
        &self,
        code: &str,
        raw: &RawValue,
        sensors: &mut Sensors,
    ) -> Result<(), NormalizeError>;
}

/// 基于规则表的映射器
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<SensorRule>,
}

const GLOBALSAT_COMMON: &[SensorRule] = &[
    SensorRule::new("L", "sat_count", SensorKind::Int),
    SensorRule::new("M", "hdop", SensorKind::Float),
];

const GLOBALSAT_TR203: &[SensorRule] = &[SensorRule::new(
    "N",
    "int_battery_level",
    SensorKind::BatteryLevel,
)];

const GLOBALSAT_TR600: &[SensorRule] = &[
    SensorRule::new("n", "int_battery_level", SensorKind::BatteryLevel),
    SensorRule::new("n", "ext_battery_voltage", SensorKind::BatteryVoltage),
];

const NAVISET: &[SensorRule] = &[
    SensorRule::new("1", "int_battery_voltage", SensorKind::BatteryVoltage),
    SensorRule::new("1", "int_battery_level", SensorKind::BatteryLevel),
    SensorRule::new("2", "ext_battery_voltage", SensorKind::BatteryVoltage),
    SensorRule::new("3", "acc", SensorKind::Bit(0)),
    SensorRule::new("3", "sos", SensorKind::Bit(1)),
    SensorRule::new("4", "extbattery_low", SensorKind::Flag),
    SensorRule::new("5", "analog_input0", SensorKind::Int),
    SensorRule::new("6", "sat_count", SensorKind::Int),
];

impl RuleTable {
    pub fn new(rules: Vec<SensorRule>) -> Self {
        Self { rules }
    }

    /// 厂商内置规则表；Autolink 没有上行报文，规则为空。
    pub fn for_vendor(vendor: VendorId) -> Self {
        let rules = match vendor {
            VendorId::Naviset => NAVISET.to_vec(),
            VendorId::GlobalsatTr203 => [GLOBALSAT_COMMON, GLOBALSAT_TR203].concat(),
            VendorId::GlobalsatTr600 => [GLOBALSAT_COMMON, GLOBALSAT_TR600].concat(),
            VendorId::Autolink => Vec::new(),
        };
        Self::new(rules)
    }

    pub fn rules(&self) -> &[SensorRule] {
        &self.rules
    }
}

impl SensorMapper for RuleTable {
    fn map_param(
        &self,
        code: &str,
        raw: &RawValue,
        sensors: &mut Sensors,
    ) -> Result<(), NormalizeError> {
        for rule in self.rules.iter().filter(|rule| rule.code == code) {
            sensors.insert(rule.sensor.to_string(), rule.convert(raw)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_level_is_linear_and_clamped() {
        assert_eq!(battery_level(3400), 0);
        assert_eq!(battery_level(3800), 50);
        assert_eq!(battery_level(4200), 100);
        assert_eq!(battery_level(3000), 0);
        assert_eq!(battery_level(5000), 100);
        assert_eq!(battery_level(i64::MAX), 100);
        assert_eq!(battery_level(i64::MIN), 0);
    }

    #[test]
    fn huge_device_value_maps_without_overflow() {
        let table = RuleTable::for_vendor(VendorId::GlobalsatTr203);
        let mut sensors = Sensors::new();
        table
            .map_param("N", &RawValue::Text("9223372036854775807".into()), &mut sensors)
            .expect("map");
        assert_eq!(sensors.get("int_battery_level"), Some(&SensorValue::Int(100)));
    }

    #[test]
    fn bit_rules_split_input_mask() {
        let table = RuleTable::for_vendor(VendorId::Naviset);
        let mut sensors = Sensors::new();
        table
            .map_param("3", &RawValue::Int(0b10), &mut sensors)
            .expect("map");
        assert_eq!(sensors.get("acc"), Some(&SensorValue::Bool(false)));
        assert_eq!(sensors.get("sos"), Some(&SensorValue::Bool(true)));
    }

    #[test]
    fn unknown_code_is_ignored() {
        let table = RuleTable::for_vendor(VendorId::GlobalsatTr203);
        let mut sensors = Sensors::new();
        table
            .map_param("Z", &RawValue::Text("1".into()), &mut sensors)
            .expect("map");
        assert!(sensors.is_empty());
    }

    #[test]
    fn non_numeric_value_is_an_error() {
        let table = RuleTable::for_vendor(VendorId::GlobalsatTr203);
        let mut sensors = Sensors::new();
        let err = table
            .map_param("L", &RawValue::Text("n/a".into()), &mut sensors)
            .unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidValue { .. }));
    }
}
