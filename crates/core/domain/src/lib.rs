//! 网关共享的领域模型：规范化事件与命令词汇。

pub mod command;
pub mod data;
mod scalar;

pub use command::{
    CommandAlias, ConfigOption, ConfigureRequest, GprsSettings, InitiationConfig, OptionSetting,
    ParseVendorError, TaskId, Transport, VendorId,
};
pub use data::{ObserverPacket, SensorValue, Sensors};
