//! # 协议帧能力模块
//!
//! 把可能被任意切分的设备字节流变成校验通过的协议帧：
//! - **Naviset**：二进制帧，长度字段 + CRC-16/MODBUS，Head/Data 两类帧
//! - **Globalsat**：`GS…*XX!` 文本语句，XOR 校验，报告/配置回读两类
//!
//! ## 架构设计
//!
//! ```text
//! 会话累积缓冲 (BytesMut)
//!       │
//!       ▼
//! PacketFactory::extract ──► Rejected（垃圾/校验失败/非法报文，显式上报）
//!       │
//!       ▼
//! Packet (Head | Data | Settings) ──► acknowledgement: [0x01][checksum LE]
//! ```
//!
//! 未消费的尾部字节始终留在调用方缓冲中，分帧器本身不持有状态。

mod ack;
mod checksum;
mod error;
mod factory;
pub mod globalsat;
pub mod naviset;
mod packet;

pub use ack::{ACK_LEN, ACK_STATUS, ack_for_checksum, build_ack};
pub use checksum::{crc16_modbus, xor8};
pub use error::ProtocolError;
pub use factory::{Extraction, PacketFactory, RejectReason, Rejected, extract_frames};
pub use globalsat::GlobalsatFactory;
pub use naviset::NavisetFactory;
pub use packet::{
    Packet, PacketBody, PacketData, PacketHead, PacketItem, PacketKind, PacketSettings, RawValue,
};
