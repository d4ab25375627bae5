//! Naviset 二进制协议族
//!
//! ```text
//! [header:u16 LE][payload][crc:u16 LE]
//! header bit 0..=11 负载长度，bit 12..=15 帧类型（0 = Head，1 = Data）
//! crc = CRC-16/MODBUS(header + payload)
//! ```
//!
//! Head 负载固定 18 字节：15 位 ASCII IMEI + 设备号 u16 LE + 协议版本 u8。
//!
//! Data 负载：`count:u8`，随后 `count` 条记录：
//! `time:u32 LE`（unix 秒）、`lat:i32 LE`、`lon:i32 LE`（微度）、`altitude:i16 LE`（米）、
//! `speed:u16 LE`（0.1 km/h）、`course:u16 LE`（0.1 度）、`param_count:u8`、
//! `param_count × (code:u8, value:i32 LE)`。
//!
//! ## 重同步
//!
//! - 帧头不可信（未知类型或长度与类型不符）：跳过 1 字节重新扫描，连续跳过的字节合并为一条 `Garbage`。
//! - 声明的帧未到齐，但缓冲中其后已有完整的校验通过帧：视为误判帧头，跳过 1 字节。
//! - 校验失败：声明范围内另有校验通过的帧起点时只跳过 1 字节；否则按声明长度整帧丢弃为 `ChecksumMismatch`。
//! - 校验通过但负载非法：整帧丢弃为 `Malformed`。

use crate::checksum::crc16_modbus;
use crate::error::ProtocolError;
use crate::factory::{Extraction, PacketFactory, RejectReason};
use crate::packet::{Packet, PacketBody, PacketData, PacketHead, PacketItem, RawValue};
use bytes::{Buf, BytesMut};
use chrono::DateTime;
use std::collections::BTreeMap;

pub const HEADER_LEN: usize = 2;
pub const CRC_LEN: usize = 2;
/// 12 位长度字段上限
pub const MAX_PAYLOAD_LEN: usize = 0x0FFF;
pub const HEAD_PAYLOAD_LEN: usize = 18;
const IMEI_LEN: usize = 15;
const RECORD_FIXED_LEN: usize = 19;
const PARAM_LEN: usize = 5;

/// 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Head = 0,
    Data = 1,
}

impl FrameType {
    fn from_nibble(value: u16) -> Option<Self> {
        match value {
            0 => Some(FrameType::Head),
            1 => Some(FrameType::Data),
            _ => None,
        }
    }

    /// 长度与类型是否匹配
    fn accepts_length(&self, len: usize) -> bool {
        match self {
            FrameType::Head => len == HEAD_PAYLOAD_LEN,
            FrameType::Data => len >= 1,
        }
    }
}

/// Naviset 分帧器
#[derive(Debug, Clone, Copy, Default)]
pub struct NavisetFactory;

impl NavisetFactory {
    pub fn new() -> Self {
        Self
    }
}

impl PacketFactory for NavisetFactory {
    fn family(&self) -> &'static str {
        "naviset"
    }

    fn extract(&self, buffer: &mut BytesMut) -> Extraction {
        let mut out = Extraction::default();
        // buffer[..garbage] 为待丢弃的不可信字节
        let mut garbage = 0usize;

        loop {
            let candidate = &buffer[garbage..];
            let Some((frame_type, payload_len)) = plausible_header(candidate) else {
                if candidate.len() < HEADER_LEN {
                    break;
                }
                garbage += 1;
                continue;
            };
            let total = HEADER_LEN + payload_len + CRC_LEN;
            if candidate.len() < total {
                // 声明的帧尚未到齐，但其后已有完整可信帧：当前帧头是误判
                if find_valid_frame(candidate, candidate.len()).is_some() {
                    garbage += 1;
                    continue;
                }
                break;
            }

            let declared = u16::from_le_bytes([candidate[total - 2], candidate[total - 1]]);
            let computed = crc16_modbus(&candidate[..total - CRC_LEN]);
            if declared != computed {
                // 声明范围内另有可信帧起点：只跳过 1 字节，避免吞掉后续帧
                if find_valid_frame(candidate, total).is_some() {
                    garbage += 1;
                    continue;
                }
                if garbage > 0 {
                    out.reject(buffer.split_to(garbage).freeze(), RejectReason::Garbage);
                    garbage = 0;
                }
                let frame = buffer.split_to(total).freeze();
                out.reject(frame, RejectReason::ChecksumMismatch { declared, computed });
                continue;
            }

            if garbage > 0 {
                out.reject(buffer.split_to(garbage).freeze(), RejectReason::Garbage);
                garbage = 0;
            }
            let frame = buffer.split_to(total).freeze();
            let payload = &frame[HEADER_LEN..HEADER_LEN + payload_len];
            let body = match frame_type {
                FrameType::Head => decode_head(payload).map(PacketBody::Head),
                FrameType::Data => decode_data(payload).map(PacketBody::Data),
            };
            match body {
                Ok(body) => out
                    .packets
                    .push(Packet::new(payload_len, declared, frame, body)),
                Err(err) => out.reject(frame, RejectReason::Malformed(err.to_string())),
            }
        }

        if garbage > 0 {
            out.reject(buffer.split_to(garbage).freeze(), RejectReason::Garbage);
        }
        out
    }
}

/// 帧头可信时返回 (类型, 负载长度)
fn plausible_header(bytes: &[u8]) -> Option<(FrameType, usize)> {
    if bytes.len() < HEADER_LEN {
        return None;
    }
    let header = u16::from_le_bytes([bytes[0], bytes[1]]);
    let payload_len = usize::from(header & 0x0FFF);
    FrameType::from_nibble(header >> 12)
        .filter(|frame_type| frame_type.accepts_length(payload_len))
        .map(|frame_type| (frame_type, payload_len))
}

/// `bytes` 开头是否为完整且校验通过的帧
fn is_valid_frame(bytes: &[u8]) -> bool {
    let Some((_, payload_len)) = plausible_header(bytes) else {
        return false;
    };
    let total = HEADER_LEN + payload_len + CRC_LEN;
    if bytes.len() < total {
        return false;
    }
    let declared = u16::from_le_bytes([bytes[total - 2], bytes[total - 1]]);
    declared == crc16_modbus(&bytes[..total - CRC_LEN])
}

/// 在 `1..end` 范围内查找第一个完整可信帧的起点
fn find_valid_frame(bytes: &[u8], end: usize) -> Option<usize> {
    (1..end.min(bytes.len())).find(|&offset| is_valid_frame(&bytes[offset..]))
}

fn ensure(buf: &[u8], need: usize) -> Result<(), ProtocolError> {
    if buf.remaining() < need {
        return Err(ProtocolError::Truncated {
            need,
            have: buf.remaining(),
        });
    }
    Ok(())
}

fn decode_head(payload: &[u8]) -> Result<PacketHead, ProtocolError> {
    ensure(payload, HEAD_PAYLOAD_LEN)?;
    let (imei, mut rest) = payload.split_at(IMEI_LEN);
    if !imei.iter().all(u8::is_ascii_digit) {
        return Err(ProtocolError::invalid("imei", "expected 15 ascii digits"));
    }
    let device_number = rest.get_u16_le();
    let protocol_version = rest.get_u8();
    Ok(PacketHead {
        device_id: String::from_utf8_lossy(imei).into_owned(),
        device_number: Some(device_number),
        protocol_version: Some(protocol_version),
    })
}

fn decode_data(payload: &[u8]) -> Result<PacketData, ProtocolError> {
    let mut buf = payload;
    ensure(buf, 1)?;
    let count = buf.get_u8();
    let mut items = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        ensure(buf, RECORD_FIXED_LEN)?;
        let timestamp = buf.get_u32_le();
        let latitude = f64::from(buf.get_i32_le()) / 1_000_000.0;
        let longitude = f64::from(buf.get_i32_le()) / 1_000_000.0;
        let altitude = f64::from(buf.get_i16_le());
        let speed = f64::from(buf.get_u16_le()) / 10.0;
        let course = f64::from(buf.get_u16_le()) / 10.0;
        let param_count = usize::from(buf.get_u8());

        ensure(buf, param_count * PARAM_LEN)?;
        let mut params = BTreeMap::new();
        for _ in 0..param_count {
            let code = buf.get_u8();
            let value = buf.get_i32_le();
            params.insert(code.to_string(), RawValue::Int(i64::from(value)));
        }

        let time = DateTime::from_timestamp(i64::from(timestamp), 0)
            .ok_or_else(|| ProtocolError::invalid("time", timestamp.to_string()))?
            .naive_utc();
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ProtocolError::invalid("coordinates", "out of range"));
        }
        items.push(PacketItem {
            time,
            latitude,
            longitude,
            altitude: Some(altitude),
            speed,
            course,
            params,
        });
    }
    if buf.has_remaining() {
        return Err(ProtocolError::TrailingBytes(buf.remaining()));
    }
    Ok(PacketData {
        device_id: None,
        items,
    })
}

/// 一条 Data 记录（编码用）
#[derive(Debug, Clone, Default)]
pub struct DataRecord {
    pub timestamp: u32,
    pub lat_micro: i32,
    pub lon_micro: i32,
    pub altitude: i16,
    pub speed_decikmh: u16,
    pub course_decideg: u16,
    pub params: Vec<(u8, i32)>,
}

/// 组帧：补帧头与 CRC。用于测试与抓包回放。
pub fn encode_frame(frame_type: FrameType, payload: &[u8]) -> Vec<u8> {
    let len = payload.len().min(MAX_PAYLOAD_LEN) as u16;
    let header = ((frame_type as u16) << 12) | len;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + CRC_LEN);
    out.extend_from_slice(&header.to_le_bytes());
    out.extend_from_slice(&payload[..usize::from(len)]);
    let crc = crc16_modbus(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// 编码 Head 帧；`imei` 不足 15 位时右侧补 '0'。
pub fn encode_head(imei: &str, device_number: u16, protocol_version: u8) -> Vec<u8> {
    let mut payload = Vec::with_capacity(HEAD_PAYLOAD_LEN);
    let digits = imei.as_bytes();
    for index in 0..IMEI_LEN {
        payload.push(digits.get(index).copied().unwrap_or(b'0'));
    }
    payload.extend_from_slice(&device_number.to_le_bytes());
    payload.push(protocol_version);
    encode_frame(FrameType::Head, &payload)
}

/// 编码 Data 帧。
pub fn encode_data(records: &[DataRecord]) -> Vec<u8> {
    let mut payload = vec![records.len().min(usize::from(u8::MAX)) as u8];
    for record in records.iter().take(usize::from(u8::MAX)) {
        payload.extend_from_slice(&record.timestamp.to_le_bytes());
        payload.extend_from_slice(&record.lat_micro.to_le_bytes());
        payload.extend_from_slice(&record.lon_micro.to_le_bytes());
        payload.extend_from_slice(&record.altitude.to_le_bytes());
        payload.extend_from_slice(&record.speed_decikmh.to_le_bytes());
        payload.extend_from_slice(&record.course_decideg.to_le_bytes());
        payload.push(record.params.len().min(usize::from(u8::MAX)) as u8);
        for (code, value) in record.params.iter().take(usize::from(u8::MAX)) {
            payload.push(*code);
            payload.extend_from_slice(&value.to_le_bytes());
        }
    }
    encode_frame(FrameType::Data, &payload)
}
