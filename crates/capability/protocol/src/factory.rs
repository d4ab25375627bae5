//! PacketFactory：累积缓冲 → 完整校验帧
//!
//! 每次调用无状态：能切出的帧全部切出，被丢弃的字节显式上报为 `Rejected`，
//! 不完整的尾部留在调用方的缓冲里等待下一次读。

use crate::ack::build_ack;
use crate::packet::Packet;
use bytes::{Bytes, BytesMut};
use std::fmt;

/// 字节被丢弃的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// 不可能是帧起始的字节（重同步跳过）
    Garbage,
    /// 校验失败
    ChecksumMismatch { declared: u16, computed: u16 },
    /// 校验通过但报文体非法
    Malformed(String),
    /// 超过最大帧长仍未结束
    Oversized(usize),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Garbage => f.write_str("garbage"),
            RejectReason::ChecksumMismatch { declared, computed } => write!(
                f,
                "checksum mismatch: declared {:#06x}, computed {:#06x}",
                declared, computed
            ),
            RejectReason::Malformed(reason) => write!(f, "malformed: {}", reason),
            RejectReason::Oversized(len) => write!(f, "oversized: {} bytes", len),
        }
    }
}

/// 被丢弃的字节段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub bytes: Bytes,
    pub reason: RejectReason,
}

/// 一次提取的结果
#[derive(Debug, Default)]
pub struct Extraction {
    pub packets: Vec<Packet>,
    pub rejected: Vec<Rejected>,
}

impl Extraction {
    pub(crate) fn reject(&mut self, bytes: Bytes, reason: RejectReason) {
        if bytes.is_empty() {
            return;
        }
        self.rejected.push(Rejected { bytes, reason });
    }

    /// 丢弃的字节总数
    pub fn rejected_bytes(&self) -> usize {
        self.rejected.iter().map(|item| item.bytes.len()).sum()
    }
}

/// 厂商分帧器
pub trait PacketFactory: Send + Sync {
    /// 协议族名称（日志用）
    fn family(&self) -> &'static str;

    /// 从 `buffer` 头部切出所有完整帧；未消费字节原样留在 `buffer`。
    fn extract(&self, buffer: &mut BytesMut) -> Extraction;

    /// 该帧的应答字节；默认 `[0x01][checksum LE]`，不需要应答的协议返回 `None`。
    fn acknowledgement(&self, packet: &Packet) -> Option<Bytes> {
        Some(Bytes::copy_from_slice(&build_ack(packet)))
    }
}

/// 纯函数形式：`(帧, 剩余字节)`。
pub fn extract_frames(factory: &dyn PacketFactory, buffer: &[u8]) -> (Extraction, Bytes) {
    let mut buf = BytesMut::from(buffer);
    let extraction = factory.extract(&mut buf);
    (extraction, buf.freeze())
}

/// 在 `haystack` 中查找 `needle` 的首个位置。
pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
