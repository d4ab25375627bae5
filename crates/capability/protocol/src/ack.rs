//! 应答帧：`[status:1][checksum:2 LE]`。

use crate::packet::Packet;

/// 应答状态字节（固定）。
pub const ACK_STATUS: u8 = 0x01;

/// 应答帧长度。
pub const ACK_LEN: usize = 3;

/// 按报文校验值构建应答帧。
pub fn build_ack(packet: &Packet) -> [u8; ACK_LEN] {
    ack_for_checksum(packet.checksum())
}

/// 校验值 → 应答帧。
pub fn ack_for_checksum(checksum: u16) -> [u8; ACK_LEN] {
    let [low, high] = checksum.to_le_bytes();
    [ACK_STATUS, low, high]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_encodes_checksum_little_endian() {
        assert_eq!(ack_for_checksum(39), [0x01, 0x27, 0x00]);
        assert_eq!(ack_for_checksum(0xBEEF), [0x01, 0xEF, 0xBE]);
    }
}
