//! 帧校验算法。

/// CRC-16/MODBUS（多项式 0xA001 反射，初值 0xFFFF）。
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= u16::from(*byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// 逐字节异或。
pub fn xor8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, byte| acc ^ byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc16_modbus_check_value() {
        // 标准校验串 "123456789"
        assert_eq!(crc16_modbus(b"123456789"), 0x4B37);
    }

    #[test]
    fn xor8_of_empty_is_zero() {
        assert_eq!(xor8(&[]), 0);
        assert_eq!(xor8(b"GS"), b'G' ^ b'S');
    }
}
