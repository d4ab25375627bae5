//! Globalsat 文本协议族（TR-203 / TR-600）
//!
//! ```text
//! GS<k>,<field>,<field>,...*<XX>!
//! ```
//!
//! `XX` 为 `G` 起至 `*`（不含）所有字节的异或值，两位十六进制。
//!
//! - `GSr`：定位报告，字段顺序由设备的报告格式串决定（`B` 占两个字段：`ddmmyy`、`hhmmss`）。
//! - `GSs`：设备配置回读，`<code>=<value>` 列表。
//!
//! ## 重同步
//!
//! - 下一个 `GS` 之前的字节丢弃为 `Garbage`（末尾单个 `G` 保留等待后续字节）。
//! - 在 `!` 之前又出现 `GS`：前一条丢弃为 `Malformed`。
//! - 超过 [`MAX_SENTENCE_LEN`] 仍无 `!`：丢弃为 `Oversized`。
//! - 校验失败：整条（含 `!`）丢弃。
//!
//! 文本协议设备不需要应答帧。

use crate::checksum::xor8;
use crate::error::ProtocolError;
use crate::factory::{Extraction, PacketFactory, RejectReason, find_subslice};
use crate::packet::{Packet, PacketBody, PacketData, PacketItem, PacketSettings, RawValue};
use bytes::{Bytes, BytesMut};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// TR-203 报告格式
pub const TR203_REPORT_FORMAT: &str = "SPRAB27GHKLMNO*U!";
/// TR-600 报告格式
pub const TR600_REPORT_FORMAT: &str = "SPRXYAB27GHKLMmnaefghio*U!";
/// 单条语句最大长度（含 `!`）
pub const MAX_SENTENCE_LEN: usize = 1024;

const START: &[u8] = b"GS";
const SENTINEL: u8 = b'!';
/// `*XX!`
const TRAILER_LEN: usize = 4;
const KNOTS_TO_KMH: f64 = 1.852;

/// 为命令/语句体追加 `*XX!` 校验尾。
pub fn seal(body: &str) -> String {
    format!("{}*{:02X}!", body, xor8(body.as_bytes()))
}

/// Globalsat 分帧器
#[derive(Debug, Clone)]
pub struct GlobalsatFactory {
    report_format: String,
}

impl GlobalsatFactory {
    pub fn new(report_format: impl Into<String>) -> Self {
        Self {
            report_format: report_format.into(),
        }
    }

    pub fn tr203() -> Self {
        Self::new(TR203_REPORT_FORMAT)
    }

    pub fn tr600() -> Self {
        Self::new(TR600_REPORT_FORMAT)
    }

    pub fn report_format(&self) -> &str {
        &self.report_format
    }

    /// 报告字段对应的格式字符（`*` 之前）
    fn field_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.report_format.chars().take_while(|c| *c != '*')
    }

    fn decode_sentence(&self, sentence: &Bytes) -> Result<(u8, usize, PacketBody), RejectReason> {
        let len = sentence.len();
        if len < START.len() + TRAILER_LEN || sentence[len - TRAILER_LEN] != b'*' {
            return Err(RejectReason::Malformed("missing checksum trailer".to_string()));
        }
        let star = len - TRAILER_LEN;
        let declared = std::str::from_utf8(&sentence[star + 1..len - 1])
            .ok()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .ok_or_else(|| RejectReason::Malformed("checksum is not hex".to_string()))?;
        let computed = xor8(&sentence[..star]);
        if declared != computed {
            return Err(RejectReason::ChecksumMismatch {
                declared: u16::from(declared),
                computed: u16::from(computed),
            });
        }

        let text = std::str::from_utf8(&sentence[..star])
            .map_err(|_| RejectReason::Malformed("sentence is not utf-8".to_string()))?;
        let body = self
            .decode_body(text)
            .map_err(|err| RejectReason::Malformed(err.to_string()))?;
        Ok((declared, star, body))
    }

    fn decode_body(&self, text: &str) -> Result<PacketBody, ProtocolError> {
        let mut fields = text.split(',');
        let kind = fields.next().unwrap_or_default();
        match kind {
            "GSr" => self.decode_report(fields).map(PacketBody::Data),
            "GSs" => Ok(PacketBody::Settings(decode_settings(fields))),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }

    fn decode_report<'a>(
        &self,
        mut fields: impl Iterator<Item = &'a str>,
    ) -> Result<PacketData, ProtocolError> {
        let mut device_id = None;
        let mut date = None;
        let mut clock = None;
        let mut latitude = None;
        let mut longitude = None;
        let mut altitude = None;
        let mut speed = 0.0;
        let mut course = 0.0;
        let mut params = BTreeMap::new();

        for code in self.field_chars() {
            let Some(value) = fields.next() else { break };
            let value = value.trim();
            match code {
                'S' => device_id = Some(value.to_string()).filter(|id| !id.is_empty()),
                'B' => {
                    date = Some(value);
                    clock = fields.next().map(str::trim);
                }
                '2' => longitude = Some(parse_coordinate(value, 'E', 'W', 180.0, "longitude")?),
                '7' => latitude = Some(parse_coordinate(value, 'N', 'S', 90.0, "latitude")?),
                'G' => altitude = parse_optional_number(value, "altitude")?,
                'H' => {
                    speed = parse_optional_number(value, "speed")?.unwrap_or_default() * KNOTS_TO_KMH
                }
                'K' => course = parse_optional_number(value, "course")?.unwrap_or_default(),
                _ if value.is_empty() => {}
                other => {
                    params.insert(other.to_string(), RawValue::Text(value.to_string()));
                }
            }
        }

        let time = parse_time(
            date.ok_or_else(|| ProtocolError::MissingField("date".to_string()))?,
            clock.ok_or_else(|| ProtocolError::MissingField("time".to_string()))?,
        )?;
        let item = PacketItem {
            time,
            latitude: latitude.ok_or_else(|| ProtocolError::MissingField("latitude".to_string()))?,
            longitude: longitude
                .ok_or_else(|| ProtocolError::MissingField("longitude".to_string()))?,
            altitude,
            speed,
            course,
            params,
        };
        Ok(PacketData {
            device_id,
            items: vec![item],
        })
    }
}

impl PacketFactory for GlobalsatFactory {
    fn family(&self) -> &'static str {
        "globalsat"
    }

    fn extract(&self, buffer: &mut BytesMut) -> Extraction {
        let mut out = Extraction::default();

        while !buffer.is_empty() {
            match find_subslice(&buffer[..], START) {
                None => {
                    let keep = usize::from(buffer.last() == Some(&START[0]));
                    let drop = buffer.len() - keep;
                    out.reject(buffer.split_to(drop).freeze(), RejectReason::Garbage);
                    break;
                }
                Some(0) => {}
                Some(start) => {
                    out.reject(buffer.split_to(start).freeze(), RejectReason::Garbage);
                    continue;
                }
            }

            let window = buffer.len().min(MAX_SENTENCE_LEN);
            let sentinel = buffer[..window].iter().position(|byte| *byte == SENTINEL);
            let scan_end = sentinel.unwrap_or(window);
            let restart = find_subslice(&buffer[START.len()..scan_end], START)
                .map(|offset| offset + START.len());

            if let Some(restart) = restart {
                out.reject(
                    buffer.split_to(restart).freeze(),
                    RejectReason::Malformed("sentence interrupted by a new start".to_string()),
                );
                continue;
            }
            let Some(end) = sentinel else {
                if buffer.len() >= MAX_SENTENCE_LEN {
                    out.reject(
                        buffer.split_to(MAX_SENTENCE_LEN).freeze(),
                        RejectReason::Oversized(MAX_SENTENCE_LEN),
                    );
                    continue;
                }
                break;
            };

            let sentence = buffer.split_to(end + 1).freeze();
            match self.decode_sentence(&sentence) {
                Ok((checksum, declared_length, body)) => out.packets.push(Packet::new(
                    declared_length,
                    u16::from(checksum),
                    sentence,
                    body,
                )),
                Err(reason) => out.reject(sentence, reason),
            }
        }
        out
    }

    fn acknowledgement(&self, _packet: &Packet) -> Option<Bytes> {
        None
    }
}

fn decode_settings<'a>(fields: impl Iterator<Item = &'a str>) -> PacketSettings {
    let mut device_id = None;
    let mut options = BTreeMap::new();
    for (index, field) in fields.enumerate() {
        if index == 0 {
            device_id = Some(field.trim().to_string()).filter(|id| !id.is_empty());
            continue;
        }
        if let Some((code, value)) = field.split_once('=') {
            options.insert(code.trim().to_string(), value.trim().to_string());
        }
    }
    PacketSettings { device_id, options }
}

/// `N4253.1311` / `E02445.0214` → 十进制度，南纬/西经为负。
///
/// 非有限值、负值与超过 `max_degrees` 的度数均视为非法。
fn parse_coordinate(
    value: &str,
    positive: char,
    negative: char,
    max_degrees: f64,
    field: &str,
) -> Result<f64, ProtocolError> {
    let mut chars = value.chars();
    let sign = match chars.next() {
        Some(c) if c == positive => 1.0,
        Some(c) if c == negative => -1.0,
        _ => return Err(ProtocolError::invalid(field, format!("bad hemisphere in {:?}", value))),
    };
    let raw: f64 = chars
        .as_str()
        .parse()
        .map_err(|_| ProtocolError::invalid(field, format!("not a number: {:?}", value)))?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(ProtocolError::invalid(field, format!("not a coordinate: {:?}", value)));
    }
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(ProtocolError::invalid(field, "minutes out of range"));
    }
    let decimal = degrees + minutes / 60.0;
    if decimal > max_degrees {
        return Err(ProtocolError::invalid(field, "degrees out of range"));
    }
    Ok(sign * decimal)
}

fn parse_optional_number(value: &str, field: &str) -> Result<Option<f64>, ProtocolError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .map(Some)
        .ok_or_else(|| ProtocolError::invalid(field, format!("not a number: {:?}", value)))
}

fn parse_time(date: &str, clock: &str) -> Result<NaiveDateTime, ProtocolError> {
    NaiveDateTime::parse_from_str(&format!("{}{}", date, clock), "%d%m%y%H%M%S")
        .map_err(|err| ProtocolError::invalid("time", err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;

    const REPORT: &str =
        "GSr,011412001274897,3,3,,090713,081527,E02445.0214,N4253.1311,546,10,93,09,1.0,87,0";

    fn extract(factory: &GlobalsatFactory, input: &[u8]) -> (Extraction, BytesMut) {
        let mut buffer = BytesMut::from(input);
        let out = factory.extract(&mut buffer);
        (out, buffer)
    }

    #[test]
    fn seal_appends_xor_checksum() {
        assert_eq!(seal("GS"), format!("GS*{:02X}!", b'G' ^ b'S'));
        assert!(seal("GSS,1,3,0").ends_with('!'));
    }

    #[test]
    fn decodes_tr203_report() {
        let sentence = seal(REPORT);
        let (out, rest) = extract(&GlobalsatFactory::tr203(), sentence.as_bytes());
        assert!(rest.is_empty());
        assert!(out.rejected.is_empty());
        let packet = &out.packets[0];
        assert_eq!(packet.kind(), PacketKind::Data);
        assert_eq!(packet.device_id(), Some("011412001274897"));
        assert_eq!(packet.raw().as_ref(), sentence.as_bytes());

        let item = &packet.data().expect("data").items[0];
        assert_eq!(item.time.to_string(), "2013-07-09 08:15:27");
        assert!((item.latitude - (42.0 + 53.1311 / 60.0)).abs() < 1e-9);
        assert!((item.longitude - (24.0 + 45.0214 / 60.0)).abs() < 1e-9);
        assert_eq!(item.altitude, Some(546.0));
        assert!((item.speed - 18.52).abs() < 1e-9);
        assert_eq!(item.params.get("L"), Some(&RawValue::Text("09".to_string())));
        assert_eq!(item.params.get("N"), Some(&RawValue::Text("87".to_string())));
        assert_eq!(item.params.get("P"), Some(&RawValue::Text("3".to_string())));
        assert!(!item.params.contains_key("A"));
    }

    #[test]
    fn southern_and_western_coordinates_are_negative() {
        let body = "GSr,1,3,3,00,010114,000000,W07330.0000,S3330.0000,0,0,0,0,0,0,0";
        let (out, _) = extract(&GlobalsatFactory::tr203(), seal(body).as_bytes());
        let item = &out.packets[0].data().expect("data").items[0];
        assert!((item.latitude + 33.5).abs() < 1e-9);
        assert!((item.longitude + 73.5).abs() < 1e-9);
    }

    #[test]
    fn non_finite_or_out_of_range_coordinates_are_malformed() {
        let bodies = [
            "GSr,1,3,3,00,010114,000000,ENaN,N3330.0000,0,0,0,0,0,0,0",
            "GSr,1,3,3,00,010114,000000,E07330.0000,Ninf,0,0,0,0,0,0,0",
            "GSr,1,3,3,00,010114,000000,E07330.0000,N9530.0000,0,0,0,0,0,0,0",
            "GSr,1,3,3,00,010114,000000,E18100.0000,N3330.0000,0,0,0,0,0,0,0",
            "GSr,1,3,3,00,010114,000000,E-0730.0000,N3330.0000,0,0,0,0,0,0,0",
        ];
        for body in bodies {
            let (out, rest) = extract(&GlobalsatFactory::tr203(), seal(body).as_bytes());
            assert!(rest.is_empty());
            assert!(out.packets.is_empty(), "{}", body);
            assert!(matches!(out.rejected[0].reason, RejectReason::Malformed(_)), "{}", body);
        }
    }

    #[test]
    fn decodes_settings_readback() {
        let sentence = seal("GSs,011412001274897,3,0,R1=60,R0=600,R3=1");
        let (out, _) = extract(&GlobalsatFactory::tr203(), sentence.as_bytes());
        let settings = out.packets[0].settings().expect("settings");
        assert_eq!(settings.device_id.as_deref(), Some("011412001274897"));
        assert_eq!(settings.options.get("R1").map(String::as_str), Some("60"));
        assert_eq!(settings.options.len(), 3);
    }

    #[test]
    fn text_family_sends_no_acknowledgement() {
        let factory = GlobalsatFactory::tr203();
        let (out, _) = extract(&factory, seal(REPORT).as_bytes());
        assert!(factory.acknowledgement(&out.packets[0]).is_none());
    }

    #[test]
    fn drops_garbage_before_start_but_keeps_trailing_g() {
        let mut input = b"xx\r\n".to_vec();
        input.extend_from_slice(seal(REPORT).as_bytes());
        input.extend_from_slice(b"zzG");
        let (out, rest) = extract(&GlobalsatFactory::tr203(), &input);
        assert_eq!(out.packets.len(), 1);
        assert_eq!(out.rejected.len(), 2);
        assert!(out.rejected.iter().all(|r| r.reason == RejectReason::Garbage));
        assert_eq!(rest.as_ref(), b"G");
    }

    #[test]
    fn checksum_mismatch_drops_through_sentinel() {
        let good = seal(REPORT);
        let mut bad = good.clone().into_bytes();
        let star = bad.len() - TRAILER_LEN;
        bad[star + 1] = if bad[star + 1] == b'0' { b'1' } else { b'0' };
        let mut input = bad.clone();
        input.extend_from_slice(good.as_bytes());

        let (out, rest) = extract(&GlobalsatFactory::tr203(), &input);
        assert!(rest.is_empty());
        assert_eq!(out.packets.len(), 1);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].bytes.len(), bad.len());
        assert!(matches!(
            out.rejected[0].reason,
            RejectReason::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn interrupted_sentence_is_dropped_up_to_new_start() {
        let mut input = b"GSr,0114,3,3".to_vec();
        input.extend_from_slice(seal(REPORT).as_bytes());
        let (out, _) = extract(&GlobalsatFactory::tr203(), &input);
        assert_eq!(out.packets.len(), 1);
        assert_eq!(out.rejected[0].bytes.as_ref(), b"GSr,0114,3,3");
        assert!(matches!(out.rejected[0].reason, RejectReason::Malformed(_)));
    }

    #[test]
    fn incomplete_sentence_waits_for_sentinel() {
        let sentence = seal(REPORT);
        let partial = &sentence.as_bytes()[..sentence.len() - 2];
        let (out, rest) = extract(&GlobalsatFactory::tr203(), partial);
        assert!(out.packets.is_empty());
        assert!(out.rejected.is_empty());
        assert_eq!(rest.len(), partial.len());
    }

    #[test]
    fn oversized_sentence_is_dropped() {
        let mut input = b"GSr,".to_vec();
        input.resize(MAX_SENTENCE_LEN + 10, b'1');
        let (out, rest) = extract(&GlobalsatFactory::tr203(), &input);
        assert_eq!(out.rejected[0].reason, RejectReason::Oversized(MAX_SENTENCE_LEN));
        assert_eq!(rest.len(), 0);
        assert_eq!(out.rejected_bytes(), MAX_SENTENCE_LEN + 10);
    }

    #[test]
    fn report_without_coordinates_is_malformed() {
        let sentence = seal("GSr,1,3,3,00,090713,081527");
        let (out, _) = extract(&GlobalsatFactory::tr203(), sentence.as_bytes());
        assert!(out.packets.is_empty());
        assert!(matches!(out.rejected[0].reason, RejectReason::Malformed(_)));
    }
}
