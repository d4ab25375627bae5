use bytes::BytesMut;
use proptest::prelude::*;
use proptest::sample::Index;
use trk_protocol::globalsat::seal;
use trk_protocol::naviset::{DataRecord, encode_data, encode_head};
use trk_protocol::{
    GlobalsatFactory, NavisetFactory, Packet, PacketFactory, RejectReason, extract_frames,
};

/// 按给定切点分多次喂给分帧器，模拟 socket 多次读
fn extract_in_chunks(factory: &dyn PacketFactory, stream: &[u8], cuts: &[Index]) -> (Vec<Packet>, usize, usize) {
    let mut points: Vec<usize> = cuts.iter().map(|cut| cut.index(stream.len() + 1)).collect();
    points.push(stream.len());
    points.sort_unstable();

    let mut buffer = BytesMut::new();
    let mut packets = Vec::new();
    let mut rejected = 0;
    let mut start = 0;
    for end in points {
        buffer.extend_from_slice(&stream[start..end]);
        start = end;
        let out = factory.extract(&mut buffer);
        rejected += out.rejected_bytes();
        packets.extend(out.packets);
    }
    (packets, rejected, buffer.len())
}

fn arb_record() -> impl Strategy<Value = DataRecord> {
    (
        any::<u32>(),
        -90_000_000i32..=90_000_000,
        -180_000_000i32..=180_000_000,
        any::<i16>(),
        any::<u16>(),
        0u16..3600,
        prop::collection::vec((any::<u8>(), any::<i32>()), 0..4),
    )
        .prop_map(
            |(timestamp, lat_micro, lon_micro, altitude, speed_decikmh, course_decideg, params)| {
                DataRecord {
                    timestamp,
                    lat_micro,
                    lon_micro,
                    altitude,
                    speed_decikmh,
                    course_decideg,
                    params,
                }
            },
        )
}

fn arb_naviset_frame() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        ("[0-9]{15}", any::<u16>(), any::<u8>())
            .prop_map(|(imei, number, version)| encode_head(&imei, number, version)),
        prop::collection::vec(arb_record(), 0..3).prop_map(|records| encode_data(&records)),
    ]
}

fn arb_globalsat_sentence() -> impl Strategy<Value = Vec<u8>> {
    let report = (
        "[0-9]{15}",
        (1u32..=28, 1u32..=12, 0u32..100),
        (0u32..24, 0u32..60, 0u32..60),
        (0u32..180, 0u32..60, 0u32..10_000),
        (0u32..90, 0u32..60, 0u32..10_000),
        0u32..3000,
        0u32..200,
    )
        .prop_map(|(id, (dd, mm, yy), (h, mi, s), lon, lat, alt, bat)| {
            seal(&format!(
                "GSr,{},3,3,00,{:02}{:02}{:02},{:02}{:02}{:02},E{:03}{:02}.{:04},N{:02}{:02}.{:04},{},0.5,90,07,1.2,{},0",
                id, dd, mm, yy, h, mi, s, lon.0, lon.1, lon.2, lat.0, lat.1, lat.2, alt, bat
            ))
            .into_bytes()
        });
    let settings = ("[0-9]{15}", 1u32..3600, 1u32..3600).prop_map(|(id, moving, idle)| {
        seal(&format!("GSs,{},3,0,R1={},R0={}", id, moving, idle)).into_bytes()
    });
    prop_oneof![report, settings]
}

fn check_fragmentation(factory: &dyn PacketFactory, frames: &[Vec<u8>], cuts: &[Index]) -> Result<(), TestCaseError> {
    let stream = frames.concat();
    let (whole, remainder) = extract_frames(factory, &stream);
    prop_assert!(remainder.is_empty());
    prop_assert!(whole.rejected.is_empty());
    prop_assert_eq!(whole.packets.len(), frames.len());

    let (chunked, rejected, left) = extract_in_chunks(factory, &stream, cuts);
    prop_assert_eq!(rejected, 0);
    prop_assert_eq!(left, 0);
    prop_assert_eq!(chunked, whole.packets);
    Ok(())
}

fn check_corrupted(
    factory: &dyn PacketFactory,
    frames: &[Vec<u8>],
    victim: Index,
    corrupt: impl Fn(&mut Vec<u8>),
) -> Result<(), TestCaseError> {
    let victim = victim.index(frames.len());
    let mut frames = frames.to_vec();
    corrupt(&mut frames[victim]);
    let stream = frames.concat();

    let (out, remainder) = extract_frames(factory, &stream);
    prop_assert!(remainder.is_empty());
    prop_assert_eq!(out.packets.len(), frames.len() - 1);
    prop_assert_eq!(out.rejected.len(), 1);
    prop_assert_eq!(out.rejected[0].bytes.as_ref(), frames[victim].as_slice());
    let is_checksum_mismatch = matches!(out.rejected[0].reason, RejectReason::ChecksumMismatch { .. });
    prop_assert!(is_checksum_mismatch);

    let survivors: Vec<&[u8]> = frames
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != victim)
        .map(|(_, frame)| frame.as_slice())
        .collect();
    let decoded: Vec<&[u8]> = out.packets.iter().map(|packet| packet.raw().as_ref()).collect();
    prop_assert_eq!(decoded, survivors);
    Ok(())
}

/// 在帧前与帧间插入垃圾字节：所有真实帧都必须被找回，被丢弃的只有垃圾字节
fn check_interleaved_garbage(
    factory: &dyn PacketFactory,
    frames: &[Vec<u8>],
    gaps: &[Vec<u8>],
) -> Result<(), TestCaseError> {
    let mut stream = Vec::new();
    let mut garbage = 0;
    for (index, frame) in frames.iter().enumerate() {
        if let Some(gap) = gaps.get(index) {
            stream.extend_from_slice(gap);
            garbage += gap.len();
        }
        stream.extend_from_slice(frame);
    }

    let (out, remainder) = extract_frames(factory, &stream);
    prop_assert!(remainder.is_empty());
    prop_assert_eq!(out.rejected_bytes(), garbage);
    let decoded: Vec<&[u8]> = out.packets.iter().map(|packet| packet.raw().as_ref()).collect();
    let expected: Vec<&[u8]> = frames.iter().map(Vec::as_slice).collect();
    prop_assert_eq!(decoded, expected);
    Ok(())
}

/// 偏向能与真实帧头拼出可信 Naviset 帧头的字节
fn arb_garbage() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![any::<u8>(), 0x00u8..0x20, Just(0x05u8), Just(0x10u8), Just(0x12u8)],
        0..4,
    )
}

proptest! {
    #[test]
    fn naviset_fragmentation_is_transparent(
        frames in prop::collection::vec(arb_naviset_frame(), 1..6),
        cuts in prop::collection::vec(any::<Index>(), 0..8),
    ) {
        check_fragmentation(&NavisetFactory::new(), &frames, &cuts)?;
    }

    #[test]
    fn globalsat_fragmentation_is_transparent(
        frames in prop::collection::vec(arb_globalsat_sentence(), 1..6),
        cuts in prop::collection::vec(any::<Index>(), 0..8),
    ) {
        check_fragmentation(&GlobalsatFactory::tr203(), &frames, &cuts)?;
    }

    #[test]
    fn naviset_corrupted_crc_drops_only_that_frame(
        frames in prop::collection::vec(arb_naviset_frame(), 1..6),
        victim in any::<Index>(),
        flip in 1u8..=255,
    ) {
        check_corrupted(&NavisetFactory::new(), &frames, victim, |frame| {
            let last = frame.len() - 1;
            frame[last] ^= flip;
        })?;
    }

    #[test]
    fn globalsat_corrupted_checksum_drops_only_that_sentence(
        frames in prop::collection::vec(arb_globalsat_sentence(), 1..6),
        victim in any::<Index>(),
    ) {
        check_corrupted(&GlobalsatFactory::tr203(), &frames, victim, |sentence| {
            // `*XX!` 的第二位十六进制数字
            let digit = sentence.len() - 2;
            sentence[digit] = if sentence[digit] == b'0' { b'1' } else { b'0' };
        })?;
    }

    #[test]
    fn naviset_garbage_between_frames_loses_no_frame(
        frames in prop::collection::vec(arb_naviset_frame(), 1..6),
        gaps in prop::collection::vec(arb_garbage(), 0..6),
    ) {
        check_interleaved_garbage(&NavisetFactory::new(), &frames, &gaps)?;
    }
}
