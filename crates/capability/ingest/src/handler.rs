//! 单连接处理：解码 → 应答 → 分类 → 翻译 → 投递。

use crate::session::Session;
use crate::vendor::VendorDriver;
use crate::IngestError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{debug, info, warn};
use trk_pipeline::ObserverSink;
use trk_protocol::{Packet, PacketBody};
use trk_telemetry::{
    record_ack_sent, record_bytes_received, record_events_forwarded, record_events_translated,
    record_frame_decoded, record_frame_rejected, record_head_stored, record_orphan_data_frame,
    record_sink_failure,
};

/// 连接写端（应答帧、下发命令）。
#[async_trait]
pub trait FrameWriter: Send {
    async fn write_frame(&mut self, bytes: &[u8]) -> Result<(), IngestError>;
}

#[async_trait]
impl FrameWriter for OwnedWriteHalf {
    async fn write_frame(&mut self, bytes: &[u8]) -> Result<(), IngestError> {
        self.write_all(bytes).await?;
        self.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl FrameWriter for Vec<u8> {
    async fn write_frame(&mut self, bytes: &[u8]) -> Result<(), IngestError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// 一次读事件的处理结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub frames: usize,
    pub rejected: usize,
    pub events_forwarded: usize,
}

#[derive(Clone)]
pub struct ConnectionHandler {
    driver: Arc<VendorDriver>,
    sink: Arc<dyn ObserverSink>,
}

impl ConnectionHandler {
    pub fn new(driver: Arc<VendorDriver>, sink: Arc<dyn ObserverSink>) -> Self {
        Self { driver, sink }
    }

    pub fn driver(&self) -> &Arc<VendorDriver> {
        &self.driver
    }

    /// 追加新读入的字节并按顺序处理切出的每一帧。
    ///
    /// 只有写连接失败会返回错误；坏帧、投递失败只记日志。
    pub async fn on_bytes<W: FrameWriter + ?Sized>(
        &self,
        session: &mut Session,
        bytes: &[u8],
        writer: &mut W,
    ) -> Result<ReadSummary, IngestError> {
        record_bytes_received(bytes.len());
        session.buffer_mut().extend_from_slice(bytes);
        let extraction = self.driver.codec().extract(session.buffer_mut());

        let mut summary = ReadSummary {
            frames: extraction.packets.len(),
            rejected: extraction.rejected.len(),
            events_forwarded: 0,
        };
        for rejected in &extraction.rejected {
            record_frame_rejected();
            warn!(
                target: "trk.ingest",
                uid = ?session.uid(),
                len = rejected.bytes.len(),
                reason = %rejected.reason,
                "frame_rejected"
            );
        }
        for packet in &extraction.packets {
            summary.events_forwarded += self.process_packet(session, packet, writer).await?;
        }
        Ok(summary)
    }

    async fn process_packet<W: FrameWriter + ?Sized>(
        &self,
        session: &mut Session,
        packet: &Packet,
        writer: &mut W,
    ) -> Result<usize, IngestError> {
        record_frame_decoded();
        // 先应答，再做任何处理
        if let Some(ack) = self.driver.codec().acknowledgement(packet) {
            writer.write_frame(&ack).await?;
            record_ack_sent();
            debug!(target: "trk.ingest", checksum = packet.checksum(), "ack_sent");
        }

        match packet.body() {
            PacketBody::Head(head) => {
                let previous = session.accept_head(&head.device_id, packet.raw().clone());
                record_head_stored();
                info!(
                    target: "trk.ingest",
                    uid = %head.device_id,
                    previous = ?previous,
                    device_number = ?head.device_number,
                    protocol_version = ?head.protocol_version,
                    "head_stored"
                );
                Ok(0)
            }
            PacketBody::Settings(settings) => {
                let options = self
                    .driver
                    .commands()
                    .translate_config_options(&settings.options);
                info!(
                    target: "trk.ingest",
                    uid = ?settings.device_id.as_deref().or(session.uid()),
                    raw = settings.options.len(),
                    known = options.len(),
                    "settings_read_back"
                );
                session.remember_settings(options);
                Ok(0)
            }
            PacketBody::Data(data) => {
                if let Some(inline) = data.device_id.as_deref() {
                    if session.adopt_inline_uid(inline) {
                        info!(target: "trk.ingest", uid = %inline, "inline_uid_adopted");
                    }
                }
                self.forward(session, packet).await
            }
        }
    }

    async fn forward(&self, session: &Session, packet: &Packet) -> Result<usize, IngestError> {
        if session.uid().is_none() {
            record_orphan_data_frame();
            warn!(
                target: "trk.ingest",
                len = packet.raw().len(),
                "orphan_data_frame"
            );
        }
        let events = self.driver.translator().translate(packet, session.uid());
        if events.is_empty() {
            info!(target: "trk.ingest", uid = ?session.uid(), "location_items_not_found");
            return Ok(0);
        }
        record_events_translated(events.len());

        let replay = session.replay_for(packet.raw());
        match self.sink.store(&events, &replay).await {
            Ok(()) => {
                record_events_forwarded(events.len());
                info!(
                    target: "trk.ingest",
                    uid = ?session.uid(),
                    events = events.len(),
                    replay_len = replay.len(),
                    "events_forwarded"
                );
                Ok(events.len())
            }
            Err(err) => {
                record_sink_failure();
                warn!(
                    target: "trk.ingest",
                    uid = ?session.uid(),
                    events = events.len(),
                    error = %err,
                    "sink_store_failed"
                );
                Ok(0)
            }
        }
    }
}
