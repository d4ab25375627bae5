//! 追踪初始化、会话/请求 ID 生成与进程级计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub frames_decoded: u64,
    pub frames_rejected: u64,
    pub acks_sent: u64,
    pub heads_stored: u64,
    pub orphan_data_frames: u64,
    pub events_translated: u64,
    pub events_forwarded: u64,
    pub sink_failures: u64,
    pub commands_built: u64,
    pub commands_dispatched: u64,
    pub command_dispatch_failures: u64,
    pub reports_sent: u64,
    pub report_failures: u64,
}

/// 进程级计数指标。
pub struct TelemetryMetrics {
    bytes_received: AtomicU64,
    frames_decoded: AtomicU64,
    frames_rejected: AtomicU64,
    acks_sent: AtomicU64,
    heads_stored: AtomicU64,
    orphan_data_frames: AtomicU64,
    events_translated: AtomicU64,
    events_forwarded: AtomicU64,
    sink_failures: AtomicU64,
    commands_built: AtomicU64,
    commands_dispatched: AtomicU64,
    command_dispatch_failures: AtomicU64,
    reports_sent: AtomicU64,
    report_failures: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            bytes_received: AtomicU64::new(0),
            frames_decoded: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            acks_sent: AtomicU64::new(0),
            heads_stored: AtomicU64::new(0),
            orphan_data_frames: AtomicU64::new(0),
            events_translated: AtomicU64::new(0),
            events_forwarded: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            commands_built: AtomicU64::new(0),
            commands_dispatched: AtomicU64::new(0),
            command_dispatch_failures: AtomicU64::new(0),
            reports_sent: AtomicU64::new(0),
            report_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            heads_stored: self.heads_stored.load(Ordering::Relaxed),
            orphan_data_frames: self.orphan_data_frames.load(Ordering::Relaxed),
            events_translated: self.events_translated.load(Ordering::Relaxed),
            events_forwarded: self.events_forwarded.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            commands_built: self.commands_built.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            command_dispatch_failures: self.command_dispatch_failures.load(Ordering::Relaxed),
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            report_failures: self.report_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info，`RUST_LOG` 覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: Uuid::new_v4().to_string(),
        trace_id: Uuid::new_v4().to_string(),
    }
}

/// 生成设备连接的会话 ID。
pub fn new_session_id() -> Uuid {
    Uuid::new_v4()
}

/// 记录从设备读到的字节数。
pub fn record_bytes_received(len: usize) {
    metrics()
        .bytes_received
        .fetch_add(len as u64, Ordering::Relaxed);
}

/// 记录解出的协议帧。
pub fn record_frame_decoded() {
    metrics().frames_decoded.fetch_add(1, Ordering::Relaxed);
}

/// 记录被丢弃的字节段（垃圾、校验失败、非法报文）。
pub fn record_frame_rejected() {
    metrics().frames_rejected.fetch_add(1, Ordering::Relaxed);
}

pub fn record_ack_sent() {
    metrics().acks_sent.fetch_add(1, Ordering::Relaxed);
}

pub fn record_head_stored() {
    metrics().heads_stored.fetch_add(1, Ordering::Relaxed);
}

/// 记录 Head 帧之前到达的数据帧。
pub fn record_orphan_data_frame() {
    metrics().orphan_data_frames.fetch_add(1, Ordering::Relaxed);
}

/// 记录翻译出的规范化事件数。
pub fn record_events_translated(count: usize) {
    metrics()
        .events_translated
        .fetch_add(count as u64, Ordering::Relaxed);
}

/// 记录成功投递到 Sink 的事件数。
pub fn record_events_forwarded(count: usize) {
    metrics()
        .events_forwarded
        .fetch_add(count as u64, Ordering::Relaxed);
}

pub fn record_sink_failure() {
    metrics().sink_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录构建出的厂商命令。
pub fn record_command_built() {
    metrics().commands_built.fetch_add(1, Ordering::Relaxed);
}

/// 记录命令下发成功次数（设备 socket 写入成功）。
pub fn record_command_dispatched() {
    metrics().commands_dispatched.fetch_add(1, Ordering::Relaxed);
}

/// 记录命令下发失败次数。
pub fn record_command_dispatch_failure() {
    metrics()
        .command_dispatch_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录完成回报成功次数。
pub fn record_report_sent() {
    metrics().reports_sent.fetch_add(1, Ordering::Relaxed);
}

/// 记录完成回报失败次数（重试耗尽）。
pub fn record_report_failure() {
    metrics().report_failures.fetch_add(1, Ordering::Relaxed);
}
