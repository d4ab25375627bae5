//! Telemetry 指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use trk_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            bytes_received: snapshot.bytes_received,
            frames_decoded: snapshot.frames_decoded,
            frames_rejected: snapshot.frames_rejected,
            acks_sent: snapshot.acks_sent,
            heads_stored: snapshot.heads_stored,
            orphan_data_frames: snapshot.orphan_data_frames,
            events_translated: snapshot.events_translated,
            events_forwarded: snapshot.events_forwarded,
            sink_failures: snapshot.sink_failures,
            commands_built: snapshot.commands_built,
            commands_dispatched: snapshot.commands_dispatched,
            command_dispatch_failures: snapshot.command_dispatch_failures,
            reports_sent: snapshot.reports_sent,
            report_failures: snapshot.report_failures,
        })),
    )
        .into_response()
}
