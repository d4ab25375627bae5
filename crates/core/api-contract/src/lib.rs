//! 稳定的 DTO 与 API 响应契约。

use domain::{CommandAlias, TaskId, Transport, VendorId};
use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 外部任务系统提交的命令任务。
///
/// `payload` 按 alias 解释：
/// - configure：`{"host", "port", "gprs": {"apn", "username", "password"}}`
/// - execute：`{"command": "..."}`
/// - set-option：`[{"option", "value"}]`
/// - read-settings：忽略
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequestDto {
    #[serde(alias = "task_id", alias = "id_action")]
    pub task_id: TaskId,
    pub vendor: VendorId,
    #[serde(default)]
    pub uid: Option<String>,
    pub alias: CommandAlias,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// 任务受理结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcomeDto {
    pub task_id: String,
    pub alias: CommandAlias,
    pub outcome: String,
    pub messages: Vec<String>,
    /// configure 的回报内容 `{"list":[...]}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// configure 回报是否送达
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported: Option<bool>,
}

/// 任务状态。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusDto {
    pub task_id: String,
    pub alias: CommandAlias,
    pub status: String,
    pub result: Option<String>,
    pub detail: Option<String>,
    pub updated_at_ms: i64,
}

/// 指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
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
